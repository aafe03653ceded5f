use std::io::{BufWriter, Cursor};

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::image_crate::ImageDecoder;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerIndex, PdfLayerReference, PdfPageIndex,
};

use crate::chart::RenderedChart;
use crate::error::{CafeteriaError, Result};
use crate::fmt::truncate_chars;
use crate::table::TabularResult;

pub const PDF_MIME: &str = "application/pdf";

/// Page geometry in PDF points (1/72 inch), y measured up from the bottom edge.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    /// Left plus right margin, subtracted from the width available to a chart.
    pub side_margins: f32,
    pub margin_top: f32,
    /// A row is never placed below this height; the next page starts instead.
    pub bottom_limit: f32,
    pub title_size: f32,
    pub font_size: f32,
    pub title_gap: f32,
    pub chart_max_height: f32,
    pub chart_gap: f32,
    pub header_gap: f32,
    pub row_height: f32,
    pub tab_stop: f32,
    pub max_chars: usize,
}

impl PageSetup {
    /// US Letter.
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin_left: 40.0,
            side_margins: 80.0,
            margin_top: 40.0,
            bottom_limit: 50.0,
            title_size: 14.0,
            font_size: 10.0,
            title_gap: 25.0,
            chart_max_height: 300.0,
            chart_gap: 20.0,
            header_gap: 15.0,
            row_height: 12.0,
            tab_stop: 100.0,
            max_chars: 12,
        }
    }

    /// Column start positions: every `tab_stop` from the left margin while left of the
    /// right margin. Columns past the last stop are not drawn.
    pub fn tab_stops(&self) -> Vec<f32> {
        let right = self.width - self.margin_left;
        let mut stops = Vec::new();
        let mut x = self.margin_left;
        while x < right {
            stops.push(x);
            x += self.tab_stop;
        }
        stops
    }

    /// Scale factor and drawn size for a `px_w` x `px_h` chart: bounded by the usable
    /// width and by `chart_max_height`, aspect ratio kept.
    pub fn fit_chart(&self, px_w: u32, px_h: u32) -> (f32, f32, f32) {
        let (w, h) = (px_w.max(1) as f32, px_h.max(1) as f32);
        let scale = ((self.width - self.side_margins) / w).min(self.chart_max_height / h);
        (scale, w * scale, h * scale)
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::letter()
    }
}

// ---------------------------------------------------------------------------
// Layout plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Title { x: f32, y: f32, text: String },
    /// `y` is the bottom edge of the image.
    Chart { x: f32, y: f32, width: f32, height: f32, scale: f32 },
    Header { y: f32, cells: Vec<(f32, String)> },
    Row { y: f32, cells: Vec<(f32, String)> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePlan {
    pub items: Vec<Item>,
}

impl PagePlan {
    pub fn row_count(&self) -> usize {
        self.items.iter().filter(|i| matches!(i, Item::Row { .. })).count()
    }

    #[cfg(test)]
    pub fn has_header(&self) -> bool {
        self.items.iter().any(|i| matches!(i, Item::Header { .. }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPlan {
    pub pages: Vec<PagePlan>,
}

fn cells<'a>(stops: &[f32], values: impl Iterator<Item = &'a str>, max_chars: usize) -> Vec<(f32, String)> {
    stops
        .iter()
        .zip(values)
        .map(|(x, v)| (*x, truncate_chars(v, max_chars).to_string()))
        .collect()
}

/// Lay out title, optional chart (given its pixel size), header and rows onto pages.
pub fn plan(
    table: &TabularResult,
    title: &str,
    chart_px: Option<(u32, u32)>,
    setup: &PageSetup,
) -> DocumentPlan {
    let stops = tab_stops_or_margin(setup);
    let header = cells(&stops, table.columns().iter().map(String::as_str), setup.max_chars);
    let top = setup.height - setup.margin_top;

    let mut pages = Vec::new();
    let mut page = PagePlan::default();
    let mut y = top;

    page.items.push(Item::Title {
        x: setup.margin_left,
        y,
        text: title.to_string(),
    });
    y -= setup.title_gap;

    if let Some((px_w, px_h)) = chart_px {
        let (scale, width, height) = setup.fit_chart(px_w, px_h);
        page.items.push(Item::Chart {
            x: setup.margin_left,
            y: y - height,
            width,
            height,
            scale,
        });
        y -= height + setup.chart_gap;
    }

    page.items.push(Item::Header {
        y,
        cells: header.clone(),
    });
    y -= setup.header_gap;

    for row in table.display_rows() {
        if y < setup.bottom_limit {
            pages.push(std::mem::take(&mut page));
            y = top;
            page.items.push(Item::Header {
                y,
                cells: header.clone(),
            });
            y -= setup.header_gap;
        }
        page.items.push(Item::Row {
            y,
            cells: cells(&stops, row.iter().map(String::as_str), setup.max_chars),
        });
        y -= setup.row_height;
    }
    pages.push(page);

    DocumentPlan { pages }
}

fn tab_stops_or_margin(setup: &PageSetup) -> Vec<f32> {
    let stops = setup.tab_stops();
    if stops.is_empty() {
        vec![setup.margin_left]
    } else {
        stops
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

fn pdf_err<E: std::fmt::Debug>(e: E) -> CafeteriaError {
    CafeteriaError::Pdf(format!("{e:?}"))
}

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    width: f32,
    height: f32,
}

impl PdfWriter {
    fn new(title: &str, setup: &PageSetup) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, mm(setup.width), mm(setup.height), "Layer 1");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_err)?;
        Ok(Self {
            doc,
            font,
            font_bold,
            current_page: page,
            current_layer: layer,
            width: setup.width,
            height: setup.height,
        })
    }

    fn layer(&self) -> PdfLayerReference {
        self.doc
            .get_page(self.current_page)
            .get_layer(self.current_layer)
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(mm(self.width), mm(self.height), "Layer");
        self.current_page = page;
        self.current_layer = layer;
    }

    fn text(&self, s: &str, x: f32, y: f32, size: f32, bold: bool) {
        let font = if bold { &self.font_bold } else { &self.font };
        self.layer().use_text(s, size, mm(x), mm(y), font);
    }

    fn image(&self, image: Image, x: f32, y: f32, scale: f32) {
        // At 72 dpi one pixel is one point, so `scale` maps straight onto the page.
        image.add_to_layer(
            self.layer(),
            ImageTransform {
                translate_x: Some(mm(x)),
                translate_y: Some(mm(y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(72.0),
                ..Default::default()
            },
        );
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc.save(&mut buf).map_err(pdf_err)?;
        buf.into_inner().map_err(|e| CafeteriaError::Pdf(e.to_string()))
    }
}

fn decode_chart(chart: &RenderedChart) -> Result<(Image, (u32, u32))> {
    let bad = |e: printpdf::image_crate::ImageError| {
        CafeteriaError::Chart(format!("invalid chart bitmap: {e}"))
    };
    let decoder = PngDecoder::new(Cursor::new(chart.png.as_slice())).map_err(bad)?;
    let dims = decoder.dimensions();
    if dims != (chart.width, chart.height) {
        log::warn!(
            "chart bitmap is {}x{}, expected {}x{}",
            dims.0,
            dims.1,
            chart.width,
            chart.height
        );
    }
    let image = Image::try_from(decoder).map_err(bad)?;
    Ok((image, dims))
}

/// Render a result as a US Letter PDF. Output is stable for equal inputs except for
/// the creation date and document id the PDF library embeds.
pub fn render_table(table: &TabularResult, title: &str, chart: Option<&RenderedChart>) -> Result<Vec<u8>> {
    render_table_with(table, title, chart, &PageSetup::letter())
}

pub fn render_table_with(
    table: &TabularResult,
    title: &str,
    chart: Option<&RenderedChart>,
    setup: &PageSetup,
) -> Result<Vec<u8>> {
    let (mut image, chart_px) = match chart.map(decode_chart).transpose()? {
        Some((image, dims)) => (Some(image), Some(dims)),
        None => (None, None),
    };
    let layout = plan(table, title, chart_px, setup);

    let mut pdf = PdfWriter::new(title, setup)?;
    for (i, page) in layout.pages.iter().enumerate() {
        if i > 0 {
            pdf.new_page();
        }
        for item in &page.items {
            match item {
                Item::Title { x, y, text } => pdf.text(text, *x, *y, setup.title_size, true),
                Item::Chart { x, y, scale, .. } => {
                    if let Some(img) = image.take() {
                        pdf.image(img, *x, *y, *scale);
                    }
                }
                Item::Header { y, cells } | Item::Row { y, cells } => {
                    for (x, s) in cells {
                        pdf.text(s, *x, *y, setup.font_size, false);
                    }
                }
            }
        }
    }
    log::debug!(
        "rendered '{title}': {} rows on {} pages",
        layout.pages.iter().map(PagePlan::row_count).sum::<usize>(),
        layout.pages.len()
    );
    pdf.to_bytes()
}
