use crate::error::{CafeteriaError, Result};
use crate::table::TabularResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
    /// Bars grow to the right; the first row is drawn at the top.
    HorizontalBar,
}

/// Declarative chart: which column labels the bars/points, which one gives their size,
/// and the captions of the drawn x and y axes.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub category_field: &'static str,
    pub value_field: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub title: Option<&'static str>,
}

/// (label, value) pairs in row order. Null or non-numeric values count as zero.
pub fn series(table: &TabularResult, spec: &ChartSpec) -> Result<Vec<(String, f64)>> {
    let find = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| CafeteriaError::Chart(format!("column not in result: {name}")))
    };
    let cat = find(spec.category_field)?;
    let val = find(spec.value_field)?;
    Ok(table
        .rows()
        .iter()
        .map(|row| (row[cat].to_string(), row[val].as_f64().unwrap_or(0.0)))
        .collect())
}

#[cfg(feature = "pdf")]
pub use bitmap::{render_chart, RenderedChart};

#[cfg(feature = "pdf")]
mod bitmap {
    use std::ops::Range;
    use std::sync::OnceLock;

    use image::codecs::png::PngEncoder;
    use image::{ColorType, ImageEncoder};
    use plotters::coord::Shift;
    use plotters::prelude::*;
    use plotters::style::{register_font, FontStyle};

    use super::{series, ChartKind, ChartSpec};
    use crate::error::{CafeteriaError, Result};
    use crate::table::TabularResult;

    /// Pixel size of every rendered chart.
    pub const CHART_SIZE: (u32, u32) = (640, 480);

    const FONT_CANDIDATES: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    /// A chart bitmap, PNG encoded.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RenderedChart {
        pub png: Vec<u8>,
        pub width: u32,
        pub height: u32,
    }

    type Root<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

    fn chart_err<E: std::fmt::Display>(e: E) -> CafeteriaError {
        CafeteriaError::Chart(e.to_string())
    }

    /// Registers the first system font found. Without one, charts carry no text.
    fn fonts_available() -> bool {
        static REGISTERED: OnceLock<bool> = OnceLock::new();
        *REGISTERED.get_or_init(|| {
            for path in FONT_CANDIDATES {
                let Ok(bytes) = std::fs::read(path) else {
                    continue;
                };
                let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
                if register_font("sans-serif", FontStyle::Normal, bytes).is_ok() {
                    log::debug!("chart font: {path}");
                    return true;
                }
            }
            log::warn!("no usable system font; charts are drawn without labels");
            false
        })
    }

    pub fn render_chart(table: &TabularResult, spec: &ChartSpec) -> Result<RenderedChart> {
        let points = series(table, spec)?;
        let (width, height) = CHART_SIZE;
        let mut pixels = vec![255u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(chart_err)?;
            let labelled = fonts_available();
            match spec.kind {
                ChartKind::Line => draw_line(&root, spec, &points, labelled)?,
                ChartKind::Bar => draw_bars(&root, spec, &points, labelled)?,
                ChartKind::HorizontalBar => draw_horizontal_bars(&root, spec, &points, labelled)?,
            }
            root.present().map_err(chart_err)?;
        }

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(&pixels, width, height, ColorType::Rgb8)
            .map_err(chart_err)?;
        log::debug!("rendered {width}x{height} chart ({} bytes)", png.len());
        Ok(RenderedChart { png, width, height })
    }

    fn value_top(points: &[(String, f64)]) -> f64 {
        let max = points.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
        if max > 0.0 {
            max * 1.1
        } else {
            1.0
        }
    }

    fn index_range(n: usize) -> Range<f64> {
        -0.5..(n.max(1) as f64 - 0.5)
    }

    /// Label of the category sitting at axis position `at`, if `at` is a whole index.
    fn label_at(points: &[(String, f64)], at: f64, reversed: bool) -> String {
        let i = at.round();
        if (at - i).abs() > 0.01 || i < 0.0 || i as usize >= points.len() {
            return String::new();
        }
        let idx = if reversed { points.len() - 1 - i as usize } else { i as usize };
        points[idx].0.clone()
    }

    fn builder<'a, 'b>(
        root: &'a Root<'b>,
        spec: &ChartSpec,
        labelled: bool,
    ) -> ChartBuilder<'a, 'static, BitMapBackend<'b>> {
        let mut builder = ChartBuilder::on(root);
        builder.margin(20);
        if labelled {
            builder.x_label_area_size(45).y_label_area_size(80);
            if let Some(title) = spec.title {
                builder.caption(title, ("sans-serif", 22).into_font());
            }
        }
        builder
    }

    fn draw_line(root: &Root, spec: &ChartSpec, points: &[(String, f64)], labelled: bool) -> Result<()> {
        let mut chart = builder(root, spec, labelled)
            .build_cartesian_2d(index_range(points.len()), 0.0..value_top(points))
            .map_err(chart_err)?;
        if labelled {
            let fmt = |x: &f64| label_at(points, *x, false);
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(points.len().clamp(1, 12))
                .x_label_formatter(&fmt)
                .x_desc(spec.x_label)
                .y_desc(spec.y_label)
                .draw()
                .map_err(chart_err)?;
        }
        chart
            .draw_series(LineSeries::new(
                points.iter().enumerate().map(|(i, (_, v))| (i as f64, *v)),
                &BLUE,
            ))
            .map_err(chart_err)?;
        chart
            .draw_series(
                points
                    .iter()
                    .enumerate()
                    .map(|(i, (_, v))| Circle::new((i as f64, *v), 4, BLUE.filled())),
            )
            .map_err(chart_err)?;
        Ok(())
    }

    fn draw_bars(root: &Root, spec: &ChartSpec, points: &[(String, f64)], labelled: bool) -> Result<()> {
        let mut chart = builder(root, spec, labelled)
            .build_cartesian_2d(index_range(points.len()), 0.0..value_top(points))
            .map_err(chart_err)?;
        if labelled {
            let fmt = |x: &f64| label_at(points, *x, false);
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(points.len().clamp(1, 12))
                .x_label_formatter(&fmt)
                .x_desc(spec.x_label)
                .y_desc(spec.y_label)
                .draw()
                .map_err(chart_err)?;
        }
        chart
            .draw_series(points.iter().enumerate().map(|(i, (_, v))| {
                let x = i as f64;
                Rectangle::new([(x - 0.35, 0.0), (x + 0.35, *v)], BLUE.filled())
            }))
            .map_err(chart_err)?;
        Ok(())
    }

    fn draw_horizontal_bars(
        root: &Root,
        spec: &ChartSpec,
        points: &[(String, f64)],
        labelled: bool,
    ) -> Result<()> {
        let n = points.len();
        let mut chart = builder(root, spec, labelled)
            .build_cartesian_2d(0.0..value_top(points), index_range(n))
            .map_err(chart_err)?;
        if labelled {
            let fmt = |y: &f64| label_at(points, *y, true);
            chart
                .configure_mesh()
                .disable_y_mesh()
                .y_labels(n.clamp(1, 12))
                .y_label_formatter(&fmt)
                .x_desc(spec.x_label)
                .y_desc(spec.y_label)
                .draw()
                .map_err(chart_err)?;
        }
        chart
            .draw_series(points.iter().enumerate().map(|(i, (_, v))| {
                let y = (n - 1 - i) as f64;
                Rectangle::new([(0.0, y - 0.35), (*v, y + 0.35)], BLUE.filled())
            }))
            .map_err(chart_err)?;
        Ok(())
    }

}
