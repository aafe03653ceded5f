use std::fmt;
use std::str::FromStr;

use rusqlite::Connection;

use crate::chart::{ChartKind, ChartSpec};
use crate::delimited::{encode_csv, CSV_MIME};
use crate::error::{CafeteriaError, Result};
use crate::fmt::money;
use crate::models::{CategoryCatalog, FilterContext};
use crate::queries::{self, BoundQuery};
use crate::table::TabularResult;

// ---------------------------------------------------------------------------
// Report tabs
// ---------------------------------------------------------------------------

/// One report tab: a fixed query plus its title, export file stem and optional chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Report {
    Orders,
    DailySales,
    PaymentMethods,
    TopProducts,
    OpenOrders,
}

impl Report {
    /// Tab order.
    pub const ALL: [Report; 5] = [
        Report::Orders,
        Report::DailySales,
        Report::PaymentMethods,
        Report::TopProducts,
        Report::OpenOrders,
    ];

    /// Command-line name.
    pub fn key(&self) -> &'static str {
        match self {
            Report::Orders => "orders",
            Report::DailySales => "daily-sales",
            Report::PaymentMethods => "payment-methods",
            Report::TopProducts => "top-products",
            Report::OpenOrders => "open-orders",
        }
    }

    pub fn tab_label(&self) -> &'static str {
        match self {
            Report::Orders => "Pedidos (detalle)",
            Report::DailySales => "Ventas por día",
            Report::PaymentMethods => "Ingresos por método",
            Report::TopProducts => "Productos más vendidos",
            Report::OpenOrders => "Pedidos abiertos",
        }
    }

    /// Document title used in the PDF.
    pub fn title(&self) -> &'static str {
        match self {
            Report::Orders => "Pedidos filtrados",
            Report::DailySales => "Ventas por día",
            Report::PaymentMethods => "Ingresos por método",
            Report::TopProducts => "Productos más Vendidos",
            Report::OpenOrders => "Pedidos abiertos",
        }
    }

    /// Stem of the CSV download. Only the top-10 tab names it apart from its PDF.
    pub fn csv_stem(&self) -> &'static str {
        match self {
            Report::TopProducts => "top10_productos",
            _ => self.pdf_stem(),
        }
    }

    pub fn pdf_stem(&self) -> &'static str {
        match self {
            Report::Orders => "pedidos_filtrados",
            Report::DailySales => "ventas_por_dia",
            Report::PaymentMethods => "ingresos_por_metodo",
            Report::TopProducts => "productos_mas_vendidos",
            Report::OpenOrders => "pedidos_abiertos",
        }
    }

    pub fn position(&self) -> usize {
        Self::ALL.iter().position(|r| r == self).unwrap_or(0)
    }

    /// The catalog query for this tab, bound from the filter fields it reads.
    pub fn query(&self, filters: &FilterContext) -> BoundQuery {
        match self {
            Report::Orders => queries::orders_detail(filters),
            Report::DailySales => queries::daily_sales(filters),
            Report::PaymentMethods => queries::revenue_by_method(filters),
            Report::TopProducts => queries::top_products(filters),
            Report::OpenOrders => queries::open_orders(),
        }
    }

    /// One-line summary of the filter fields this tab actually reads.
    pub fn describe_filters(&self, filters: &FilterContext, catalog: &CategoryCatalog) -> String {
        let range = format!(
            "{} a {}",
            filters.date_start.format("%Y-%m-%d"),
            filters.date_end.format("%Y-%m-%d")
        );
        match self {
            Report::Orders => format!(
                "{range} | total <= {} | estado {}",
                money(filters.max_amount),
                filters.status
            ),
            Report::DailySales | Report::PaymentMethods => range,
            Report::TopProducts => {
                format!("{range} | categoría {}", catalog.label(filters.category))
            }
            Report::OpenOrders => "todos los pedidos abiertos".to_string(),
        }
    }

    pub fn chart(&self) -> Option<ChartSpec> {
        match self {
            Report::Orders | Report::OpenOrders => None,
            Report::DailySales => Some(ChartSpec {
                kind: ChartKind::Line,
                category_field: "fecha",
                value_field: "ventas",
                x_label: "Fecha",
                y_label: "Ventas (Q)",
                title: Some("Ventas por día"),
            }),
            Report::PaymentMethods => Some(ChartSpec {
                kind: ChartKind::Bar,
                category_field: "metodo_pago",
                value_field: "total_ingresos",
                x_label: "Método de pago",
                y_label: "Ingresos (Q)",
                title: None,
            }),
            Report::TopProducts => Some(ChartSpec {
                kind: ChartKind::HorizontalBar,
                category_field: "nombre_producto",
                value_field: "unidades",
                x_label: "Unidades vendidas",
                y_label: "",
                title: None,
            }),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Report {
    type Err = CafeteriaError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|r| r.key() == needle)
            .ok_or_else(|| CafeteriaError::UnknownReport(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Running and exporting
// ---------------------------------------------------------------------------

/// Downloadable bytes with their MIME type and file name.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub file_name: String,
}

/// A report tab after its query ran.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub report: Report,
    pub table: TabularResult,
}

pub fn run_report(conn: &Connection, report: Report, filters: &FilterContext) -> Result<ReportOutput> {
    let table = queries::execute(conn, &report.query(filters))?;
    log::debug!("{report}: {} rows", table.len());
    Ok(ReportOutput { report, table })
}

impl ReportOutput {
    /// Always available, even for an empty table (header line only).
    pub fn csv(&self) -> Result<ExportArtifact> {
        Ok(ExportArtifact {
            bytes: encode_csv(&self.table)?,
            mime: CSV_MIME,
            file_name: format!("{}.csv", self.report.csv_stem()),
        })
    }

    pub fn pdf_available(&self) -> bool {
        !self.table.is_empty()
    }

    /// `None` when the table is empty. A chart that fails to render fails the export.
    #[cfg(feature = "pdf")]
    pub fn pdf(&self) -> Result<Option<ExportArtifact>> {
        if !self.pdf_available() {
            return Ok(None);
        }
        let chart = self
            .report
            .chart()
            .map(|spec| crate::chart::render_chart(&self.table, &spec))
            .transpose()?;
        let bytes = crate::pdf::render_table(&self.table, self.report.title(), chart.as_ref())?;
        Ok(Some(ExportArtifact {
            bytes,
            mime: crate::pdf::PDF_MIME,
            file_name: format!("{}.pdf", self.report.pdf_stem()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryFilter, OrderStatus};
    use crate::queries::tests::{seed, test_db};
    use chrono::NaiveDate;

    fn march(start: u32, end: u32) -> FilterContext {
        FilterContext {
            date_start: NaiveDate::from_ymd_opt(2025, 3, start).unwrap(),
            date_end: NaiveDate::from_ymd_opt(2025, 3, end).unwrap(),
            max_amount: 100.0,
            status: OrderStatus::Delivered,
            category: CategoryFilter::All,
        }
    }

    #[test]
    fn test_keys_parse_back() {
        for report in Report::ALL {
            assert_eq!(report.key().parse::<Report>().unwrap(), report);
        }
        assert_eq!("Top_Products".parse::<Report>().unwrap(), Report::TopProducts);
        assert!(matches!(
            "ventas".parse::<Report>(),
            Err(CafeteriaError::UnknownReport(_))
        ));
    }

    #[test]
    fn test_fixed_metadata() {
        assert_eq!(Report::TopProducts.title(), "Productos más Vendidos");
        assert_eq!(Report::TopProducts.tab_label(), "Productos más vendidos");
        assert_eq!(Report::PaymentMethods.csv_stem(), "ingresos_por_metodo");
        assert_eq!(Report::PaymentMethods.pdf_stem(), "ingresos_por_metodo");
        assert_eq!(Report::TopProducts.csv_stem(), "top10_productos");
        assert_eq!(Report::TopProducts.pdf_stem(), "productos_mas_vendidos");
        assert_eq!(Report::OpenOrders.position(), 4);
        assert!(Report::Orders.chart().is_none());
        assert!(Report::OpenOrders.chart().is_none());
        let chart = Report::TopProducts.chart().unwrap();
        assert_eq!(chart.kind, ChartKind::HorizontalBar);
        assert_eq!(chart.x_label, "Unidades vendidas");
    }

    #[test]
    fn test_describe_filters_names_only_fields_read() {
        let catalog = CategoryCatalog::from_pairs([("Postres", 1)]);
        let filters = FilterContext {
            category: CategoryFilter::Only(1),
            ..march(1, 5)
        };
        assert_eq!(
            Report::Orders.describe_filters(&filters, &catalog),
            "2025-03-01 a 2025-03-05 | total <= Q100.00 | estado entregada"
        );
        assert_eq!(
            Report::DailySales.describe_filters(&filters, &catalog),
            "2025-03-01 a 2025-03-05"
        );
        assert!(Report::TopProducts
            .describe_filters(&filters, &catalog)
            .ends_with("categoría Postres"));
        assert!(!Report::OpenOrders
            .describe_filters(&filters, &catalog)
            .contains("2025"));
    }

    #[test]
    fn test_every_chart_names_result_columns() {
        let (_dir, conn) = test_db();
        seed(&conn);
        for report in Report::ALL {
            let out = run_report(&conn, report, &march(1, 5)).unwrap();
            if let Some(spec) = report.chart() {
                assert!(out.table.column_index(spec.category_field).is_some());
                assert!(out.table.column_index(spec.value_field).is_some());
            }
        }
    }

    #[test]
    fn test_csv_artifact() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let out = run_report(&conn, Report::PaymentMethods, &march(1, 5)).unwrap();
        let csv = out.csv().unwrap();
        assert_eq!(csv.mime, "text/csv");
        assert_eq!(csv.file_name, "ingresos_por_metodo.csv");
        let text = String::from_utf8(csv.bytes).unwrap();
        assert!(text.starts_with("metodo_pago,total_ingresos\n"));
        assert!(text.contains("efectivo,74.0\n"));
    }

    #[test]
    fn test_empty_top_products_offers_header_only_csv() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let out = run_report(&conn, Report::TopProducts, &march(20, 25)).unwrap();
        assert!(out.table.is_empty());
        assert!(!out.pdf_available());
        assert_eq!(out.csv().unwrap().bytes, b"nombre_producto,unidades\n");
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_pdf_artifact_skipped_when_empty() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let out = run_report(&conn, Report::TopProducts, &march(20, 25)).unwrap();
        assert!(out.pdf().unwrap().is_none());
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_pdf_artifact_with_chart() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let out = run_report(&conn, Report::DailySales, &march(1, 5)).unwrap();
        let pdf = out.pdf().unwrap().unwrap();
        assert_eq!(pdf.mime, "application/pdf");
        assert_eq!(pdf.file_name, "ventas_por_dia.pdf");
        assert!(pdf.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_open_orders_ignores_filters() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let narrow = FilterContext {
            max_amount: 0.0,
            category: CategoryFilter::Only(1),
            ..march(20, 20)
        };
        let a = run_report(&conn, Report::OpenOrders, &narrow).unwrap();
        let b = run_report(&conn, Report::OpenOrders, &march(1, 5)).unwrap();
        assert_eq!(a.table.len(), 2);
        assert_eq!(a.table, b.table);
    }
}
