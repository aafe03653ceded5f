pub mod categories;
pub mod dashboard;
pub mod demo;
pub mod export;
pub mod init;
pub mod report;
pub mod status;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use rusqlite::Connection;

use crate::db::open_read_only;
use crate::error::Result;
use crate::models::{parse_date, CategoryCatalog, FilterContext, OrderStatus};
use crate::settings::{load_settings, resolve_db_path, Settings};

#[derive(Parser)]
#[command(
    name = "cafeteria",
    version,
    about = "Sales, payment and product reports for a cafeteria, with CSV and PDF export."
)]
pub struct Cli {
    /// Database file (default: <data_dir>/cafeteria.db)
    #[arg(long, global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and create the database.
    Init {
        /// Path for cafeteria data (default: ~/Documents/cafeteria)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Load two weeks of sample orders, items and payments.
    Demo,
    /// Print one report to the terminal.
    Report {
        /// orders, daily-sales, payment-methods, top-products or open-orders
        report: String,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
        format: ReportFormat,
    },
    /// Write report files (CSV always, PDF when the report has rows).
    Export {
        /// A report key, or `all`
        report: String,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_enum, default_value_t = ExportFormat::Both)]
        format: ExportFormat,
        /// Output directory (default: <data_dir>/exports)
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
    },
    /// List product categories.
    Categories,
    /// Show configuration and row counts.
    Status,
    /// Interactive report tabs (the default when no command is given).
    Dashboard {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print shell completions.
    Completions {
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Table,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Pdf,
    Both,
}

impl ExportFormat {
    pub fn csv(&self) -> bool {
        matches!(self, ExportFormat::Csv | ExportFormat::Both)
    }

    pub fn pdf(&self) -> bool {
        matches!(self, ExportFormat::Pdf | ExportFormat::Both)
    }
}

/// Filter flags shared by `report`, `export` and `dashboard`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Start date: YYYY-MM-DD (default: the end date)
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// End date, included whole: YYYY-MM-DD (default: today)
    #[arg(long = "to")]
    pub to_date: Option<String>,
    /// Largest order total shown in the orders report (default from settings)
    #[arg(long = "max-amount")]
    pub max_amount: Option<f64>,
    /// Order status: abierta, preparacion, lista, entregada, cancelada (or English)
    #[arg(long)]
    pub status: Option<String>,
    /// Category name, or `Todas`
    #[arg(long)]
    pub category: Option<String>,
}

impl FilterArgs {
    /// Validate every flag and build the filter context. Nothing here touches the database
    /// beyond the already loaded catalog.
    pub fn to_context(&self, catalog: &CategoryCatalog, settings: &Settings) -> Result<FilterContext> {
        let mut ctx = FilterContext::with_max_amount(self.max_amount.unwrap_or(settings.default_max_amount));
        if let Some(to) = &self.to_date {
            ctx.date_end = parse_date(to)?;
        }
        ctx.date_start = match &self.from_date {
            Some(from) => parse_date(from)?,
            None => ctx.date_end,
        };
        if let Some(status) = &self.status {
            ctx.status = status.parse::<OrderStatus>()?;
        }
        if let Some(category) = &self.category {
            ctx.category = catalog.resolve(category)?;
        }
        Ok(ctx)
    }
}

/// Everything one reporting command needs: a read-only connection reused for every query,
/// the category catalog and the settings.
pub(crate) struct Session {
    pub conn: Connection,
    pub catalog: CategoryCatalog,
    pub settings: Settings,
}

impl Session {
    pub fn open(db: Option<&str>) -> Result<Self> {
        let path = resolve_db_path(db);
        let conn = open_read_only(&path)?;
        let catalog = CategoryCatalog::load(&conn)?;
        log::debug!("opened {} ({} categories)", path.display(), catalog.len());
        Ok(Self {
            conn,
            catalog,
            settings: load_settings(),
        })
    }
}
