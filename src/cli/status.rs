use crate::db::open_read_only;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::models::OrderStatus;
use crate::settings::{load_settings, resolve_db_path, resolve_exports_dir};

const COUNTED_TABLES: &[(&str, &str)] = &[
    ("Categories:", "categorias"),
    ("Products:", "productos"),
    ("Orders:", "pedidos"),
    ("Order items:", "items_orden"),
    ("Payments:", "pagos"),
];

pub fn run(db: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let db_path = resolve_db_path(db);

    let name = if settings.cafeteria_name.is_empty() {
        "(not set)"
    } else {
        &settings.cafeteria_name
    };
    println!("Cafeteria:  {name}");
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    println!("Exports:    {}", resolve_exports_dir(db).display());
    println!("Max amount: {}", crate::fmt::money(settings.default_max_amount));

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = open_read_only(&db_path)?;
        println!();
        for (label, table) in COUNTED_TABLES {
            let count: i64 =
                conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?;
            println!("{label:<14} {count}");
        }
        let open: i64 = conn.query_row(
            "SELECT count(*) FROM pedidos WHERE estado_pedido = ?1",
            [OrderStatus::Open.as_db()],
            |r| r.get(0),
        )?;
        println!("{:<14} {open}", "Open orders:");
    } else {
        println!();
        println!("Database not found. Run `cafeteria init` to set up.");
    }

    Ok(())
}
