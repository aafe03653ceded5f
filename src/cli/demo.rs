use chrono::{Duration, Local, NaiveDate};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::{CafeteriaError, Result};
use crate::models::OrderStatus;
use crate::settings::resolve_db_path;

/// Days of sample orders, ending today.
const DAYS: i64 = 14;

struct DemoProduct {
    name: &'static str,
    price: f64,
    category: &'static str,
}

const PRODUCTS: &[DemoProduct] = &[
    DemoProduct { name: "Café americano", price: 12.0, category: "Bebidas calientes" },
    DemoProduct { name: "Capuchino", price: 18.0, category: "Bebidas calientes" },
    DemoProduct { name: "Chocolate caliente", price: 16.0, category: "Bebidas calientes" },
    DemoProduct { name: "Limonada", price: 10.0, category: "Bebidas frías" },
    DemoProduct { name: "Frappé de moca", price: 24.0, category: "Bebidas frías" },
    DemoProduct { name: "Croissant", price: 9.0, category: "Panadería" },
    DemoProduct { name: "Pan de banano", price: 11.0, category: "Panadería" },
    DemoProduct { name: "Pastel de chocolate", price: 22.0, category: "Postres" },
    DemoProduct { name: "Cheesecake", price: 25.0, category: "Postres" },
    DemoProduct { name: "Sándwich de pollo", price: 32.0, category: "Sándwiches" },
    DemoProduct { name: "Panini caprese", price: 35.0, category: "Sándwiches" },
];

const METHODS: &[&str] = &["efectivo", "tarjeta", "transferencia"];

struct DemoItem {
    product: usize,
    qty: i64,
}

struct DemoOrder {
    timestamp: String,
    status: OrderStatus,
    items: Vec<DemoItem>,
    method: &'static str,
}

impl DemoOrder {
    fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|i| PRODUCTS[i.product].price * i.qty as f64)
            .sum()
    }

    /// Open and cancelled orders carry no payment.
    fn is_paid(&self) -> bool {
        !matches!(self.status, OrderStatus::Open | OrderStatus::Cancelled)
    }
}

/// Deterministic orders for the `DAYS` days ending at `today`. Today's orders are still
/// in progress; earlier days are delivered apart from the odd cancellation.
fn generate_orders(today: NaiveDate) -> Vec<DemoOrder> {
    let mut orders = Vec::new();
    for d in 0..DAYS {
        let date = today - Duration::days(DAYS - 1 - d);
        let is_today = d == DAYS - 1;
        let per_day = 5 + (d % 4) as usize;
        for k in 0..per_day {
            let seq = orders.len();
            let hour = 7 + (k * 2) % 12;
            let minute = (seq * 17) % 60;
            let first = seq % PRODUCTS.len();
            let mut items = vec![DemoItem {
                product: first,
                qty: 1 + (seq % 3) as i64,
            }];
            if seq % 2 == 0 {
                items.push(DemoItem {
                    product: (first + 5) % PRODUCTS.len(),
                    qty: 1,
                });
            }
            let status = if is_today {
                match k % 4 {
                    0 | 1 => OrderStatus::Open,
                    2 => OrderStatus::Preparing,
                    _ => OrderStatus::Ready,
                }
            } else if seq % 11 == 5 {
                OrderStatus::Cancelled
            } else {
                OrderStatus::Delivered
            };
            orders.push(DemoOrder {
                timestamp: format!("{} {hour:02}:{minute:02}:00", date.format("%Y-%m-%d")),
                status,
                items,
                method: METHODS[seq % METHODS.len()],
            });
        }
    }
    orders
}

struct DemoSummary {
    products: usize,
    orders: usize,
    payments: usize,
}

fn category_id(conn: &Connection, name: &str) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT id_categoria FROM categorias WHERE nombre_categoria = ?1",
        [name],
        |r| r.get(0),
    )?)
}

fn insert_demo_data(conn: &Connection, today: NaiveDate) -> Result<DemoSummary> {
    let mut product_ids = Vec::with_capacity(PRODUCTS.len());
    let mut product_categories = Vec::with_capacity(PRODUCTS.len());
    for product in PRODUCTS {
        let cat = category_id(conn, product.category)?;
        conn.execute(
            "INSERT INTO productos (nombre_producto, precio, id_categoria) VALUES (?1, ?2, ?3)",
            rusqlite::params![product.name, product.price, cat],
        )?;
        product_ids.push(conn.last_insert_rowid());
        product_categories.push(cat);
    }

    let orders = generate_orders(today);
    let mut payments = 0;
    for order in &orders {
        let first = order.items.first().map(|i| i.product).unwrap_or(0);
        conn.execute(
            "INSERT INTO pedidos (fecha_hora_pedido, total, estado_pedido, id_categoria) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                order.timestamp,
                order.total(),
                order.status.as_db(),
                product_categories[first]
            ],
        )?;
        let order_id = conn.last_insert_rowid();

        for item in &order.items {
            conn.execute(
                "INSERT INTO items_orden (id_pedido, id_producto, cantidad, fecha_registro) \
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![order_id, product_ids[item.product], item.qty, order.timestamp],
            )?;
        }

        if order.is_paid() {
            conn.execute(
                "INSERT INTO pagos (id_pedido, metodo_pago, monto, fecha_pago) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![order_id, order.method, order.total(), order.timestamp],
            )?;
            payments += 1;
        }
    }

    Ok(DemoSummary {
        products: PRODUCTS.len(),
        orders: orders.len(),
        payments,
    })
}

pub fn run(db: Option<&str>) -> Result<()> {
    let db_path = resolve_db_path(db);
    if !db_path.exists() {
        return Err(CafeteriaError::NotInitialized(db_path));
    }

    let conn = get_connection(&db_path)?;
    init_db(&conn)?;

    // Idempotency guard
    let has_orders: bool =
        conn.query_row("SELECT EXISTS(SELECT 1 FROM pedidos)", [], |r| r.get(0))?;
    if has_orders {
        println!("Database already has orders; demo data not loaded.");
        return Ok(());
    }

    let summary = insert_demo_data(&conn, Local::now().date_naive())?;
    log::info!("demo data written to {}", db_path.display());

    println!("Demo data loaded!");
    println!("  Products:  {}", summary.products);
    println!("  Orders:    {}", summary.orders);
    println!("  Payments:  {}", summary.payments);
    println!();
    println!("Try these next:");
    println!("  cafeteria report orders");
    println!("  cafeteria report daily-sales --from {}", (Local::now().date_naive() - Duration::days(DAYS - 1)).format("%Y-%m-%d"));
    println!("  cafeteria export all");
    println!("  cafeteria dashboard");

    Ok(())
}
