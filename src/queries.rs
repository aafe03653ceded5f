use chrono::NaiveDate;
use rusqlite::types::{ToSql, ToSqlOutput};
use rusqlite::{params_from_iter, Connection};

use crate::error::Result;
use crate::models::{CategoryFilter, FilterContext, OrderStatus};
use crate::table::{TabularResult, Value};

// ---------------------------------------------------------------------------
// Bound parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Real(f64),
    Integer(i64),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::Text(s) => s.to_sql(),
            SqlParam::Real(r) => r.to_sql(),
            SqlParam::Integer(i) => i.to_sql(),
        }
    }
}

/// SQL text plus the values for its `?` placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl BoundQuery {
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

fn range_start(date: NaiveDate) -> SqlParam {
    SqlParam::Text(format!("{} 00:00:00", date.format("%Y-%m-%d")))
}

fn range_end(date: NaiveDate) -> SqlParam {
    SqlParam::Text(format!("{} 23:59:59", date.format("%Y-%m-%d")))
}

fn date_range(filters: &FilterContext) -> Vec<SqlParam> {
    vec![range_start(filters.date_start), range_end(filters.date_end)]
}

// ---------------------------------------------------------------------------
// Category clause
// ---------------------------------------------------------------------------

/// Predicate restricting `<alias>.id_categoria`, ready to append to a WHERE clause.
/// Empty with no params when every category is selected.
pub fn category_clause(category: CategoryFilter, alias: &str) -> (String, Vec<SqlParam>) {
    match category {
        CategoryFilter::All => (String::new(), Vec::new()),
        CategoryFilter::Only(id) => (
            format!(" AND {alias}.id_categoria = ? "),
            vec![SqlParam::Integer(id)],
        ),
    }
}

// ---------------------------------------------------------------------------
// Report queries
// ---------------------------------------------------------------------------

pub fn orders_detail(filters: &FilterContext) -> BoundQuery {
    let mut params = date_range(filters);
    params.push(SqlParam::Real(filters.max_amount));
    params.push(SqlParam::Text(filters.status.as_db().to_string()));
    BoundQuery {
        sql: "SELECT id_pedido, fecha_hora_pedido, total, estado_pedido \
              FROM pedidos \
              WHERE fecha_hora_pedido BETWEEN ? AND ? \
                AND total <= ? \
                AND estado_pedido = ? \
              ORDER BY fecha_hora_pedido"
            .to_string(),
        params,
    }
}

pub fn daily_sales(filters: &FilterContext) -> BoundQuery {
    BoundQuery {
        sql: "SELECT date(fecha_hora_pedido) AS fecha, SUM(total) AS ventas \
              FROM pedidos \
              WHERE fecha_hora_pedido BETWEEN ? AND ? \
              GROUP BY 1 \
              ORDER BY 1"
            .to_string(),
        params: date_range(filters),
    }
}

/// No ORDER BY: row order is whatever the database returns.
pub fn revenue_by_method(filters: &FilterContext) -> BoundQuery {
    BoundQuery {
        sql: "SELECT metodo_pago, SUM(monto) AS total_ingresos \
              FROM pagos \
              WHERE fecha_pago BETWEEN ? AND ? \
              GROUP BY 1"
            .to_string(),
        params: date_range(filters),
    }
}

/// Ties at the tenth place resolve in database order.
pub fn top_products(filters: &FilterContext) -> BoundQuery {
    let (cond, cat_params) = category_clause(filters.category, "p");
    let mut params = date_range(filters);
    params.extend(cat_params);
    BoundQuery {
        sql: format!(
            "SELECT p.nombre_producto, SUM(i.cantidad) AS unidades \
             FROM items_orden i \
             JOIN productos p USING (id_producto) \
             WHERE i.fecha_registro BETWEEN ? AND ?{cond} \
             GROUP BY p.nombre_producto \
             ORDER BY 2 DESC \
             LIMIT 10"
        ),
        params,
    }
}

/// Ignores every filter, including the status filter.
pub fn open_orders() -> BoundQuery {
    BoundQuery {
        sql: "SELECT id_pedido, fecha_hora_pedido, total \
              FROM pedidos \
              WHERE estado_pedido = ?"
            .to_string(),
        params: vec![SqlParam::Text(OrderStatus::Open.as_db().to_string())],
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

pub fn execute(conn: &Connection, query: &BoundQuery) -> Result<TabularResult> {
    debug_assert_eq!(query.placeholder_count(), query.params.len(), "{}", query.sql);
    log::debug!(
        "running query with {} bound params: {}",
        query.params.len(),
        query.sql
    );
    let mut stmt = conn.prepare(&query.sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Vec::with_capacity(width);
        for i in 0..width {
            record.push(Value::from(row.get_ref(i)?));
        }
        values.push(record);
    }
    log::debug!("query returned {} rows", values.len());
    TabularResult::new(columns, values)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn march(start: u32, end: u32) -> FilterContext {
        FilterContext {
            date_start: day(start),
            date_end: day(end),
            max_amount: 100.0,
            status: OrderStatus::Delivered,
            category: CategoryFilter::All,
        }
    }

    fn category_id(conn: &Connection, name: &str) -> i64 {
        conn.query_row(
            "SELECT id_categoria FROM categorias WHERE nombre_categoria = ?1",
            [name],
            |r| r.get(0),
        )
        .unwrap()
    }

    pub(crate) fn seed(conn: &Connection) {
        let bebidas = category_id(conn, "Bebidas calientes");
        let postres = category_id(conn, "Postres");
        let products = [
            ("Café americano", 12.0, bebidas),
            ("Capuchino", 18.0, bebidas),
            ("Pastel de chocolate", 22.0, postres),
        ];
        for (name, price, cat) in products {
            conn.execute(
                "INSERT INTO productos (nombre_producto, precio, id_categoria) VALUES (?1, ?2, ?3)",
                rusqlite::params![name, price, cat],
            )
            .unwrap();
        }
        let orders = [
            ("2025-03-01 08:15:00", 30.0, "entregada"),
            ("2025-03-01 12:40:00", 150.0, "entregada"),
            ("2025-03-02 09:05:00", 44.0, "entregada"),
            ("2025-03-02 23:30:00", 18.0, "abierta"),
            ("2025-03-05 10:00:00", 12.0, "abierta"),
        ];
        for (ts, total, status) in orders {
            conn.execute(
                "INSERT INTO pedidos (fecha_hora_pedido, total, estado_pedido) VALUES (?1, ?2, ?3)",
                rusqlite::params![ts, total, status],
            )
            .unwrap();
        }
        let items = [
            (1, 1, 1, "2025-03-01 08:15:00"),
            (1, 3, 1, "2025-03-01 08:15:00"),
            (2, 2, 5, "2025-03-01 12:40:00"),
            (3, 3, 2, "2025-03-02 09:05:00"),
            (4, 2, 1, "2025-03-02 23:30:00"),
        ];
        for (order, product, qty, ts) in items {
            conn.execute(
                "INSERT INTO items_orden (id_pedido, id_producto, cantidad, fecha_registro) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![order, product, qty, ts],
            )
            .unwrap();
        }
        let payments = [
            (1, "efectivo", 30.0, "2025-03-01 08:16:00"),
            (2, "tarjeta", 150.0, "2025-03-01 12:41:00"),
            (3, "efectivo", 44.0, "2025-03-02 09:06:00"),
        ];
        for (order, method, amount, ts) in payments {
            conn.execute(
                "INSERT INTO pagos (id_pedido, metodo_pago, monto, fecha_pago) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![order, method, amount, ts],
            )
            .unwrap();
        }
    }

    #[test]
    fn test_category_clause_all_is_empty() {
        let (sql, params) = category_clause(CategoryFilter::All, "p");
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn test_category_clause_concrete() {
        let (sql, params) = category_clause(CategoryFilter::Only(3), "p");
        assert!(sql.contains("p.id_categoria = ?"));
        assert_eq!(sql.matches('?').count(), params.len());
        assert_eq!(params, vec![SqlParam::Integer(3)]);
    }

    #[test]
    fn test_every_query_binds_all_placeholders() {
        let mut f = march(1, 2);
        let queries = [
            orders_detail(&f),
            daily_sales(&f),
            revenue_by_method(&f),
            top_products(&f),
            open_orders(),
        ];
        for q in &queries {
            assert_eq!(q.placeholder_count(), q.params.len(), "{}", q.sql);
        }
        f.category = CategoryFilter::Only(2);
        let q = top_products(&f);
        assert_eq!(q.placeholder_count(), q.params.len());
    }

    #[test]
    fn test_top_products_param_counts() {
        let mut f = march(1, 2);
        assert_eq!(top_products(&f).params.len(), 2);
        f.category = CategoryFilter::Only(9);
        let q = top_products(&f);
        assert_eq!(q.params.len(), 3);
        assert_eq!(q.params[2], SqlParam::Integer(9));
    }

    #[test]
    fn test_filter_values_are_never_inlined() {
        let mut f = march(1, 2);
        f.max_amount = 777.25;
        f.category = CategoryFilter::Only(4242);
        for q in [orders_detail(&f), top_products(&f)] {
            assert!(!q.sql.contains("777"));
            assert!(!q.sql.contains("4242"));
            assert!(!q.sql.contains("2025-03"));
            assert!(!q.sql.contains("entregada"));
        }
    }

    #[test]
    fn test_orders_detail_filters_and_sorts() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let t = execute(&conn, &orders_detail(&march(1, 2))).unwrap();
        assert_eq!(t.columns(), ["id_pedido", "fecha_hora_pedido", "total", "estado_pedido"]);
        // 150.0 exceeds the max amount; the open order does not match the status.
        let ids: Vec<i64> = t
            .rows()
            .iter()
            .map(|r| match r[0] {
                Value::Integer(i) => i,
                _ => panic!("id not an integer"),
            })
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_end_date_includes_whole_day() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let mut f = march(2, 2);
        f.status = OrderStatus::Open;
        let t = execute(&conn, &orders_detail(&f)).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows()[0][1], Value::Text("2025-03-02 23:30:00".into()));
    }

    #[test]
    fn test_inverted_range_returns_no_rows() {
        let (_dir, conn) = test_db();
        seed(&conn);
        // Same days as the filters-and-sorts case, start after end.
        let f = march(2, 1);
        assert!(f.date_start > f.date_end);
        let t = execute(&conn, &orders_detail(&f)).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.columns().len(), 4);
        assert!(execute(&conn, &daily_sales(&f)).unwrap().is_empty());
    }

    #[test]
    fn test_daily_sales_groups_by_date() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let t = execute(&conn, &daily_sales(&march(1, 2))).unwrap();
        assert_eq!(t.columns(), ["fecha", "ventas"]);
        let shown: Vec<Vec<String>> = t.display_rows().collect();
        assert_eq!(
            shown,
            vec![
                vec!["2025-03-01".to_string(), "180.00".to_string()],
                vec!["2025-03-02".to_string(), "62.00".to_string()],
            ]
        );
    }

    #[test]
    fn test_revenue_by_method_sums() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let t = execute(&conn, &revenue_by_method(&march(1, 5))).unwrap();
        assert_eq!(t.columns(), ["metodo_pago", "total_ingresos"]);
        let mut shown: Vec<Vec<String>> = t.display_rows().collect();
        shown.sort();
        assert_eq!(
            shown,
            vec![
                vec!["efectivo".to_string(), "74.00".to_string()],
                vec!["tarjeta".to_string(), "150.00".to_string()],
            ]
        );
    }

    #[test]
    fn test_top_products_with_and_without_category() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let mut f = march(1, 5);
        let t = execute(&conn, &top_products(&f)).unwrap();
        assert_eq!(t.columns(), ["nombre_producto", "unidades"]);
        assert_eq!(t.rows()[0][0], Value::Text("Capuchino".into()));
        assert_eq!(t.rows()[0][1], Value::Integer(6));
        assert_eq!(t.len(), 3);

        f.category = CategoryFilter::Only(category_id(&conn, "Postres"));
        let t = execute(&conn, &top_products(&f)).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows()[0][0], Value::Text("Pastel de chocolate".into()));
    }

    #[test]
    fn test_top_products_limits_to_ten() {
        let (_dir, conn) = test_db();
        let cat = category_id(&conn, "Panadería");
        conn.execute(
            "INSERT INTO pedidos (fecha_hora_pedido, total) VALUES ('2025-03-01 07:00:00', 1.0)",
            [],
        )
        .unwrap();
        for n in 0..12 {
            conn.execute(
                "INSERT INTO productos (nombre_producto, id_categoria) VALUES (?1, ?2)",
                rusqlite::params![format!("Pan {n:02}"), cat],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO items_orden (id_pedido, id_producto, cantidad, fecha_registro) \
                 VALUES (1, ?1, ?2, '2025-03-01 07:00:00')",
                rusqlite::params![conn.last_insert_rowid(), n + 1],
            )
            .unwrap();
        }
        let t = execute(&conn, &top_products(&march(1, 1))).unwrap();
        assert_eq!(t.len(), 10);
        assert_eq!(t.rows()[0][1], Value::Integer(12));
    }

    #[test]
    fn test_open_orders_ignores_filters() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let t = execute(&conn, &open_orders()).unwrap();
        assert_eq!(t.columns(), ["id_pedido", "fecha_hora_pedido", "total"]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_empty_result_keeps_columns() {
        let (_dir, conn) = test_db();
        let t = execute(&conn, &top_products(&march(1, 2))).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.columns(), ["nombre_producto", "unidades"]);
    }
}
