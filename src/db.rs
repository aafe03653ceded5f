use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::error::{CafeteriaError, Result};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categorias (
    id_categoria INTEGER PRIMARY KEY,
    nombre_categoria TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS productos (
    id_producto INTEGER PRIMARY KEY,
    nombre_producto TEXT NOT NULL,
    precio REAL NOT NULL DEFAULT 0,
    id_categoria INTEGER,
    FOREIGN KEY (id_categoria) REFERENCES categorias(id_categoria)
);

CREATE TABLE IF NOT EXISTS pedidos (
    id_pedido INTEGER PRIMARY KEY,
    fecha_hora_pedido TEXT NOT NULL,
    total REAL NOT NULL DEFAULT 0,
    estado_pedido TEXT NOT NULL DEFAULT 'abierta'
        CHECK (estado_pedido IN ('abierta', 'preparacion', 'lista', 'entregada', 'cancelada')),
    id_categoria INTEGER,
    FOREIGN KEY (id_categoria) REFERENCES categorias(id_categoria)
);

CREATE TABLE IF NOT EXISTS items_orden (
    id_item INTEGER PRIMARY KEY,
    id_pedido INTEGER NOT NULL,
    id_producto INTEGER NOT NULL,
    cantidad INTEGER NOT NULL,
    fecha_registro TEXT NOT NULL,
    FOREIGN KEY (id_pedido) REFERENCES pedidos(id_pedido),
    FOREIGN KEY (id_producto) REFERENCES productos(id_producto)
);

CREATE TABLE IF NOT EXISTS pagos (
    id_pago INTEGER PRIMARY KEY,
    id_pedido INTEGER,
    metodo_pago TEXT NOT NULL,
    monto REAL NOT NULL,
    fecha_pago TEXT NOT NULL,
    FOREIGN KEY (id_pedido) REFERENCES pedidos(id_pedido)
);

CREATE INDEX IF NOT EXISTS idx_pedidos_fecha ON pedidos(fecha_hora_pedido);
CREATE INDEX IF NOT EXISTS idx_items_fecha ON items_orden(fecha_registro);
CREATE INDEX IF NOT EXISTS idx_pagos_fecha ON pagos(fecha_pago);
";

const DEFAULT_CATEGORIES: &[&str] = &["Bebidas calientes", "Bebidas frías", "Panadería", "Postres", "Sándwiches"];

/// Read-write connection, used by `init` and `demo`.
pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Read-only connection for reporting. Every report query runs on one of these.
pub fn open_read_only(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        return Err(CafeteriaError::NotInitialized(db_path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    log::debug!("opened {} read-only", db_path.display());
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categorias", [], |row| row.get(0))?;
    if count == 0 {
        for name in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO categorias (nombre_categoria) VALUES (?1)",
                [name],
            )?;
        }
    }
    Ok(())
}
