use std::path::Path;

use assert_cmd::Command;
use chrono::{Duration, Local};
use predicates::prelude::*;

fn cafeteria(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cafeteria").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

/// Fresh database with demo data; returns (home dir, db path as string).
fn demo_db() -> (tempfile::TempDir, String) {
    let home = tempfile::tempdir().unwrap();
    let db = home.path().join("data").join("cafeteria.db");
    let db = db.to_str().unwrap().to_string();
    cafeteria(home.path()).args(["--db", &db, "init"]).assert().success();
    cafeteria(home.path())
        .args(["--db", &db, "demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo data loaded!"));
    (home, db)
}

fn demo_window() -> (String, String) {
    let today = Local::now().date_naive();
    (
        (today - Duration::days(13)).format("%Y-%m-%d").to_string(),
        today.format("%Y-%m-%d").to_string(),
    )
}

#[test]
fn init_with_data_dir_writes_settings_and_database() {
    let home = tempfile::tempdir().unwrap();
    let data = home.path().join("cafe");
    cafeteria(home.path())
        .args(["init", "--data-dir", data.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized cafeteria at"));
    assert!(data.join("cafeteria.db").exists());
    assert!(data.join("exports").is_dir());
    assert!(home.path().join(".config/cafeteria/settings.json").exists());

    cafeteria(home.path())
        .arg("categories")
        .assert()
        .success()
        .stdout(predicate::str::contains("Todas").and(predicate::str::contains("Postres")));
}

#[test]
fn report_without_database_fails() {
    let home = tempfile::tempdir().unwrap();
    let db = home.path().join("missing.db");
    cafeteria(home.path())
        .args(["--db", db.to_str().unwrap(), "report", "orders"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run `cafeteria init` first"));
}

#[test]
fn demo_is_loaded_once() {
    let (home, db) = demo_db();
    cafeteria(home.path())
        .args(["--db", &db, "demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo data not loaded"));
}

#[test]
fn report_csv_to_stdout() {
    let (home, db) = demo_db();
    let (from, to) = demo_window();
    cafeteria(home.path())
        .args(["--db", &db, "report", "payment-methods", "--from", &from, "--to", &to])
        .args(["--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("metodo_pago,total_ingresos\n"))
        .stdout(predicate::str::contains("efectivo"));
}

#[test]
fn report_table_shows_title() {
    let (home, db) = demo_db();
    cafeteria(home.path())
        .args(["--db", &db, "report", "open-orders"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pedidos abiertos"))
        .stdout(predicate::str::contains("fecha_hora_pedido"));
}

#[test]
fn unknown_values_are_rejected() {
    let (home, db) = demo_db();
    cafeteria(home.path())
        .args(["--db", &db, "report", "weekly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown report: weekly"));
    cafeteria(home.path())
        .args(["--db", &db, "report", "orders", "--status", "perdida"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown order status"));
    cafeteria(home.path())
        .args(["--db", &db, "report", "top-products", "--category", "Sopas"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown category"));
}

#[test]
fn export_csv_for_empty_report_is_header_only() {
    let (home, db) = demo_db();
    let out = home.path().join("out");
    cafeteria(home.path())
        .args(["--db", &db, "export", "top-products", "--format", "csv"])
        .args(["--from", "2000-01-01", "--to", "2000-01-02"])
        .args(["--output-dir", out.to_str().unwrap()])
        .assert()
        .success();
    let csv = std::fs::read_to_string(out.join("top10_productos.csv")).unwrap();
    assert_eq!(csv, "nombre_producto,unidades\n");
}

#[cfg(feature = "pdf")]
#[test]
fn export_pdf_skipped_for_empty_report() {
    let (home, db) = demo_db();
    let out = home.path().join("out");
    cafeteria(home.path())
        .args(["--db", &db, "export", "top-products", "--format", "pdf"])
        .args(["--from", "2000-01-01", "--to", "2000-01-02"])
        .args(["--output-dir", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("PDF skipped"));
    assert!(!out.join("productos_mas_vendidos.pdf").exists());
}

#[cfg(feature = "pdf")]
#[test]
fn export_all_writes_every_file() {
    let (home, db) = demo_db();
    let (from, to) = demo_window();
    cafeteria(home.path())
        .args(["--db", &db, "export", "all", "--from", &from, "--to", &to])
        .args(["--max-amount", "1000", "--status", "entregada"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10 file(s)"));

    let exports = Path::new(&db).parent().unwrap().join("exports");
    for (csv, pdf) in [
        ("pedidos_filtrados", "pedidos_filtrados"),
        ("ventas_por_dia", "ventas_por_dia"),
        ("ingresos_por_metodo", "ingresos_por_metodo"),
        ("top10_productos", "productos_mas_vendidos"),
        ("pedidos_abiertos", "pedidos_abiertos"),
    ] {
        assert!(exports.join(format!("{csv}.csv")).exists(), "{csv}.csv");
        let bytes = std::fs::read(exports.join(format!("{pdf}.pdf"))).unwrap();
        assert!(bytes.starts_with(b"%PDF"), "{pdf}.pdf");
    }
}

#[test]
fn status_reports_counts() {
    let (home, db) = demo_db();
    cafeteria(home.path())
        .args(["--db", &db, "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Orders:"))
        .stdout(predicate::str::contains("Open orders:"));
}

#[test]
fn completions_are_generated() {
    let home = tempfile::tempdir().unwrap();
    cafeteria(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cafeteria"));
}
