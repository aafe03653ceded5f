use comfy_table::{Cell, Table};

use crate::cli::Session;
use crate::error::Result;
use crate::models::{CategoryCatalog, ALL_CATEGORIES};

pub fn list(db: Option<&str>) -> Result<()> {
    let session = Session::open(db)?;
    println!("Categories\n{}", render(&session.catalog));
    Ok(())
}

/// Selector order: the `Todas` sentinel first, then every category by name.
fn render(catalog: &CategoryCatalog) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    table.add_row(vec![Cell::new(""), Cell::new(ALL_CATEGORIES)]);
    for (name, id) in catalog.iter() {
        table.add_row(vec![Cell::new(id), Cell::new(name)]);
    }
    table
}
