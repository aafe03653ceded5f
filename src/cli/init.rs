use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{
    load_settings, resolve_db_path, save_settings, settings_file_exists, shellexpand_path,
};

pub fn run(db: Option<&str>, data_dir: Option<String>) -> Result<()> {
    // An explicit database file needs no settings.
    if let Some(path) = db {
        let db_path = resolve_db_path(Some(path));
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = get_connection(&db_path)?;
        init_db(&conn)?;
        println!("Initialized database at {}", db_path.display());
        return Ok(());
    }

    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if !settings_file_exists() {
        let default = &settings.data_dir;
        println!("Data directory [{}]: ", default);
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).ok();
        let chosen = input.trim();
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(chosen);
        }
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(settings.exports_dir())?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;

    println!("Initialized cafeteria at {}", resolved.display());
    Ok(())
}
