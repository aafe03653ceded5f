mod chart;
mod cli;
mod db;
mod delimited;
mod error;
mod fmt;
mod models;
#[cfg(feature = "pdf")]
mod pdf;
mod queries;
mod reports;
mod settings;
mod table;
mod tui;

use clap::{CommandFactory, Parser};
use env_logger::Env;

use cli::{Cli, Commands, FilterArgs};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let db = cli.db.as_deref();

    let result = match cli.command {
        None => cli::dashboard::run(db, &FilterArgs::default()),
        Some(Commands::Dashboard { filters }) => cli::dashboard::run(db, &filters),
        Some(Commands::Init { data_dir }) => cli::init::run(db, data_dir),
        Some(Commands::Demo) => cli::demo::run(db),
        Some(Commands::Report {
            report,
            filters,
            format,
        }) => cli::report::run(db, &report, &filters, format),
        Some(Commands::Export {
            report,
            filters,
            format,
            output_dir,
        }) => cli::export::run(db, &report, &filters, format, output_dir),
        Some(Commands::Categories) => cli::categories::list(db),
        Some(Commands::Status) => cli::status::run(db),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
