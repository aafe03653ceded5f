use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::cli::{ExportFormat, FilterArgs, Session};
use crate::error::Result;
use crate::reports::{run_report, ExportArtifact, Report, ReportOutput};
use crate::settings::{resolve_exports_dir, shellexpand_path};

pub(crate) fn write_artifact(dir: &Path, artifact: &ExportArtifact) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&artifact.file_name);
    std::fs::write(&path, &artifact.bytes)?;
    log::info!(
        "wrote {} ({}, {} bytes)",
        path.display(),
        artifact.mime,
        artifact.bytes.len()
    );
    Ok(path)
}

pub(crate) fn save_csv(out: &ReportOutput, dir: &Path) -> Result<PathBuf> {
    write_artifact(dir, &out.csv()?)
}

/// `Ok(None)` when the report has no rows.
#[cfg(feature = "pdf")]
pub(crate) fn save_pdf(out: &ReportOutput, dir: &Path) -> Result<Option<PathBuf>> {
    match out.pdf()? {
        Some(artifact) => write_artifact(dir, &artifact).map(Some),
        None => {
            log::warn!("{}: no rows, PDF not written", out.report);
            Ok(None)
        }
    }
}

#[cfg(not(feature = "pdf"))]
pub(crate) fn save_pdf(_out: &ReportOutput, _dir: &Path) -> Result<Option<PathBuf>> {
    Err(crate::error::CafeteriaError::Pdf(
        "built without the `pdf` feature".to_string(),
    ))
}

/// Targets for an export command: one report key, or `all` for every tab.
fn targets(key: &str) -> Result<Vec<Report>> {
    if key.trim().eq_ignore_ascii_case("all") {
        Ok(Report::ALL.to_vec())
    } else {
        Ok(vec![key.parse()?])
    }
}

pub fn run(
    db: Option<&str>,
    key: &str,
    filters: &FilterArgs,
    format: ExportFormat,
    output_dir: Option<String>,
) -> Result<()> {
    let reports = targets(key)?;
    let session = Session::open(db)?;
    let ctx = filters.to_context(&session.catalog, &session.settings)?;
    let dir = output_dir
        .map(|d| PathBuf::from(shellexpand_path(&d)))
        .unwrap_or_else(|| resolve_exports_dir(db));

    let mut written = 0;
    for report in reports {
        let out = run_report(&session.conn, report, &ctx)?;
        if format.csv() {
            let path = save_csv(&out, &dir)?;
            println!("Wrote {}", path.display());
            written += 1;
        }
        if format.pdf() {
            match save_pdf(&out, &dir)? {
                Some(path) => {
                    println!("Wrote {}", path.display());
                    written += 1;
                }
                None => println!(
                    "{}",
                    format!("{}: no rows, PDF skipped", report.title()).yellow()
                ),
            }
        }
    }

    println!("{written} file(s) in {}", dir.display());
    Ok(())
}
