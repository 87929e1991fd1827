//! Spreadsheet export of the held roster.

use anyhow::{anyhow, Result};
use rust_xlsxwriter::Workbook;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::api::RosterEntry;

pub const EXPORT_FILE_NAME: &str = "client_data.xlsx";
pub const SHEET_NAME: &str = "Client Data";
/// Header row, matching the API's field names.
pub const COLUMNS: [&str; 3] = ["name", "college", "productJSON"];

/// Serialize roster entries to xlsx bytes: a header row, then one row per
/// entry with its raw fields.
pub fn roster_workbook(entries: &[RosterEntry]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, title) in COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *title)?;
    }

    for (i, entry) in entries.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &entry.name)?;
        sheet.write_string(row, 1, &entry.college)?;
        sheet.write_string(row, 2, &entry.product_json)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// First path in `dir` that does not exist yet: `client_data.xlsx`, then
/// `client_data (1).xlsx`, `client_data (2).xlsx`, ...
pub fn available_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{}", ext)),
        None => (file_name, String::new()),
    };
    (1..)
        .map(|n| dir.join(format!("{} ({}){}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Write the roster workbook into `dir` without clobbering an earlier
/// export. Returns the path written.
pub fn export_roster(entries: &[RosterEntry], dir: &Path) -> Result<PathBuf> {
    let bytes = roster_workbook(entries)?;

    std::fs::create_dir_all(dir)?;
    let target = available_path(dir, EXPORT_FILE_NAME);

    // Temp file in the same directory so the final rename stays atomic
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&bytes)?;
    temp.flush()?;
    temp.persist_noclobber(&target)
        .map_err(|e| anyhow!("Failed to save {:?}: {}", target, e.error))?;

    info!("Exported {} roster entries to {:?}", entries.len(), target);
    Ok(target)
}

/// Where exports land: the user's download directory, else their home.
pub fn export_dir() -> Option<PathBuf> {
    dirs::download_dir().or_else(dirs::home_dir)
}
