// 📤 Ledger Export - write the points summary workbook
// The column order and content are a compatibility contract with the
// downstream spreadsheet consumers; cell styling is deliberately not
// applied here.

use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::ledger::{Ledger, LEDGER_COLUMNS};

/// Default export file name, derived from the configured base name.
pub fn default_output_path(config: &EngineConfig) -> PathBuf {
    PathBuf::from(format!("{} Points Record.xlsx", config.output_file_name))
}

/// Write the ledger to an xlsx workbook: one header row, then one row per
/// member in key order, every numeric field as a number.
pub fn write_xlsx(ledger: &Ledger, path: &Path, sheet_name: &str) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook
        .add_worksheet()
        .set_name(sheet_name)
        .with_context(|| format!("invalid output sheet name '{}'", sheet_name))?;

    for (col, heading) in LEDGER_COLUMNS.iter().enumerate() {
        sheet
            .write_string(0, col as u16, *heading)
            .context("cannot write header row")?;
    }

    for (i, record) in ledger.records().enumerate() {
        let row = i as u32 + 1;
        sheet
            .write_string(row, 0, record.name.as_str())
            .with_context(|| format!("cannot write row for {}", record.name))?;
        for (j, value) in record.numeric_row().iter().enumerate() {
            sheet
                .write_number(row, j as u16 + 1, *value)
                .with_context(|| format!("cannot write row for {}", record.name))?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("cannot save workbook to {}", path.display()))?;

    log::info!("exported {} members to {}", ledger.len(), path.display());
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
