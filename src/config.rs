// ⚙️ Engine Configuration - the surface the settings dialog edits
// Row offsets, sheet name, fixed cell coordinates, output names, the name
// correction table, and the cap policy. String setters validate user text
// and keep the previous value on bad input — never a silent coercion.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::names::{known_roster_fixes, NameCorrection};
use crate::scoring::CapPolicy;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be a number, got '{value}' (previous value kept)")]
    NotNumeric { field: &'static str, value: String },

    #[error("{field} must be an A1-style cell reference, got '{value}' (previous value kept)")]
    InvalidCellRef { field: &'static str, value: String },
}

// ============================================================================
// CELL REFERENCE
// ============================================================================

/// A single A1-style cell coordinate ("D4"), stored zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        CellRef { row, col }
    }
}

impl FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let letters: String = s.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        let digits = &s[letters.len()..];

        if letters.is_empty() || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("'{}' is not an A1-style cell reference", s));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }

        let row: u32 = digits
            .parse()
            .map_err(|_| format!("'{}' has an invalid row number", s))?;
        if row == 0 {
            return Err(format!("'{}' has an invalid row number", s));
        }

        Ok(CellRef {
            row: row - 1,
            col: col - 1,
        })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut letters = String::new();
        let mut col = self.col + 1;
        while col > 0 {
            let rem = (col - 1) % 26;
            letters.insert(0, (b'A' + rem as u8) as char);
            col = (col - 1) / 26;
        }
        write!(f, "{}{}", letters, self.row + 1)
    }
}

impl TryFrom<String> for CellRef {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CellRef> for String {
    fn from(cell: CellRef) -> String {
        cell.to_string()
    }
}

// ============================================================================
// ENGINE CONFIG
// ============================================================================

/// All import-time and export-time configuration consumed by the engine.
/// Defaults match the shipped spreadsheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows to skip before the attendance export's header row.
    pub attendance_rows_to_skip: usize,

    /// First attendance row index that is no longer data (the export ends
    /// with a footer just past this bound).
    pub attendance_rows_end: usize,

    /// Sheet holding each member's self-report table.
    pub self_report_sheet: String,

    /// Rows to skip before the self-report table's header row.
    pub self_report_rows_to_skip: usize,

    /// Cell holding the member's name in a self-report file.
    pub name_cell: CellRef,

    /// Cell holding self-reported signup (duty) hours.
    pub signup_hours_cell: CellRef,

    /// Cell holding the self-reported call count.
    pub call_hours_cell: CellRef,

    /// Base name for the exported workbook.
    pub output_file_name: String,

    /// Sheet name in the exported workbook.
    pub output_sheet_name: String,

    /// Exact-match spelling corrections applied by the name normalizer.
    pub name_corrections: Vec<NameCorrection>,

    /// Optional annual caps; all off by default.
    pub caps: CapPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            attendance_rows_to_skip: 2,
            attendance_rows_end: 251,
            self_report_sheet: "point tracker".to_string(),
            self_report_rows_to_skip: 9,
            name_cell: CellRef::new(3, 3),        // D4
            signup_hours_cell: CellRef::new(6, 4), // E7
            call_hours_cell: CellRef::new(7, 4),   // E8
            output_file_name: "2024-01".to_string(),
            output_sheet_name: "Points Summary".to_string(),
            name_corrections: known_roster_fixes(),
            caps: CapPolicy::none(),
        }
    }
}

impl EngineConfig {
    // ------------------------------------------------------------------
    // String setters for the fields the settings form edits as text.
    // On error the field is untouched, so the previous valid value stays.
    // ------------------------------------------------------------------

    pub fn set_attendance_rows_to_skip(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.attendance_rows_to_skip = parse_count("attendance rows to skip", raw)?;
        Ok(())
    }

    pub fn set_attendance_rows_end(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.attendance_rows_end = parse_count("attendance end row", raw)?;
        Ok(())
    }

    pub fn set_self_report_rows_to_skip(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.self_report_rows_to_skip = parse_count("self-report rows to skip", raw)?;
        Ok(())
    }

    pub fn set_name_cell(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.name_cell = parse_cell("member name cell", raw)?;
        Ok(())
    }

    pub fn set_signup_hours_cell(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.signup_hours_cell = parse_cell("signup hours cell", raw)?;
        Ok(())
    }

    pub fn set_call_hours_cell(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.call_hours_cell = parse_cell("call hours cell", raw)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&text)
            .with_context(|| format!("cannot parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("cannot serialize config")?;
        std::fs::write(path, text)
            .with_context(|| format!("cannot write config file {}", path.display()))?;
        Ok(())
    }
}

fn parse_count(field: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::NotNumeric {
        field,
        value: raw.to_string(),
    })
}

fn parse_cell(field: &'static str, raw: &str) -> Result<CellRef, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidCellRef {
        field,
        value: raw.to_string(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
