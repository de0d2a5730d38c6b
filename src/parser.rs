// 🏗️ Importer Framework - one importer per external source
// Attendance roster (xls) and incident-response log (csv) live here; the
// directory-based self-report importer is in self_report.rs.

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::ledger::{Category, MemberKey, MemberUpdate};
use crate::names::NameNormalizer;
use crate::scoring;

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceType - which external export a measurement came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    /// "I Am Responding" duty-roster export (.xls)
    Attendance,
    /// ePCR incident-response log export (.csv)
    ResponseLog,
    /// Per-member self-report spreadsheets (.xlsx directory)
    SelfReport,
}

impl SourceType {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            SourceType::Attendance => "Attendance Roster",
            SourceType::ResponseLog => "Response Log",
            SourceType::SelfReport => "Member Self-Reports",
        }
    }

    /// Short code for internal use
    pub fn code(&self) -> &str {
        match self {
            SourceType::Attendance => "IAR",
            SourceType::ResponseLog => "ePCR",
            SourceType::SelfReport => "SR",
        }
    }
}

/// ImportError - a source file could not be read or is missing required
/// structure. A failed import never touches the ledger.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("cannot open {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("{path}: sheet '{sheet}' not found")]
    MissingSheet { path: PathBuf, sheet: String },

    #[error("{path}: expected column '{column}' not found")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Summary of one completed import, for display to the user.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub source: SourceType,
    /// Data rows actually read (after skips/bounds, before grouping).
    pub rows_read: usize,
    /// Distinct members produced.
    pub members: usize,
    pub imported_at: DateTime<Utc>,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        format!(
            "{}: {} rows read, {} members scored",
            self.source.name(),
            self.rows_read,
            self.members
        )
    }
}

/// Output of one importer run: scored per-member category values plus the
/// report. Raw rows are not kept beyond the import that produced them.
#[derive(Debug, Clone)]
pub struct SourceImport {
    pub updates: Vec<MemberUpdate>,
    pub report: ImportReport,
}

// ============================================================================
// IMPORTER TRAIT
// ============================================================================

/// Common contract for the three source importers.
///
/// `path` is a file for the tabular sources and a directory for the
/// self-report variant. Implementations use the normalizer for every name
/// they emit, so ledger joins are always on canonical keys.
pub trait SourceImporter: Send + Sync {
    fn import(
        &self,
        path: &Path,
        config: &EngineConfig,
        names: &NameNormalizer,
    ) -> Result<SourceImport, ImportError>;

    fn source_type(&self) -> SourceType;
}

/// Factory: importer for a given source type.
pub fn get_importer(source: SourceType) -> Box<dyn SourceImporter> {
    match source {
        SourceType::Attendance => Box::new(AttendanceImporter::new()),
        SourceType::ResponseLog => Box::new(ResponseLogImporter::new()),
        SourceType::SelfReport => Box::new(crate::self_report::SelfReportImporter::new()),
    }
}

// ============================================================================
// CELL HELPERS (shared with self_report.rs)
// ============================================================================

/// Non-empty trimmed text content of a cell, if any.
pub(crate) fn cell_text(cell: Option<&Data>) -> Option<String> {
    match cell? {
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Data::Float(f) => Some(format!("{}", f)),
        Data::Int(i) => Some(format!("{}", i)),
        _ => None,
    }
}

/// Numeric content of a cell, if any. Text that parses as a number counts.
pub(crate) fn cell_number(cell: Option<&Data>) -> Option<f64> {
    match cell? {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Open a workbook and read one sheet as a cell range. `sheet: None` means
/// the first sheet in the workbook.
pub(crate) fn open_range(path: &Path, sheet: Option<&str>) -> Result<Range<Data>, ImportError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ImportError::Open {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(wanted) => {
            if !sheet_names.iter().any(|s| s == wanted) {
                return Err(ImportError::MissingSheet {
                    path: path.to_path_buf(),
                    sheet: wanted.to_string(),
                });
            }
            wanted.to_string()
        }
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::Malformed {
                path: path.to_path_buf(),
                reason: "workbook has no sheets".to_string(),
            })?,
    };

    workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::Malformed {
            path: path.to_path_buf(),
            reason: format!("cannot read sheet '{}': {}", sheet_name, e),
        })
}

// ============================================================================
// ATTENDANCE IMPORTER (Tour of Duty)
// ============================================================================

/// Reads the duty-roster export: separate last/first-name columns plus a
/// shift-hours column, grouped by member, scored as Tour of Duty.
pub struct AttendanceImporter;

impl AttendanceImporter {
    pub const COL_LAST_NAME: &'static str = "Last name";
    pub const COL_FIRST_NAME: &'static str = "First name";
    pub const COL_SHIFT_HOURS: &'static str = "Shift hours";

    pub fn new() -> Self {
        AttendanceImporter
    }
}

impl Default for AttendanceImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceImporter for AttendanceImporter {
    fn import(
        &self,
        path: &Path,
        config: &EngineConfig,
        names: &NameNormalizer,
    ) -> Result<SourceImport, ImportError> {
        let range = open_range(path, None)?;
        let start_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);

        // Header sits at the first row past the configured skip count.
        let mut header: Option<(usize, usize, usize)> = None;
        let mut hours_per_member: BTreeMap<MemberKey, f64> = BTreeMap::new();
        let mut rows_read = 0;

        for (i, row) in range.rows().enumerate() {
            let abs_row = start_row + i;
            if abs_row < config.attendance_rows_to_skip {
                continue;
            }

            match header {
                None => {
                    let find = |wanted: &str| {
                        row.iter()
                            .position(|cell| cell_text(Some(cell)).as_deref() == Some(wanted))
                    };
                    let last_idx = find(Self::COL_LAST_NAME).ok_or_else(|| {
                        ImportError::MissingColumn {
                            path: path.to_path_buf(),
                            column: Self::COL_LAST_NAME.to_string(),
                        }
                    })?;
                    let first_idx = find(Self::COL_FIRST_NAME).ok_or_else(|| {
                        ImportError::MissingColumn {
                            path: path.to_path_buf(),
                            column: Self::COL_FIRST_NAME.to_string(),
                        }
                    })?;
                    let hours_idx = find(Self::COL_SHIFT_HOURS).ok_or_else(|| {
                        ImportError::MissingColumn {
                            path: path.to_path_buf(),
                            column: Self::COL_SHIFT_HOURS.to_string(),
                        }
                    })?;
                    header = Some((last_idx, first_idx, hours_idx));
                }
                Some((last_idx, first_idx, hours_idx)) => {
                    // Rows at/past the end bound are the export's footer
                    if abs_row >= config.attendance_rows_end {
                        break;
                    }

                    let last = cell_text(row.get(last_idx));
                    let first = cell_text(row.get(first_idx));
                    let (last, first) = match (last, first) {
                        (Some(l), Some(f)) => (l, f),
                        (Some(l), None) => (l, String::new()),
                        // No surname: blank spacer row, skip it
                        (None, _) => continue,
                    };

                    // Missing hours default to 0, not an error
                    let hours = cell_number(row.get(hours_idx)).unwrap_or(0.0);
                    let key = names.normalize(&format!("{}, {}", last, first));
                    *hours_per_member.entry(key).or_insert(0.0) += hours;
                    rows_read += 1;
                }
            }
        }

        if header.is_none() {
            return Err(ImportError::Malformed {
                path: path.to_path_buf(),
                reason: format!(
                    "no header row found after skipping {} rows",
                    config.attendance_rows_to_skip
                ),
            });
        }

        let members = hours_per_member.len();
        let updates = hours_per_member
            .into_iter()
            .map(|(key, hours)| {
                MemberUpdate::new(key).set(
                    Category::TourOfDuty,
                    scoring::tour_of_duty_points(hours, &config.caps),
                )
            })
            .collect();

        log::info!(
            "attendance import: {} rows, {} members from {}",
            rows_read,
            members,
            path.display()
        );

        Ok(SourceImport {
            updates,
            report: ImportReport {
                source: SourceType::Attendance,
                rows_read,
                members,
                imported_at: Utc::now(),
            },
        })
    }

    fn source_type(&self) -> SourceType {
        SourceType::Attendance
    }
}

// ============================================================================
// RESPONSE LOG IMPORTER (Calls Responded To)
// ============================================================================

/// Reads the incident-response log: one row per incident with a combined
/// full-name column. Rows are counted per member and scored as half a point
/// per call.
pub struct ResponseLogImporter;

impl ResponseLogImporter {
    pub const COL_FULL_NAME: &'static str = "Incident Crew Member Full Name";

    pub fn new() -> Self {
        ResponseLogImporter
    }
}

impl Default for ResponseLogImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceImporter for ResponseLogImporter {
    fn import(
        &self,
        path: &Path,
        config: &EngineConfig,
        names: &NameNormalizer,
    ) -> Result<SourceImport, ImportError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| ImportError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let headers = reader.headers().map_err(|e| ImportError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let name_idx = headers
            .iter()
            .position(|h| h.trim() == Self::COL_FULL_NAME)
            .ok_or_else(|| ImportError::MissingColumn {
                path: path.to_path_buf(),
                column: Self::COL_FULL_NAME.to_string(),
            })?;

        let mut calls_per_member: BTreeMap<MemberKey, f64> = BTreeMap::new();
        let mut rows_read = 0;

        for record in reader.records() {
            let record = record.map_err(|e| ImportError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

            let raw = record.get(name_idx).unwrap_or("");
            let cleaned = NameNormalizer::collapse_spaces(raw);
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                continue;
            }

            let key = names.normalize(cleaned);
            *calls_per_member.entry(key).or_insert(0.0) += 1.0;
            rows_read += 1;
        }

        let members = calls_per_member.len();
        let updates = calls_per_member
            .into_iter()
            .map(|(key, count)| {
                MemberUpdate::new(key).set(
                    Category::CallsRespondedTo,
                    scoring::calls_responded_points(count, &config.caps),
                )
            })
            .collect();

        log::info!(
            "response log import: {} rows, {} members from {}",
            rows_read,
            members,
            path.display()
        );

        Ok(SourceImport {
            updates,
            report: ImportReport {
                source: SourceType::ResponseLog,
                rows_read,
                members,
                imported_at: Utc::now(),
            },
        })
    }

    fn source_type(&self) -> SourceType {
        SourceType::ResponseLog
    }
}

// ============================================================================
// TESTS
// ============================================================================
