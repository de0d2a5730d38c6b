// 📋 Self-Report Importer - one spreadsheet per member, all in one directory
// The only long-running operation: reports progress per file and honors
// cooperative cancellation at file boundaries. A cancelled run returns the
// partial batch accumulated so far, not an error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::ledger::{Category, MemberKey, MemberUpdate};
use crate::names::NameNormalizer;
use crate::parser::{
    cell_number, cell_text, open_range, ImportError, ImportReport, SourceImport, SourceImporter,
    SourceType,
};
use crate::scoring;

// ============================================================================
// ACTIVITY BUCKETS
// ============================================================================

/// The activity labels the self-report sheets use. Rows with any other label
/// (or no label) are discarded.
pub const ACTIVITY_MEETINGS: &str = "Meetings";
pub const ACTIVITY_DRILLS: &str = "Drills, CMEs";
pub const ACTIVITY_TRAINING: &str = "Training Course";
pub const ACTIVITY_MISC: &str = "Miscellaneous";
pub const ACTIVITY_DISABILITY: &str = "Disability";

// ============================================================================
// CANCELLATION & PROGRESS
// ============================================================================

/// Cooperative cancellation flag, checked between files. Clone it to the
/// thread/UI that wants to cancel; in-flight per-file parsing is never
/// interrupted mid-file.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One progress notification, emitted after each file is handled.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Files handled so far (processed or skipped).
    pub processed: usize,
    /// Files matched in the directory.
    pub total: usize,
    /// File just handled.
    pub file: String,
}

// ============================================================================
// BATCH RESULT
// ============================================================================

/// A file that failed to parse. One bad file never aborts the batch; it is
/// recorded here and the rest of the directory is still imported.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelfReportReport {
    /// Spreadsheet files matched in the directory.
    pub files_found: usize,
    /// Files parsed successfully.
    pub files_processed: usize,
    /// Itemized activity rows read across all files.
    pub activity_rows: usize,
    /// Files that failed to parse, with reasons.
    pub skipped: Vec<SkippedFile>,
    /// Distinct members produced.
    pub members: usize,
    /// True when the run stopped early at a file boundary.
    pub cancelled: bool,
    pub imported_at: DateTime<Utc>,
}

impl SelfReportReport {
    pub fn summary(&self) -> String {
        let mut s = format!(
            "Member Self-Reports: {}/{} files processed, {} members scored",
            self.files_processed, self.files_found, self.members
        );
        if !self.skipped.is_empty() {
            s.push_str(&format!(", {} skipped", self.skipped.len()));
        }
        if self.cancelled {
            s.push_str(" (cancelled, partial result)");
        }
        s
    }
}

#[derive(Debug, Clone)]
pub struct SelfReportBatch {
    pub updates: Vec<MemberUpdate>,
    pub report: SelfReportReport,
}

// ============================================================================
// PER-FILE / PER-MEMBER INTERMEDIATES
// ============================================================================

/// Everything extracted from one member spreadsheet before scoring.
struct FileSheet {
    key: MemberKey,
    signup_hours: f64,
    call_count: f64,
    /// (activity label, hours, points)
    rows: Vec<(String, f64, f64)>,
}

/// Raw measurements accumulated per member across the batch. A member who
/// appears in more than one file has their measurements summed here before
/// scoring.
#[derive(Debug, Default)]
struct MemberTally {
    meetings: usize,
    training_hours: f64,
    drill_points: f64,
    misc_points: f64,
    disability_points: f64,
    signup_hours: f64,
    call_count: f64,
}

// ============================================================================
// IMPORTER
// ============================================================================

pub struct SelfReportImporter;

impl SelfReportImporter {
    pub fn new() -> Self {
        SelfReportImporter
    }

    /// Import every member spreadsheet in `dir`.
    ///
    /// `on_progress` fires once per file handled. `cancel` is checked before
    /// each file; cancelling yields whatever was accumulated so far.
    pub fn import_dir(
        &self,
        dir: &Path,
        config: &EngineConfig,
        names: &NameNormalizer,
        mut on_progress: impl FnMut(&ProgressUpdate),
        cancel: &CancelToken,
    ) -> Result<SelfReportBatch, ImportError> {
        let mut files = Vec::new();
        let entries = std::fs::read_dir(dir).map_err(|e| ImportError::Open {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| ImportError::Open {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
            let path = entry.path();
            if is_member_spreadsheet(&path) {
                files.push(path);
            }
        }
        // Deterministic order regardless of directory listing order
        files.sort();

        let total = files.len();
        let mut tallies: BTreeMap<MemberKey, MemberTally> = BTreeMap::new();
        let mut skipped = Vec::new();
        let mut files_processed = 0;
        let mut activity_rows = 0;
        let mut cancelled = false;

        for (i, path) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            match read_member_file(path, config, names) {
                Ok(sheet) => {
                    let tally = tallies.entry(sheet.key.clone()).or_default();
                    tally.signup_hours += sheet.signup_hours;
                    tally.call_count += sheet.call_count;
                    for (activity, hours, points) in &sheet.rows {
                        match activity.as_str() {
                            ACTIVITY_MEETINGS => tally.meetings += 1,
                            ACTIVITY_TRAINING => tally.training_hours += hours,
                            ACTIVITY_DRILLS => tally.drill_points += points,
                            ACTIVITY_MISC => tally.misc_points += points,
                            ACTIVITY_DISABILITY => tally.disability_points += points,
                            other => {
                                // Not one of the five buckets: discard the row
                                log::debug!(
                                    "{}: discarding row with activity '{}'",
                                    path.display(),
                                    other
                                );
                                continue;
                            }
                        }
                        activity_rows += 1;
                    }
                    files_processed += 1;
                }
                Err(e) => {
                    log::warn!("skipping {}: {}", path.display(), e);
                    skipped.push(SkippedFile {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            on_progress(&ProgressUpdate {
                processed: i + 1,
                total,
                file: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            });
        }

        let members = tallies.len();
        let updates = tallies
            .into_iter()
            .map(|(key, t)| {
                MemberUpdate::new(key)
                    .set(Category::Meetings, scoring::meeting_points(t.meetings))
                    .set(
                        Category::Training,
                        scoring::training_points(t.training_hours, &config.caps),
                    )
                    .set(Category::Drills, scoring::drill_points(t.drill_points))
                    .set(
                        Category::MiscActivity,
                        scoring::misc_activity_points(t.misc_points),
                    )
                    .set(
                        Category::Disability,
                        scoring::disability_points(t.disability_points),
                    )
                    .set(
                        Category::SelfReportedTotal,
                        scoring::self_reported_total(t.signup_hours, t.call_count),
                    )
            })
            .collect();

        log::info!(
            "self-report import: {}/{} files, {} members, {} skipped{}",
            files_processed,
            total,
            members,
            skipped.len(),
            if cancelled { " (cancelled)" } else { "" }
        );

        Ok(SelfReportBatch {
            updates,
            report: SelfReportReport {
                files_found: total,
                files_processed,
                activity_rows,
                skipped,
                members,
                cancelled,
                imported_at: Utc::now(),
            },
        })
    }
}

impl Default for SelfReportImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceImporter for SelfReportImporter {
    /// Trait adapter: run the directory import without progress reporting or
    /// cancellation. The richer batch API is `import_dir`.
    fn import(
        &self,
        path: &Path,
        config: &EngineConfig,
        names: &NameNormalizer,
    ) -> Result<SourceImport, ImportError> {
        let batch = self.import_dir(path, config, names, |_| {}, &CancelToken::new())?;
        Ok(SourceImport {
            updates: batch.updates,
            report: ImportReport {
                source: SourceType::SelfReport,
                rows_read: batch.report.activity_rows,
                members: batch.report.members,
                imported_at: batch.report.imported_at,
            },
        })
    }

    fn source_type(&self) -> SourceType {
        SourceType::SelfReport
    }
}

// ============================================================================
// FILE PARSING
// ============================================================================

/// Member spreadsheets are `.xlsx`; names starting with `~` are Office
/// temp/backup files and are never imported.
fn is_member_spreadsheet(path: &Path) -> bool {
    let is_xlsx = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);
    let is_backup = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('~'))
        .unwrap_or(true);
    is_xlsx && !is_backup
}

fn read_member_file(
    path: &Path,
    config: &EngineConfig,
    names: &NameNormalizer,
) -> Result<FileSheet, ImportError> {
    let range = open_range(path, Some(&config.self_report_sheet))?;

    // Fixed cells: member name plus the two self-reported totals
    let name_cell = range.get_value((config.name_cell.row, config.name_cell.col));
    let name = cell_text(name_cell).ok_or_else(|| ImportError::Malformed {
        path: path.to_path_buf(),
        reason: format!("member name cell {} is empty", config.name_cell),
    })?;
    let key = names.normalize(&name);

    // Missing self-reported numbers default to 0, not an error
    let signup_hours = cell_number(range.get_value((
        config.signup_hours_cell.row,
        config.signup_hours_cell.col,
    )))
    .unwrap_or(0.0);
    let call_count = cell_number(range.get_value((
        config.call_hours_cell.row,
        config.call_hours_cell.col,
    )))
    .unwrap_or(0.0);

    // Itemized activity table: header after the configured skip count
    let start_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    let mut header: Option<(usize, usize, usize)> = None;
    let mut rows = Vec::new();

    for (i, row) in range.rows().enumerate() {
        let abs_row = start_row + i;
        if abs_row < config.self_report_rows_to_skip {
            continue;
        }

        match header {
            None => {
                let find = |wanted: &str| {
                    row.iter().position(|cell| {
                        cell_text(Some(cell))
                            .map(|t| canonical_header(&t) == Some(wanted))
                            .unwrap_or(false)
                    })
                };
                let activity_idx =
                    find("Activity").ok_or_else(|| ImportError::MissingColumn {
                        path: path.to_path_buf(),
                        column: "Activity".to_string(),
                    })?;
                let hours_idx = find("Hours").ok_or_else(|| ImportError::MissingColumn {
                    path: path.to_path_buf(),
                    column: "Hours".to_string(),
                })?;
                let points_idx = find("Points").ok_or_else(|| ImportError::MissingColumn {
                    path: path.to_path_buf(),
                    column: "Points".to_string(),
                })?;
                header = Some((activity_idx, hours_idx, points_idx));
            }
            Some((activity_idx, hours_idx, points_idx)) => {
                // Undefined Activity: discard the row
                let activity = match cell_text(row.get(activity_idx)) {
                    Some(a) => a,
                    None => continue,
                };
                // Some members leave Hours blank; assume the event lasted 1 hour
                let hours = cell_number(row.get(hours_idx)).unwrap_or(1.0);
                let points = cell_number(row.get(points_idx)).unwrap_or(0.0);
                rows.push((activity, hours, points));
            }
        }
    }

    if header.is_none() {
        return Err(ImportError::Malformed {
            path: path.to_path_buf(),
            reason: format!(
                "no activity table header found after skipping {} rows",
                config.self_report_rows_to_skip
            ),
        });
    }

    Ok(FileSheet {
        key,
        signup_hours,
        call_count,
        rows,
    })
}

/// Map a raw header cell to its canonical column name. The distributed
/// spreadsheet uses multi-line headings like "Activity \n(not hours & calls)"
/// and "time spent \n(in hours)".
fn canonical_header(raw: &str) -> Option<&'static str> {
    let flat = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let flat = flat.to_lowercase();

    if flat.starts_with("activity") && !flat.contains("code") {
        Some("Activity")
    } else if flat == "hours" || flat.contains("time spent") {
        Some("Hours")
    } else if flat == "points" {
        Some("Points")
    } else {
        None
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    /// Build one member spreadsheet in the distributed layout: title rows,
    /// name at D4, self-reported totals at E7/E8, activity table header at
    /// row 10 (1-based), data below.
    fn write_member_file(
        dir: &Path,
        file_name: &str,
        member: &str,
        signup_hours: Option<f64>,
        call_count: Option<f64>,
        rows: &[(&str, Option<f64>, Option<f64>)],
    ) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("point tracker").unwrap();

        sheet.write_string(0, 0, "LOSAP Point Tracker").unwrap();
        sheet.write_string(3, 2, "Name:").unwrap();
        sheet.write_string(3, 3, member).unwrap(); // D4
        sheet.write_string(6, 0, "Self-reported signup hours").unwrap();
        if let Some(h) = signup_hours {
            sheet.write_number(6, 4, h).unwrap(); // E7
        }
        sheet.write_string(7, 0, "Self-reported calls").unwrap();
        if let Some(c) = call_count {
            sheet.write_number(7, 4, c).unwrap(); // E8
        }

        // Header row (absolute row 9) with the real export's headings
        sheet.write_string(9, 0, "Date").unwrap();
        sheet
            .write_string(9, 1, "Activity \n(not hours & calls)")
            .unwrap();
        sheet.write_string(9, 2, "time spent \n(in hours)").unwrap();
        sheet.write_string(9, 3, "Points").unwrap();
        sheet.write_string(9, 4, "Description").unwrap();
        sheet.write_string(9, 5, "Notes/Questions").unwrap();
        sheet.write_string(9, 6, "Activity code").unwrap();

        for (i, (activity, hours, points)) in rows.iter().enumerate() {
            let row = 10 + i as u32;
            sheet.write_string(row, 0, "2024-03-01").unwrap();
            sheet.write_string(row, 1, *activity).unwrap();
            if let Some(h) = hours {
                sheet.write_number(row, 2, *h).unwrap();
            }
            if let Some(p) = points {
                sheet.write_number(row, 3, *p).unwrap();
            }
        }

        workbook.save(dir.join(file_name)).unwrap();
    }

    fn import(dir: &Path) -> SelfReportBatch {
        SelfReportImporter::new()
            .import_dir(
                dir,
                &EngineConfig::default(),
                &NameNormalizer::new(),
                |_| {},
                &CancelToken::new(),
            )
            .unwrap()
    }

    fn find<'a>(batch: &'a SelfReportBatch, key: &str) -> &'a MemberUpdate {
        batch
            .updates
            .iter()
            .find(|u| u.key.as_str() == key)
            .unwrap()
    }

    fn value(update: &MemberUpdate, category: Category) -> f64 {
        update
            .values
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, v)| *v)
            .unwrap()
    }

    #[test]
    fn test_activity_rows_bucket_and_score() {
        let dir = TempDir::new().unwrap();
        write_member_file(
            dir.path(),
            "doe_jane.xlsx",
            "Doe, Jane",
            None,
            None,
            &[
                ("Meetings", Some(1.0), None),
                ("Meetings", Some(2.0), None),
                ("Meetings", Some(1.0), None),
                ("Training Course", Some(4.0), None),
                ("Training Course", Some(2.5), None),
                ("Drills, CMEs", Some(2.0), Some(1.0)),
                ("Drills, CMEs", Some(5.0), Some(2.0)),
                ("Miscellaneous", Some(1.0), Some(0.5)),
                ("Disability", None, Some(4.0)),
            ],
        );

        let batch = import(dir.path());
        assert_eq!(batch.report.files_processed, 1);

        let jane = find(&batch, "Doe, Jane");
        assert_eq!(value(jane, Category::Meetings), 3.0);
        assert_eq!(value(jane, Category::Training), 6.5);
        assert_eq!(value(jane, Category::Drills), 3.0);
        assert_eq!(value(jane, Category::MiscActivity), 0.5);
        assert_eq!(value(jane, Category::Disability), 4.0);
    }

    #[test]
    fn test_disability_clamped_across_rows() {
        let dir = TempDir::new().unwrap();
        write_member_file(
            dir.path(),
            "doe_jane.xlsx",
            "Doe, Jane",
            None,
            None,
            &[
                ("Disability", None, Some(4.0)),
                ("Disability", None, Some(3.5)),
            ],
        );

        let batch = import(dir.path());
        // 7.5 raw points clipped to 5.0
        assert_eq!(value(find(&batch, "Doe, Jane"), Category::Disability), 5.0);
    }

    #[test]
    fn test_unknown_activity_rows_are_discarded() {
        let dir = TempDir::new().unwrap();
        write_member_file(
            dir.path(),
            "doe_jane.xlsx",
            "Doe, Jane",
            None,
            None,
            &[
                ("Meetings", Some(1.0), None),
                ("Bake Sale", Some(3.0), Some(9.0)),
            ],
        );

        let batch = import(dir.path());
        let jane = find(&batch, "Doe, Jane");
        assert_eq!(value(jane, Category::Meetings), 1.0);
        assert_eq!(value(jane, Category::MiscActivity), 0.0);
        assert_eq!(batch.report.activity_rows, 1);
    }

    #[test]
    fn test_missing_hours_defaults_to_one() {
        let dir = TempDir::new().unwrap();
        write_member_file(
            dir.path(),
            "doe_jane.xlsx",
            "Doe, Jane",
            None,
            None,
            &[("Training Course", None, None)],
        );

        let batch = import(dir.path());
        assert_eq!(value(find(&batch, "Doe, Jane"), Category::Training), 1.0);
    }

    #[test]
    fn test_self_reported_totals_from_fixed_cells() {
        let dir = TempDir::new().unwrap();
        // 24 h signup → 2.0 points, 5 calls → 2.5 points
        write_member_file(
            dir.path(),
            "doe_jane.xlsx",
            "Jane Doe",
            Some(24.0),
            Some(5.0),
            &[],
        );

        let batch = import(dir.path());
        // Name cell is in "First Last" form; key still normalizes
        let jane = find(&batch, "Doe, Jane");
        assert_eq!(value(jane, Category::SelfReportedTotal), 4.5);
        assert_eq!(value(jane, Category::Meetings), 0.0);
    }

    #[test]
    fn test_member_in_two_files_sums_before_scoring() {
        let dir = TempDir::new().unwrap();
        write_member_file(
            dir.path(),
            "a.xlsx",
            "Doe, Jane",
            Some(12.0),
            None,
            &[("Meetings", Some(1.0), None)],
        );
        write_member_file(
            dir.path(),
            "b.xlsx",
            "Doe, Jane",
            Some(12.0),
            None,
            &[("Meetings", Some(1.0), None)],
        );

        let batch = import(dir.path());
        assert_eq!(batch.report.members, 1);
        let jane = find(&batch, "Doe, Jane");
        assert_eq!(value(jane, Category::Meetings), 2.0);
        // 24 h combined signup → 2.0
        assert_eq!(value(jane, Category::SelfReportedTotal), 2.0);
    }

    #[test]
    fn test_backup_and_non_xlsx_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        write_member_file(dir.path(), "doe_jane.xlsx", "Doe, Jane", None, None, &[]);
        write_member_file(dir.path(), "~$doe_jane.xlsx", "Ghost, Temp", None, None, &[]);
        std::fs::write(dir.path().join("notes.txt"), "not a spreadsheet").unwrap();

        let batch = import(dir.path());
        assert_eq!(batch.report.files_found, 1);
        assert_eq!(batch.report.members, 1);
    }

    #[test]
    fn test_bad_file_is_skipped_and_batch_continues() {
        let dir = TempDir::new().unwrap();
        write_member_file(dir.path(), "good.xlsx", "Doe, Jane", None, None, &[]);
        std::fs::write(dir.path().join("broken.xlsx"), "this is not a zip").unwrap();

        let batch = import(dir.path());
        assert_eq!(batch.report.files_found, 2);
        assert_eq!(batch.report.files_processed, 1);
        assert_eq!(batch.report.skipped.len(), 1);
        assert!(batch.report.skipped[0]
            .path
            .to_string_lossy()
            .ends_with("broken.xlsx"));
        assert_eq!(batch.report.members, 1);
    }

    #[test]
    fn test_wrong_sheet_name_is_skipped_with_reason() {
        let dir = TempDir::new().unwrap();
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("wrong name").unwrap();
        sheet.write_string(0, 0, "x").unwrap();
        workbook.save(dir.path().join("odd.xlsx")).unwrap();

        let batch = import(dir.path());
        assert_eq!(batch.report.files_processed, 0);
        assert_eq!(batch.report.skipped.len(), 1);
        assert!(batch.report.skipped[0].reason.contains("point tracker"));
    }

    #[test]
    fn test_cancellation_returns_partial_batch() {
        let dir = TempDir::new().unwrap();
        write_member_file(dir.path(), "a.xlsx", "Doe, Jane", None, None, &[]);
        write_member_file(dir.path(), "b.xlsx", "Roe, Richard", None, None, &[]);

        let cancel = CancelToken::new();
        let mut progressed = 0;
        let batch = SelfReportImporter::new()
            .import_dir(
                dir.path(),
                &EngineConfig::default(),
                &NameNormalizer::new(),
                |update| {
                    progressed = update.processed;
                    // Cancel after the first file; takes effect at the boundary
                    cancel.cancel();
                },
                &cancel,
            )
            .unwrap();

        assert_eq!(progressed, 1);
        assert!(batch.report.cancelled);
        assert_eq!(batch.report.files_processed, 1);
        // Partial result, not an error: the first file's member is present
        assert_eq!(batch.report.members, 1);
        assert_eq!(batch.updates[0].key.as_str(), "Doe, Jane");
    }

    #[test]
    fn test_progress_reports_every_file() {
        let dir = TempDir::new().unwrap();
        write_member_file(dir.path(), "a.xlsx", "Doe, Jane", None, None, &[]);
        write_member_file(dir.path(), "b.xlsx", "Roe, Richard", None, None, &[]);

        let mut seen = Vec::new();
        SelfReportImporter::new()
            .import_dir(
                dir.path(),
                &EngineConfig::default(),
                &NameNormalizer::new(),
                |update| seen.push((update.processed, update.total)),
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(seen, vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn test_missing_directory_is_an_open_error() {
        let err = SelfReportImporter::new()
            .import_dir(
                Path::new("/nonexistent/reports"),
                &EngineConfig::default(),
                &NameNormalizer::new(),
                |_| {},
                &CancelToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ImportError::Open { .. }));
    }
}
