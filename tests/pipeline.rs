// End-to-end pipeline: build real source exports on disk, run every
// importer, merge into one ledger, export, and read the workbook back.

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use losap_points::{
    write_xlsx, AttendanceImporter, CancelToken, EngineConfig, Ledger, MemberKey,
    NameNormalizer, ResponseLogImporter, SelfReportImporter, SourceImporter, LEDGER_COLUMNS,
};

fn write_attendance(dir: &Path, rows: &[(&str, &str, f64)]) -> PathBuf {
    let path = dir.join("iar_export.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "I Am Responding - Duty Roster").unwrap();
    sheet.write_string(1, 0, "Exported 2024-12-31").unwrap();
    sheet.write_string(2, 0, "Last name").unwrap();
    sheet.write_string(2, 1, "First name").unwrap();
    sheet.write_string(2, 2, "Shift hours").unwrap();
    for (i, (last, first, hours)) in rows.iter().enumerate() {
        let row = 3 + i as u32;
        sheet.write_string(row, 0, *last).unwrap();
        sheet.write_string(row, 1, *first).unwrap();
        sheet.write_number(row, 2, *hours).unwrap();
    }
    workbook.save(&path).unwrap();
    path
}

fn write_response_log(dir: &Path, names: &[&str]) -> PathBuf {
    let path = dir.join("epcr_export.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "Incident Number,Incident Crew Member Full Name,Disposition").unwrap();
    for (i, name) in names.iter().enumerate() {
        writeln!(file, "{},{},Transported", 2000 + i, name).unwrap();
    }
    path
}

fn write_self_report(dir: &Path, file_name: &str, member: &str, rows: &[(&str, f64)]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("point tracker").unwrap();
    sheet.write_string(0, 0, "LOSAP Point Tracker").unwrap();
    sheet.write_string(3, 3, member).unwrap(); // D4
    sheet.write_string(9, 0, "Date").unwrap();
    sheet
        .write_string(9, 1, "Activity \n(not hours & calls)")
        .unwrap();
    sheet.write_string(9, 2, "time spent \n(in hours)").unwrap();
    sheet.write_string(9, 3, "Points").unwrap();
    for (i, (activity, hours)) in rows.iter().enumerate() {
        let row = 10 + i as u32;
        sheet.write_string(row, 1, *activity).unwrap();
        sheet.write_number(row, 2, *hours).unwrap();
    }
    workbook.save(dir.join(file_name)).unwrap();
}

#[test]
fn attendance_then_self_reports_merge_into_one_record() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default();
    let names = NameNormalizer::with_corrections(config.name_corrections.clone());
    let mut ledger = Ledger::new();

    // Two roster rows for the same member: 24 h + 12 h → Tour of Duty 3.00
    let attendance = write_attendance(dir.path(), &[("Doe", "Jane", 24.0), ("Doe", "Jane", 12.0)]);
    let import = AttendanceImporter::new()
        .import(&attendance, &config, &names)
        .unwrap();
    ledger.apply(&import.updates);

    // Three one-hour Meetings rows → Meetings 3
    let reports = dir.path().join("self_reports");
    std::fs::create_dir(&reports).unwrap();
    write_self_report(
        &reports,
        "doe_jane.xlsx",
        "Doe, Jane",
        &[("Meetings", 1.0), ("Meetings", 1.0), ("Meetings", 1.0)],
    );
    let batch = SelfReportImporter::new()
        .import_dir(&reports, &config, &names, |_| {}, &CancelToken::new())
        .unwrap();
    ledger.apply(&batch.updates);

    assert_eq!(ledger.len(), 1);
    let jane = ledger.get(&MemberKey::from("Doe, Jane")).unwrap();
    assert_eq!(jane.tour_of_duty, 3.0);
    assert_eq!(jane.meetings, 3.0);
    assert_eq!(jane.total, 6.0);
    // Every other category defaulted to zero
    assert_eq!(jane.training, 0.0);
    assert_eq!(jane.calls_responded_to, 0.0);
    assert_eq!(jane.position_held, 0.0);
    assert_eq!(jane.self_reported_total, 0.0);
}

#[test]
fn three_sources_union_and_survive_reimport() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default();
    let names = NameNormalizer::with_corrections(config.name_corrections.clone());
    let mut ledger = Ledger::new();

    let attendance = write_attendance(
        dir.path(),
        &[("Doe", "Jane", 24.0), ("Smith", "Jon", 12.0)],
    );
    let responses = write_response_log(dir.path(), &["Jane Doe", "Jane Doe", "Richard Roe"]);
    let reports = dir.path().join("self_reports");
    std::fs::create_dir(&reports).unwrap();
    write_self_report(&reports, "roe.xlsx", "Richard Roe", &[("Training Course", 4.0)]);

    let att = AttendanceImporter::new()
        .import(&attendance, &config, &names)
        .unwrap();
    ledger.apply(&att.updates);
    let resp = ResponseLogImporter::new()
        .import(&responses, &config, &names)
        .unwrap();
    ledger.apply(&resp.updates);
    let batch = SelfReportImporter::new()
        .import_dir(&reports, &config, &names, |_| {}, &CancelToken::new())
        .unwrap();
    ledger.apply(&batch.updates);

    // Union of all members across sources; the roster's misspelling was
    // corrected, so "Smith, Jon" and "Smith, John" are one member
    let members: Vec<&str> = ledger.member_keys().map(|k| k.as_str()).collect();
    assert_eq!(members, vec!["Doe, Jane", "Roe, Richard", "Smith, John"]);

    let jane = ledger.get(&MemberKey::from("Doe, Jane")).unwrap();
    assert_eq!(jane.tour_of_duty, 2.0);
    assert_eq!(jane.calls_responded_to, 1.0);
    assert_eq!(jane.total, 3.0);

    let roe = ledger.get(&MemberKey::from("Roe, Richard")).unwrap();
    assert_eq!(roe.calls_responded_to, 0.5);
    assert_eq!(roe.training, 4.0);
    assert_eq!(roe.total, 4.5);

    // Re-running the attendance import changes nothing
    let snapshot: Vec<_> = ledger.records().cloned().collect();
    let again = AttendanceImporter::new()
        .import(&attendance, &config, &names)
        .unwrap();
    ledger.apply(&again.updates);
    let after: Vec<_> = ledger.records().cloned().collect();
    assert_eq!(snapshot, after);
}

#[test]
fn exported_workbook_round_trips_the_ledger() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default();
    let names = NameNormalizer::new();
    let mut ledger = Ledger::new();

    let attendance = write_attendance(dir.path(), &[("Doe", "Jane", 36.0)]);
    let import = AttendanceImporter::new()
        .import(&attendance, &config, &names)
        .unwrap();
    ledger.apply(&import.updates);

    let out = dir.path().join("2024 Points Record.xlsx");
    write_xlsx(&ledger, &out, &config.output_sheet_name).unwrap();

    let mut workbook = open_workbook_auto(&out).unwrap();
    let range = workbook.worksheet_range("Points Summary").unwrap();

    let header: Vec<String> = (0..LEDGER_COLUMNS.len() as u32)
        .map(|c| match range.get_value((0, c)) {
            Some(Data::String(s)) => s.clone(),
            other => panic!("unexpected header cell: {:?}", other),
        })
        .collect();
    assert_eq!(header, LEDGER_COLUMNS.to_vec());

    assert_eq!(
        range.get_value((1, 0)),
        Some(&Data::String("Doe, Jane".to_string()))
    );
    // Tour of Duty and Total columns carry 36 / 12 = 3.0
    assert_eq!(range.get_value((1, 4)), Some(&Data::Float(3.0)));
    assert_eq!(range.get_value((1, 9)), Some(&Data::Float(3.0)));
}

#[test]
fn clear_starts_a_fresh_session() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default();
    let names = NameNormalizer::new();
    let mut ledger = Ledger::new();

    let responses = write_response_log(dir.path(), &["Jane Doe"]);
    let import = ResponseLogImporter::new()
        .import(&responses, &config, &names)
        .unwrap();
    ledger.apply(&import.updates);
    assert_eq!(ledger.len(), 1);

    ledger.clear();
    assert!(ledger.is_empty());

    // Importing again after clear behaves exactly like a first import
    let import = ResponseLogImporter::new()
        .import(&responses, &config, &names)
        .unwrap();
    ledger.apply(&import.updates);
    let jane = ledger.get(&MemberKey::from("Doe, Jane")).unwrap();
    assert_eq!(jane.calls_responded_to, 0.5);
    assert_eq!(jane.total, 0.5);
}
