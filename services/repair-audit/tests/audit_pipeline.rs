//! End-to-end runs over generated workbook and CSV exports.

use std::path::Path;

use audit_core::{AuditConfig, ReportFormat};
use pretty_assertions::assert_eq;
use repair_audit::{load_transactions, AuditPipeline, IngestError, PipelineError};
use rust_xlsxwriter::Workbook;

const HEADER: [&str; 3] = ["Repair Number", "Material", "Movement Code"];

fn write_xlsx(path: &Path, sheets: &[(&str, &[(&str, i64)])]) {
    let mut wb = Workbook::new();
    for (name, rows) in sheets {
        let ws = wb.add_worksheet();
        ws.set_name(*name).unwrap();
        for (col, h) in HEADER.iter().enumerate() { ws.write_string(0, col as u16, *h).unwrap(); }
        for (i, (repair, code)) in rows.iter().enumerate() {
            let r = i as u32 + 1;
            ws.write_string(r, 0, *repair).unwrap();
            ws.write_string(r, 1, "MAT-1").unwrap();
            ws.write_number(r, 2, *code as f64).unwrap();
        }
    }
    wb.save(path).unwrap();
}

const EXPORT: &[(&str, i64)] = &[
    ("R100001", 251), ("R100001", 161), ("R100001", 252),
    ("R100024", 251), ("R100024", 161),
    ("R100058", 251), ("R100058", 251), ("R100058", 161), ("R100058", 252),
    ("R100100", 252), ("R100100", 161), ("R100100", 251),
    ("R100327", 251), ("R100327", 161), ("R100327", 999),
];

#[test]
fn workbook_audit_flags_known_repairs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("synthetic_sap_data.xlsx");
    write_xlsx(&input, &[("Sheet1", EXPORT)]);
    let output = dir.path().join("reports/flagged_repairs_detailed.txt");

    let cfg = AuditConfig { output_path: output.clone(), ..Default::default() };
    let outcome = AuditPipeline::new(cfg).run(&input).unwrap();
    assert_eq!(outcome.rows, EXPORT.len());
    assert_eq!(outcome.repairs_analyzed, 5);
    assert_eq!(outcome.flagged, 3);
    assert_eq!(outcome.status, format!("Found 3 anomalies with details. Results written to {}", output.display()));

    let text = std::fs::read_to_string(&output).unwrap();
    let flagged: Vec<&str> = text.lines().filter_map(|l| l.strip_prefix("Repair Number: ")).collect();
    assert_eq!(flagged, vec!["R100024", "R100058", "R100327"]);
    assert!(text.contains("  Reason(s):   Total count is 2 (expected 3), Count 252 is 0 (expected 1)\n"));
    assert!(text.contains("  Reason(s):   Total count is 4 (expected 3), Count 251 is 2 (expected 1)\n"));
    assert!(text.contains("  Reason(s):   Count 252 is 0 (expected 1), Contains unexpected codes: [999]\n"));
    assert!(text.ends_with("\nTotal flagged: 3\n"));
}

#[test]
fn named_sheet_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("multi.xlsx");
    const SUMMARY: &[(&str, i64)] = &[("X1", 251)];
    const MOVEMENTS: &[(&str, i64)] = &[("R1", 251), ("R1", 161), ("R1", 252)];
    write_xlsx(&input, &[("Summary", SUMMARY), ("Movements", MOVEMENTS)]);

    let cfg = AuditConfig { sheet: Some("Movements".into()), ..Default::default() };
    let recs = load_transactions(&input, &cfg).unwrap();
    assert_eq!(recs.len(), 3);
    assert!(recs.iter().all(|r| r.repair_number == "R1"));

    let cfg = AuditConfig { sheet: Some("Nope".into()), ..Default::default() };
    assert!(matches!(load_transactions(&input, &cfg), Err(IngestError::SheetMissing(s)) if s == "Nope"));
}

#[test]
fn numeric_repair_numbers_keep_integer_form() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("numeric.xlsx");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "Repair Number").unwrap();
    ws.write_string(0, 1, "Movement Code").unwrap();
    ws.write_number(1, 0, 100024.0).unwrap();
    ws.write_number(1, 1, 251.0).unwrap();
    wb.save(&input).unwrap();

    let recs = load_transactions(&input, &AuditConfig::default()).unwrap();
    assert_eq!(recs[0].repair_number, "100024");
    assert_eq!(recs[0].movement_code, 251);
}

#[test]
fn workbook_without_required_columns_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("wrong.xlsx");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "Order").unwrap();
    ws.write_string(1, 0, "O-1").unwrap();
    wb.save(&input).unwrap();

    match load_transactions(&input, &AuditConfig::default()) {
        Err(IngestError::MissingColumns(cols)) => assert_eq!(cols, vec!["Repair Number".to_string(), "Movement Code".to_string()]),
        other => panic!("expected missing columns, got {other:?}"),
    }
}

#[test]
fn csv_export_with_custom_columns_and_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("export.csv");
    std::fs::write(&input, "Order,Mvt Type\nA-1,251\nA-1,161\nA-1,252\nB-2,251\n\nB-2,252.0\n").unwrap();
    let output = dir.path().join("flagged.json");

    let cfg = AuditConfig {
        repair_column: "Order".into(),
        movement_column: "Mvt Type".into(),
        output_path: output.clone(),
        report_format: ReportFormat::Json,
        ..Default::default()
    };
    let outcome = AuditPipeline::new(cfg).run(&input).unwrap();
    assert_eq!(outcome.rows, 5);
    assert_eq!(outcome.flagged, 1);

    let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(v["total_flagged"], 1);
    assert_eq!(v["anomalies"][0]["repair_number"], "B-2");
    assert_eq!(v["anomalies"][0]["reasons"][0], "Total count is 2 (expected 3)");
    assert_eq!(v["anomalies"][0]["reasons"][1], "Count 161 is 0 (expected 1)");
}

#[test]
fn malformed_csv_row_aborts_without_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.csv");
    std::fs::write(&input, "Repair Number,Movement Code\nR1,251\nR1,abc\n").unwrap();
    let output = dir.path().join("flagged.txt");

    let cfg = AuditConfig { output_path: output.clone(), ..Default::default() };
    match AuditPipeline::new(cfg).run(&input) {
        Err(PipelineError::Ingest(IngestError::Malformed { row, .. })) => assert_eq!(row, 3),
        other => panic!("expected malformed row, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn empty_export_writes_notice() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.csv");
    std::fs::write(&input, "Repair Number,Movement Code\n").unwrap();
    let output = dir.path().join("flagged.txt");

    let cfg = AuditConfig { output_path: output.clone(), ..Default::default() };
    let outcome = AuditPipeline::new(cfg).run(&input).unwrap();
    assert_eq!(outcome.flagged, 0);
    assert!(outcome.status.starts_with("No anomalies found."));
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "No anomalous repair numbers found based on the detailed criteria.\n"
    );
}
