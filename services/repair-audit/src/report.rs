use std::fmt::Write as _;
use std::path::Path;

use audit_core::{AnomalyRecord, ReportFormat};
use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

pub const NO_ANOMALIES_NOTICE: &str = "No anomalous repair numbers found based on the detailed criteria.";
const HEADING: &str = "Flagged Repair Numbers for Investigation (Detailed):";
const RULE_WIDTH: usize = 60;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("writing report to {path}: {source}")] Io { path: String, #[source] source: std::io::Error },
    #[error("serializing report: {0}")] Serialize(#[from] serde_json::Error),
}

pub fn render_text(anomalies: &[AnomalyRecord]) -> String {
    if anomalies.is_empty() { return format!("{NO_ANOMALIES_NOTICE}\n"); }
    let mut out = String::new();
    let _ = writeln!(out, "{HEADING}");
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    for a in anomalies {
        let codes = a.code_counts.iter().map(|(code, n)| format!("Code {code}: {n}")).join(", ");
        let _ = writeln!(out, "Repair Number: {}", a.repair_number);
        let _ = writeln!(out, "  Reason(s):   {}", a.reason_summary());
        let _ = writeln!(out, "  Codes Found: {codes}");
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    }
    let _ = writeln!(out, "\nTotal flagged: {}", anomalies.len());
    out
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    total_flagged: usize,
    anomalies: &'a [AnomalyRecord],
}

pub fn render_json(anomalies: &[AnomalyRecord]) -> Result<String, ReportError> {
    let report = JsonReport { generated_at: chrono::Utc::now().to_rfc3339(), total_flagged: anomalies.len(), anomalies };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Writes the report, creating missing parent directories, and returns a status line.
#[instrument(skip(anomalies, path), fields(flagged = anomalies.len(), path = %path.display()))]
pub fn write_report(anomalies: &[AnomalyRecord], path: &Path, format: ReportFormat) -> Result<String, ReportError> {
    let io_err = |source: std::io::Error| ReportError::Io { path: path.display().to_string(), source };
    let body = match format {
        ReportFormat::Text => render_text(anomalies),
        ReportFormat::Json => render_json(anomalies)?,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(io_err)?;
    }
    std::fs::write(path, body).map_err(io_err)?;

    let status = if anomalies.is_empty() {
        format!("No anomalies found. Results summary written to {}", path.display())
    } else {
        format!("Found {} anomalies with details. Results written to {}", anomalies.len(), path.display())
    };
    info!(%status, "report_written");
    Ok(status)
}
