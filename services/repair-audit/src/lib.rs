//! Repair movement audit: spreadsheet ingestion, report sink and the
//! sequential pipeline driving them around `audit_core::classify`.

pub mod ingest;
pub mod pipeline;
pub mod report;

pub use ingest::{load_transactions, source_for, ColumnSpec, CsvSource, IngestError, SpreadsheetSource, TransactionSource};
pub use pipeline::{AuditPipeline, PipelineError, PipelineOutcome, StageLatencies};
pub use report::{render_json, render_text, write_report, ReportError};
