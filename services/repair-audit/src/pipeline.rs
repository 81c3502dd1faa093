use std::path::Path;
use std::time::Instant;

use audit_core::{analyze, AuditConfig};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::ingest::{source_for, IngestError};
use crate::report::{write_report, ReportError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)] Ingest(#[from] IngestError),
    #[error(transparent)] Report(#[from] ReportError),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StageLatencies { pub ingest_ms: f64, pub classify_ms: f64, pub report_ms: f64, pub total_ms: f64 }

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub rows: usize,
    pub repairs_analyzed: usize,
    pub flagged: usize,
    pub status: String,
    pub latency_ms: StageLatencies,
}

/// load -> classify -> write, stopping at the first failed stage.
pub struct AuditPipeline { cfg: AuditConfig }

fn elapsed_ms(since: Instant) -> f64 { since.elapsed().as_secs_f64() * 1000.0 }

impl AuditPipeline {
    pub fn new(cfg: AuditConfig) -> Self { Self { cfg } }

    pub fn config(&self) -> &AuditConfig { &self.cfg }

    #[instrument(skip(self, input), fields(input = %input.display()))]
    pub fn run(&self, input: &Path) -> Result<PipelineOutcome, PipelineError> {
        let start = Instant::now();
        let mut lat = StageLatencies::default();

        // Stage 1 ingestion
        let s = Instant::now();
        let records = source_for(input, &self.cfg).load()?;
        lat.ingest_ms = elapsed_ms(s);
        debug!(rows = records.len(), latency_ms = lat.ingest_ms, "ingest_complete");
        if records.is_empty() { warn!("input holds no transactions"); }

        // Stage 2 classification
        let s = Instant::now();
        let analysis = analyze(&records);
        lat.classify_ms = elapsed_ms(s);
        info!(repairs_analyzed = analysis.repairs_analyzed, flagged = analysis.anomalies.len(), latency_ms = lat.classify_ms, "classify_complete");

        // Stage 3 report
        let s = Instant::now();
        let status = write_report(&analysis.anomalies, &self.cfg.output_path, self.cfg.report_format)?;
        lat.report_ms = elapsed_ms(s);

        lat.total_ms = elapsed_ms(start);
        Ok(PipelineOutcome {
            rows: records.len(),
            repairs_analyzed: analysis.repairs_analyzed,
            flagged: analysis.anomalies.len(),
            status,
            latency_ms: lat,
        })
    }
}
