use std::path::PathBuf;

use anyhow::{Context, Result};
use audit_core::{init_tracing, load_config, ReportFormat};
use clap::Parser;
use repair_audit::AuditPipeline;
use tracing::{error, info};

/// Flags repair numbers whose movement transactions are not exactly one each of 251, 161 and 252.
#[derive(Debug, Parser)]
#[command(name = "repair-audit", version)]
struct Cli {
    /// Spreadsheet (xlsx, xlsm, xls, ods) or CSV export to audit
    #[arg(value_name = "INPUT_FILE")]
    input: PathBuf,

    /// Configuration file (yaml, toml or json); falls back to AUDIT_CONFIG_FILE
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report destination
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format (text, json)
    #[arg(long)]
    format: Option<ReportFormat>,

    /// Worksheet to read instead of the first one
    #[arg(long)]
    sheet: Option<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.as_deref()).context("loading configuration")?;
    if let Some(output) = cli.output { cfg.output_path = output; }
    if let Some(format) = cli.format { cfg.report_format = format; }
    if cli.sheet.is_some() { cfg.sheet = cli.sheet; }
    if let Some(level) = cli.log_level { cfg.log_level = level; }

    init_tracing("repair-audit", &cfg.log_level, cli.log_json)?;
    info!(input = %cli.input.display(), output = %cfg.output_path.display(), format = %cfg.report_format, "audit_starting");

    let outcome = AuditPipeline::new(cfg)
        .run(&cli.input)
        .inspect_err(|e| error!(error = %e, "audit_failed"))
        .with_context(|| format!("auditing {}", cli.input.display()))?;

    info!(rows = outcome.rows, repairs = outcome.repairs_analyzed, flagged = outcome.flagged, total_ms = outcome.latency_ms.total_ms, "audit_finished");
    println!("{}", outcome.status);
    Ok(())
}
