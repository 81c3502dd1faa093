//! Core shared pieces for the repair movement audit: classification,
//! configuration and tracing setup.

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Installs the global subscriber once. `RUST_LOG` wins over `default_level`;
/// JSON output is selected by `json` or `AUDIT_JSON_LOG=1|true`. Logs go to stderr.
pub fn init_tracing(service: &str, default_level: &str, json: bool) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let json = json || std::env::var("AUDIT_JSON_LOG").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
        let registry = tracing_subscriber::registry().with(env_filter);
        if json {
            registry
                .with(tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr))
                .try_init()?;
        } else {
            registry
                .with(tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr))
                .try_init()?;
        }
        Ok(())
    })?;
    info!(target: "audit", service, "tracing initialized");
    Ok(())
}

pub mod classifier;
pub mod config;

pub use crate::classifier::{analyze, classify, Analysis, AnomalyRecord, Deviation, MovementCodeTally, TransactionRecord, EXPECTED_CODES, EXPECTED_TOTAL};
pub use crate::config::{load_config, AuditConfig, ConfigError, ReportFormat};
