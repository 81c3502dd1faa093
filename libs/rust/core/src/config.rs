use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_REPAIR_COLUMN: &str = "Repair Number";
pub const DEFAULT_MOVEMENT_COLUMN: &str = "Movement Code";
pub const DEFAULT_OUTPUT_PATH: &str = "flagged_repairs_detailed.txt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config error: {0}")] Load(#[from] config::ConfigError),
    #[error("unknown report format '{0}' (expected text or json)")] UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Self::Text => "text", Self::Json => "json" })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Header of the column holding the repair number.
    pub repair_column: String,
    /// Header of the column holding the movement code.
    pub movement_column: String,
    /// Worksheet to read; the first sheet when unset.
    #[serde(default)]
    pub sheet: Option<String>,
    pub output_path: PathBuf,
    #[serde(default)]
    pub report_format: ReportFormat,
    pub log_level: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            repair_column: DEFAULT_REPAIR_COLUMN.into(),
            movement_column: DEFAULT_MOVEMENT_COLUMN.into(),
            sheet: None,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            report_format: ReportFormat::Text,
            log_level: "info".into(),
        }
    }
}

/// Layers built-in defaults, an optional file (`file`, else `AUDIT_CONFIG_FILE`)
/// and `AUDIT__*` environment variables, in that order.
pub fn load_config(file: Option<&Path>) -> Result<AuditConfig, ConfigError> {
    let mut builder = config::Config::builder()
        .set_default("repair_column", DEFAULT_REPAIR_COLUMN)?
        .set_default("movement_column", DEFAULT_MOVEMENT_COLUMN)?
        .set_default("output_path", DEFAULT_OUTPUT_PATH)?
        .set_default("report_format", "text")?
        .set_default("log_level", "info")?;

    let file_path = file.map(Path::to_path_buf).or_else(|| std::env::var("AUDIT_CONFIG_FILE").ok().map(PathBuf::from));
    if let Some(path) = file_path {
        tracing::debug!(path = %path.display(), "config_file");
        builder = builder.add_source(config::File::from(path).required(true));
    }
    builder = builder.add_source(config::Environment::with_prefix("AUDIT").separator("__"));
    let cfg: AuditConfig = builder.build()?.try_deserialize()?;
    Ok(cfg)
}
