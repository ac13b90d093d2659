use crate::config::toml_config::DashboardConfig;
use crate::domain::model::{RecordQuery, SearchFilter};
use crate::utils::error::{DashboardError, Result};
use chrono::{DateTime, Utc};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "tramite-dashboard")]
#[command(about = "Aggregates Trámite shipment records into a dashboard report")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "dashboard.toml")]
    pub config: String,

    /// Override the API endpoint from the config file
    #[arg(long)]
    pub api_endpoint: Option<String>,

    /// Override the output directory from the config file
    #[arg(long)]
    pub output_path: Option<String>,

    /// Search field sent to the API
    #[arg(long, value_enum, default_value = "none")]
    pub filter: SearchFilter,

    /// Search text sent to the API
    #[arg(long, default_value = "")]
    pub text: String,

    /// Reference instant (RFC 3339) for time windows; defaults to now
    #[arg(long)]
    pub reference: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Log CPU and memory usage between phases
    #[arg(long)]
    pub monitor: bool,

    /// Fetch and aggregate, print the summary, write nothing
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn query(&self) -> RecordQuery {
        RecordQuery::new(self.filter, self.text.trim())
    }

    /// 只有在這裡讀取系統時間
    pub fn reference_instant(&self) -> Result<DateTime<Utc>> {
        match &self.reference {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DashboardError::InvalidConfigValueError {
                    field: "--reference".to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                }),
            None => Ok(Utc::now()),
        }
    }

    pub fn apply_overrides(&self, config: &mut DashboardConfig) {
        if let Some(endpoint) = &self.api_endpoint {
            tracing::info!("🔧 API endpoint overridden to: {}", endpoint);
            config.source.endpoint = endpoint.clone();
        }
        if let Some(output_path) = &self.output_path {
            tracing::info!("🔧 Output path overridden to: {}", output_path);
            config.output.output_path = output_path.clone();
        }
    }
}
