pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::{http::ApiRecordSource, storage::LocalStorage};
pub use app::{DashboardPipeline, LookupTables};
pub use config::{DashboardConfig, ReportSettings};
pub use core::engine::DashboardEngine;
pub use utils::error::{DashboardError, Result};
