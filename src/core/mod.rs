pub mod aggregate;
pub mod classifier;
pub mod engine;
pub mod grouping;
pub mod sort;
pub mod window;

pub use crate::domain::model::{DashboardReport, ShipmentRecord};
pub use crate::domain::ports::{ConfigProvider, Pipeline, RecordSource, Storage};
pub use crate::utils::error::Result;
