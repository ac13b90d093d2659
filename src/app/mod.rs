pub mod export;
pub mod lookup;
pub mod pipeline;

pub use lookup::LookupTables;
pub use pipeline::DashboardPipeline;
