use crate::core::Pipeline;
use crate::domain::model::DashboardReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct DashboardEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> DashboardEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        let monitor = SystemMonitor::new(monitor_enabled);
        if monitor_enabled && !monitor.is_enabled() {
            tracing::warn!("⚠️ System monitoring requested but unavailable on this build");
        }
        Self { pipeline, monitor }
    }

    /// 抓取 → 彙總 → 輸出，回傳報表路徑
    pub async fn run(&self) -> Result<String> {
        let report = self.build_report().await?;

        tracing::info!("💾 Writing dashboard report...");
        let output_path = self.pipeline.load(report).await?;
        self.monitor.log_stats("Export");
        self.monitor.log_final_stats();

        tracing::info!("📁 Report saved to: {}", output_path);
        Ok(output_path)
    }

    /// Fetch and aggregate without writing anything.
    pub async fn build_report(&self) -> Result<DashboardReport> {
        tracing::info!("🚀 Fetching shipment records...");
        let records = self.pipeline.extract().await?;
        tracing::info!("📥 Fetched {} records", records.len());
        self.monitor.log_stats("Fetch");

        tracing::info!("🔧 Aggregating records...");
        let report = self.pipeline.transform(records).await?;
        tracing::info!(
            "✅ Aggregated {} records ({} unclassified)",
            report.record_count,
            report.unclassified
        );
        self.monitor.log_stats("Aggregate");

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ShipmentRecord;
    use crate::utils::error::DashboardError;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    struct RecordingPipeline {
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail_extract: bool,
    }

    impl RecordingPipeline {
        fn record(&self, phase: &'static str) {
            self.calls.lock().unwrap().push(phase);
        }
    }

    #[async_trait]
    impl Pipeline for RecordingPipeline {
        async fn extract(&self) -> Result<Vec<ShipmentRecord>> {
            self.record("extract");
            if self.fail_extract {
                return Err(DashboardError::ApiRejected {
                    message: "sin datos".to_string(),
                });
            }
            Ok(vec![ShipmentRecord::default(), ShipmentRecord::default()])
        }

        async fn transform(&self, data: Vec<ShipmentRecord>) -> Result<DashboardReport> {
            self.record("transform");
            Ok(DashboardReport {
                reference: Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap(),
                record_count: data.len(),
                unclassified: data.len(),
                categories: vec![],
                drill_downs: vec![],
                charts: Default::default(),
                listing: vec![],
            })
        }

        async fn load(&self, report: DashboardReport) -> Result<String> {
            self.record("load");
            Ok(format!("out/{}.zip", report.record_count))
        }
    }

    #[tokio::test]
    async fn test_run_executes_phases_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let engine = DashboardEngine::new(RecordingPipeline {
            calls: calls.clone(),
            fail_extract: false,
        });

        assert_eq!(engine.run().await.unwrap(), "out/2.zip");
        assert_eq!(*calls.lock().unwrap(), vec!["extract", "transform", "load"]);
    }

    #[tokio::test]
    async fn test_build_report_does_not_load() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let engine = DashboardEngine::new(RecordingPipeline {
            calls: calls.clone(),
            fail_extract: false,
        });

        let report = engine.build_report().await.unwrap();
        assert_eq!(report.record_count, 2);
        assert_eq!(*calls.lock().unwrap(), vec!["extract", "transform"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_stops_run() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let engine = DashboardEngine::new(RecordingPipeline {
            calls: calls.clone(),
            fail_extract: true,
        });

        assert!(matches!(
            engine.run().await,
            Err(DashboardError::ApiRejected { .. })
        ));
        assert_eq!(*calls.lock().unwrap(), vec!["extract"]);
    }
}
