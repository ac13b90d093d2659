use crate::domain::model::{DashboardReport, RecordQuery, ShipmentRecord};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 資料來源：每次查詢都回傳完整的記錄集合，取代先前的結果
pub trait RecordSource: Send + Sync {
    fn fetch(
        &self,
        query: &RecordQuery,
    ) -> impl std::future::Future<Output = Result<Vec<ShipmentRecord>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn output_path(&self) -> &str;
    fn request_timeout_seconds(&self) -> Option<u64>;
    fn request_headers(&self) -> Option<&HashMap<String, String>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<ShipmentRecord>>;
    async fn transform(&self, data: Vec<ShipmentRecord>) -> Result<DashboardReport>;
    async fn load(&self, report: DashboardReport) -> Result<String>;
}
