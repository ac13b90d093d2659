use crate::core::{ConfigProvider, RecordSource, ShipmentRecord};
use crate::domain::model::RecordQuery;
use crate::utils::error::{DashboardError, Result};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Fetches Trámite records from the REST endpoint.
///
/// The API wraps results as `{ isSuccess, message, data: { value: [...] } }`.
/// A bare JSON array is accepted as well. Failures are returned, never retried.
pub struct ApiRecordSource {
    client: Client,
    endpoint: String,
    headers: HashMap<String, String>,
}

impl ApiRecordSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            headers: HashMap::new(),
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout_seconds() {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.api_endpoint().to_string(),
            headers: config.request_headers().cloned().unwrap_or_default(),
        })
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RecordSource for ApiRecordSource {
    async fn fetch(&self, query: &RecordQuery) -> Result<Vec<ShipmentRecord>> {
        let filter_code = query.filter.code().to_string();
        let mut request = self.client.get(&self.endpoint).query(&[
            ("numFilter", filter_code.as_str()),
            ("textFilter", query.text.as_str()),
        ]);

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        tracing::debug!(
            "Requesting {} (numFilter={}, textFilter={:?})",
            self.endpoint,
            filter_code,
            query.text
        );
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            return Err(DashboardError::UnexpectedResponse {
                message: format!("HTTP {} from {}", status, self.endpoint),
            });
        }

        let body: Value = response.json().await?;
        decode_envelope(body)
    }
}

/// 解開 API 的回應外殼，取出記錄陣列
pub fn decode_envelope(body: Value) -> Result<Vec<ShipmentRecord>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut envelope) => {
            if envelope.get("isSuccess").and_then(Value::as_bool) == Some(false) {
                let message = envelope
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("request was not successful")
                    .to_string();
                tracing::warn!("⚠️ API rejected the request: {}", message);
                return Err(DashboardError::ApiRejected { message });
            }

            match envelope
                .remove("data")
                .and_then(|mut data| data.get_mut("value").map(Value::take))
            {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => {
                    return Err(DashboardError::UnexpectedResponse {
                        message: "response has no data.value array".to_string(),
                    })
                }
                Some(other) => {
                    return Err(DashboardError::UnexpectedResponse {
                        message: format!("data.value is not an array: {}", type_name(&other)),
                    })
                }
            }
        }
        other => {
            return Err(DashboardError::UnexpectedResponse {
                message: format!("expected an object or array, got {}", type_name(&other)),
            })
        }
    };

    let total = items.len();
    let records: Vec<ShipmentRecord> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(ShipmentRecord::from(map)),
            _ => None,
        })
        .collect();

    if records.len() < total {
        tracing::warn!(
            "⚠️ Skipped {} non-object entries in API response",
            total - records.len()
        );
    }

    Ok(records)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
