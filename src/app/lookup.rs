use crate::config::toml_config::{LookupConfig, LookupKind};
use crate::core::grouping::canonical_key;
use crate::core::Storage;
use crate::utils::error::{DashboardError, Result};
use serde_json::Value;
use std::collections::HashMap;

pub type LookupTable = HashMap<String, String>;

/// Code → display-name dictionaries. Only the export layer reads them;
/// classification and aggregation work on raw codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTables {
    pub status: LookupTable,
    pub pol: LookupTable,
    pub poe: LookupTable,
    pub executive: LookupTable,
}

impl LookupTables {
    /// 讀取設定中列出的對照檔；未設定的表為空
    pub async fn load<S: Storage>(storage: &S, config: &LookupConfig) -> Result<Self> {
        let mut tables = Self::default();

        for (kind, path) in config.files() {
            let bytes = storage.read_file(path).await?;
            let table = parse_table(kind.field(), &bytes)?;
            tracing::debug!("Loaded {} entries for {} from {}", table.len(), kind.field(), path);
            *tables.table_mut(kind) = table;
        }

        Ok(tables)
    }

    pub fn table_mut(&mut self, kind: LookupKind) -> &mut LookupTable {
        match kind {
            LookupKind::Status => &mut self.status,
            LookupKind::Pol => &mut self.pol,
            LookupKind::Poe => &mut self.poe,
            LookupKind::Executive => &mut self.executive,
        }
    }

    pub fn status_name(&self, code: Option<&Value>) -> Option<&str> {
        resolve(&self.status, code)
    }

    pub fn pol_name(&self, code: Option<&Value>) -> Option<&str> {
        resolve(&self.pol, code)
    }

    pub fn poe_name(&self, code: Option<&Value>) -> Option<&str> {
        resolve(&self.poe, code)
    }

    pub fn executive_name(&self, code: Option<&Value>) -> Option<&str> {
        resolve(&self.executive, code)
    }

    /// Status codes the status table knows about; non-numeric keys are ignored.
    pub fn known_status_codes(&self) -> Vec<i64> {
        self.status
            .keys()
            .filter_map(|key| key.trim().parse().ok())
            .collect()
    }
}

/// Empty names count as missing so callers can fall back to a placeholder.
pub fn resolve<'t>(table: &'t LookupTable, code: Option<&Value>) -> Option<&'t str> {
    let key = code.and_then(canonical_key)?;
    table
        .get(&key)
        .map(String::as_str)
        .filter(|name| !name.is_empty())
}

pub fn parse_table(field: &str, bytes: &[u8]) -> Result<LookupTable> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Object(entries) = value else {
        return Err(DashboardError::ConfigValidationError {
            field: field.to_string(),
            message: "lookup file must contain a JSON object".to_string(),
        });
    };

    Ok(entries
        .into_iter()
        .filter_map(|(code, name)| canonical_key(&name).map(|name| (code, name)))
        .collect())
}
