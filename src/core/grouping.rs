use crate::domain::model::{fields, ShipmentRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Canonical key → occurrence count.
pub type GroupCount = BTreeMap<String, usize>;

/// Canonical string form of a grouping value.
///
/// Strings are used as-is, numbers and booleans by their JSON text, arrays and
/// objects by their compact JSON. The number `1` and the string `"1"` share the
/// bucket `"1"`. `null` has no key.
pub fn canonical_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Counts records per selected value. Records whose selector yields nothing
/// are skipped rather than collected under an "unknown" bucket.
pub fn group_count_by<'a, I, F>(records: I, selector: F) -> GroupCount
where
    I: IntoIterator<Item = &'a ShipmentRecord>,
    F: Fn(&'a ShipmentRecord) -> Option<&'a Value>,
{
    records
        .into_iter()
        .filter_map(|record| selector(record).and_then(canonical_key))
        .fold(GroupCount::new(), |mut acc, key| {
            *acc.entry(key).or_insert(0) += 1;
            acc
        })
}

pub fn group_count<'a, I>(records: I, field: &str) -> GroupCount
where
    I: IntoIterator<Item = &'a ShipmentRecord>,
{
    group_count_by(records, |record| record.field(field))
}

/// Records per canonical key, in input order within each bucket. Same
/// skipping rule as `group_count_by`.
pub fn group_records_by<'a, I, F>(records: I, selector: F) -> BTreeMap<String, Vec<&'a ShipmentRecord>>
where
    I: IntoIterator<Item = &'a ShipmentRecord>,
    F: Fn(&'a ShipmentRecord) -> Option<&'a Value>,
{
    records.into_iter().fold(BTreeMap::new(), |mut acc, record| {
        if let Some(key) = selector(record).and_then(canonical_key) {
            acc.entry(key).or_insert_with(Vec::new).push(record);
        }
        acc
    })
}

/// 儀表板圖表使用的分組資料
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDatasets {
    pub executive: GroupCount,
    pub client: GroupCount,
    pub status: GroupCount,
    pub pol: GroupCount,
    pub poe: GroupCount,
}

pub fn chart_datasets(records: &[ShipmentRecord]) -> ChartDatasets {
    ChartDatasets {
        executive: group_count(records, fields::EXECUTIVE),
        client: group_count(records, fields::CUSTOMER),
        status: group_count(records, fields::STATUS),
        pol: group_count(records, fields::POL),
        poe: group_count(records, fields::POE),
    }
}
