use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// 欄位名稱：唯一的權威 schema
pub mod fields {
    pub const IDTRA: &str = "title";
    pub const STATUS: &str = "new_preestado2";
    pub const ETA: &str = "new_eta";
    pub const CUSTOMER: &str = "_customerid_value";
    pub const EXECUTIVE: &str = "new_ejecutivocomercial";
    pub const CONTAINER: &str = "new_contenedor";
    pub const INVOICE: &str = "new_factura";
    pub const COMMODITY: &str = "new_commodity";
    pub const BCF: &str = "new_bcf";
    pub const PO: &str = "new_po";
    pub const POL: &str = "new_pol";
    pub const POE: &str = "new_poe";
    pub const DEPARTURE_CONFIRMATION: &str = "new_confirmacionzarpe";
    pub const EQUIPMENT_COUNT: &str = "new_cantequipo";
    pub const EQUIPMENT_SIZE: &str = "new_tamaoequipo";
    pub const PACKAGE_COUNT: &str = "new_contidadbultos";
    pub const WEIGHT: &str = "new_peso";
    pub const ORIGIN_CERTIFICATE: &str = "new_aplicacertificadodeorigen";
    pub const REEXPORT_CERTIFICATE: &str = "new_aplicacertificadoreexportacion";
    pub const EXEMPTION: &str = "new_llevaexoneracion";
    pub const BL_ORIGINAL_DELIVERY: &str = "new_entregabloriginal";
    pub const TRACEABILITY_LETTER: &str = "new_entregacartatrazabilidad";
    pub const BL_PRINTED: &str = "new_fechablimpreso";
    pub const BL_DIGITIZED: &str = "new_fechabldigittica";
    pub const TRANSLATION_DELIVERY: &str = "new_entregatraduccion";
    pub const DOCUMENT_RELEASE: &str = "new_liberaciondocumental";
    pub const FINANCIAL_RELEASE: &str = "new_fechaliberacionfinanciera";
    pub const COMMENT: &str = "new_observaciones";

    /// Legacy names seen in older API versions: (canonical, alias).
    pub const ALIASES: &[(&str, &str)] = &[
        (TRACEABILITY_LETTER, "new_entregacartadestrazabilidad"),
        (DOCUMENT_RELEASE, "new_liberacionmovimientoinventario"),
    ];

    pub fn alias_of(name: &str) -> Option<&'static str> {
        ALIASES
            .iter()
            .find(|(canonical, _)| *canonical == name)
            .map(|(_, alias)| *alias)
    }
}

/// 一筆 Trámite 記錄，保持 API 回傳的扁平結構
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentRecord {
    pub data: Map<String, Value>,
}

impl ShipmentRecord {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// Returns the value stored under `name` (or its legacy alias), treating
    /// JSON `null` the same as an absent field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        let value = self
            .data
            .get(name)
            .or_else(|| fields::alias_of(name).and_then(|alias| self.data.get(alias)))?;
        if value.is_null() {
            None
        } else {
            Some(value)
        }
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    pub fn idtra(&self) -> Option<&str> {
        self.str_field(fields::IDTRA)
    }

    /// Status codes arrive as integers, but some older payloads send them as strings.
    pub fn status_code(&self) -> Option<i64> {
        match self.field(fields::STATUS)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn eta(&self, offset: FixedOffset) -> Option<DateTime<Utc>> {
        self.timestamp(fields::ETA, offset)
    }

    /// 解析日期欄位；沒有時區的值以 `offset` 的本地時間解讀，格式錯誤視為缺值
    pub fn timestamp(&self, name: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
        self.field(name).and_then(|value| parse_timestamp(value, offset))
    }

    pub fn flag(&self, name: &str) -> bool {
        self.field(name).and_then(Value::as_bool).unwrap_or(false)
    }
}

impl From<Map<String, Value>> for ShipmentRecord {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

/// Accepts RFC 3339, naive ISO date-times, plain dates and epoch
/// milliseconds. Naive date-times and plain dates are local time at `offset`.
/// Anything else is `None`.
pub fn parse_timestamp(value: &Value, offset: FixedOffset) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s, offset),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .map(|date| date.and_time(NaiveTime::MIN))
                })
                .and_then(|naive| naive.and_local_timezone(offset).single())
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// 由狀態碼推導出的物流階段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Origin,
    InTransit,
    EntryPoint,
    WarehouseMovement,
    InWarehouse,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Origin,
        Category::InTransit,
        Category::EntryPoint,
        Category::WarehouseMovement,
        Category::InWarehouse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Origin => "origin",
            Category::InTransit => "in_transit",
            Category::EntryPoint => "entry_point",
            Category::WarehouseMovement => "warehouse_movement",
            Category::InWarehouse => "in_warehouse",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Category::Origin => "Cargas en Origen",
            Category::InTransit => "Cargas en Tránsito",
            Category::EntryPoint => "Cargas en Pto Entrada",
            Category::WarehouseMovement => "Movimiento a WHS / HUB de Carga",
            Category::InWarehouse => "Cargas en WHS / HUB de Carga",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Day,
    Week,
    Month,
    Total,
}

impl WindowKind {
    pub const ALL: [WindowKind; 4] = [
        WindowKind::Day,
        WindowKind::Week,
        WindowKind::Month,
        WindowKind::Total,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowKind::Day => "day",
            WindowKind::Week => "week",
            WindowKind::Month => "month",
            WindowKind::Total => "total",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WindowKind::Day => "Hoy",
            WindowKind::Week => "Semana",
            WindowKind::Month => "Mes",
            WindowKind::Total => "Total",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 後端查詢的篩選欄位 (numFilter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum SearchFilter {
    #[default]
    None,
    Client,
    Container,
    Bcf,
    Invoice,
    Po,
}

impl SearchFilter {
    pub fn code(&self) -> u8 {
        match self {
            SearchFilter::None => 0,
            SearchFilter::Client => 1,
            SearchFilter::Container => 2,
            SearchFilter::Bcf => 3,
            SearchFilter::Invoice => 4,
            SearchFilter::Po => 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQuery {
    pub filter: SearchFilter,
    pub text: String,
}

impl RecordQuery {
    pub fn new(filter: SearchFilter, text: impl Into<String>) -> Self {
        Self {
            filter,
            text: text.into(),
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.filter == SearchFilter::None
    }
}

/// 明細表的一列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillDownRow {
    pub idtra: String,
    pub client: String,
    pub pol: String,
    pub eta: String,
    pub status: String,
    pub po: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillDownTable {
    pub name: String,
    pub title: String,
    pub rows: Vec<DrillDownRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub title: String,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows: Option<BTreeMap<WindowKind, usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSlice {
    pub id: String,
    pub label: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub reference: DateTime<Utc>,
    pub record_count: usize,
    pub unclassified: usize,
    pub categories: Vec<CategorySummary>,
    pub drill_downs: Vec<DrillDownTable>,
    pub charts: BTreeMap<String, Vec<ChartSlice>>,
    pub listing: Vec<ShipmentRecord>,
}

impl DashboardReport {
    pub fn summary(&self, category: Category) -> Option<&CategorySummary> {
        self.categories.iter().find(|s| s.category == category)
    }

    pub fn drill_down(&self, name: &str) -> Option<&DrillDownTable> {
        self.drill_downs.iter().find(|t| t.name == name)
    }
}
