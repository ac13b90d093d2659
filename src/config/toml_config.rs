use crate::core::classifier::{CategoryRule, CategoryRules};
use crate::core::window::Calendar;
use crate::core::ConfigProvider;
use crate::domain::model::Category;
use crate::utils::error::{DashboardError, Result};
use crate::utils::validation::{self, Validate};
use chrono::{Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub categories: CategoriesConfig,
    #[serde(default)]
    pub lookups: LookupConfig,
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// e.g. "-06:00"; defaults to UTC
    pub utc_offset: Option<String>,
    /// defaults to "sunday"
    pub week_start: Option<String>,
}

/// 各類別的狀態碼；未設定的類別沿用儀表板預設值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoriesConfig {
    pub origin: Option<Vec<i64>>,
    pub in_transit: Option<Vec<i64>>,
    pub entry_point: Option<Vec<i64>>,
    pub warehouse_movement: Option<Vec<i64>>,
    pub in_warehouse: Option<Vec<i64>>,
    pub windowed: Option<Vec<Category>>,
}

impl CategoriesConfig {
    fn codes(&self, category: Category) -> Option<&Vec<i64>> {
        match category {
            Category::Origin => self.origin.as_ref(),
            Category::InTransit => self.in_transit.as_ref(),
            Category::EntryPoint => self.entry_point.as_ref(),
            Category::WarehouseMovement => self.warehouse_movement.as_ref(),
            Category::InWarehouse => self.in_warehouse.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupConfig {
    pub status: Option<String>,
    pub pol: Option<String>,
    pub poe: Option<String>,
    pub executive: Option<String>,
}

/// Which lookup table a configured file fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Status,
    Pol,
    Poe,
    Executive,
}

impl LookupKind {
    /// 設定檔中的欄位名稱，用於錯誤訊息
    pub fn field(&self) -> &'static str {
        match self {
            LookupKind::Status => "lookups.status",
            LookupKind::Pol => "lookups.pol",
            LookupKind::Poe => "lookups.poe",
            LookupKind::Executive => "lookups.executive",
        }
    }
}

impl LookupConfig {
    pub fn files(&self) -> impl Iterator<Item = (LookupKind, &str)> {
        [
            (LookupKind::Status, self.status.as_deref()),
            (LookupKind::Pol, self.pol.as_deref()),
            (LookupKind::Poe, self.poe.as_deref()),
            (LookupKind::Executive, self.executive.as_deref()),
        ]
        .into_iter()
        .filter_map(|(kind, path)| path.map(|p| (kind, p)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Tsv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_path: String,
    pub formats: Vec<OutputFormat>,
    pub archive_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

/// 報表產生所需的已驗證設定
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub rules: CategoryRules,
    pub calendar: Calendar,
    pub formats: Vec<OutputFormat>,
    pub archive_name: String,
    pub output_path: String,
}

pub const DEFAULT_ARCHIVE_NAME: &str = "dashboard_report.zip";

impl DashboardConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${API_TOKEN})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| {
            DashboardError::ConfigValidationError {
                field: "environment".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    pub fn calendar(&self) -> Result<Calendar> {
        let offset = match &self.calendar.utc_offset {
            Some(raw) => validation::parse_utc_offset("calendar.utc_offset", raw)?,
            None => Utc.fix(),
        };
        let week_start = match &self.calendar.week_start {
            Some(raw) => validation::parse_weekday("calendar.week_start", raw)?,
            None => Weekday::Sun,
        };
        Ok(Calendar::new(offset, week_start))
    }

    /// Builds the validated rule set: configured code lists override the
    /// dashboard defaults per category, and overlapping codes are rejected.
    pub fn category_rules(&self) -> Result<CategoryRules> {
        let defaults = CategoryRules::dashboard_default();
        let windowed = self.categories.windowed.as_ref();

        let rules = Category::ALL
            .iter()
            .filter_map(|&category| {
                let codes = self
                    .categories
                    .codes(category)
                    .cloned()
                    .or_else(|| defaults.rule(category).map(|r| r.codes.iter().copied().collect()))?;
                let mut rule = CategoryRule::new(category, codes);
                rule.windowed = match windowed {
                    Some(list) => list.contains(&category),
                    None => defaults.is_windowed(category),
                };
                Some(rule)
            })
            .collect();

        CategoryRules::new(rules)
    }

    pub fn archive_name(&self) -> &str {
        self.output
            .archive_name
            .as_deref()
            .unwrap_or(DEFAULT_ARCHIVE_NAME)
    }

    pub fn report_settings(&self) -> Result<ReportSettings> {
        Ok(ReportSettings {
            rules: self.category_rules()?,
            calendar: self.calendar()?,
            formats: self.output.formats.clone(),
            archive_name: self.archive_name().to_string(),
            output_path: self.output.output_path.clone(),
        })
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_positive_number("source.timeout_seconds", timeout, 1)?;
        }

        validation::validate_path("output.output_path", &self.output.output_path)?;
        validation::validate_non_empty_string("output.archive_name", self.archive_name())?;
        validation::validate_file_extension("output.archive_name", self.archive_name(), &["zip"])?;
        if self.output.formats.is_empty() {
            return Err(DashboardError::MissingConfigError {
                field: "output.formats".to_string(),
            });
        }

        for (kind, path) in self.lookups.files() {
            validation::validate_path(kind.field(), path)?;
            validation::validate_file_extension(kind.field(), path, &["json"])?;
        }

        self.calendar()?;
        self.category_rules()?;
        Ok(())
    }
}

impl ConfigProvider for DashboardConfig {
    fn api_endpoint(&self) -> &str {
        &self.source.endpoint
    }

    fn output_path(&self) -> &str {
        &self.output.output_path
    }

    fn request_timeout_seconds(&self) -> Option<u64> {
        self.source.timeout_seconds
    }

    fn request_headers(&self) -> Option<&HashMap<String, String>> {
        self.source.headers.as_ref()
    }
}

impl Validate for DashboardConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
