use crate::domain::model::{Category, ShipmentRecord};
use crate::utils::error::{DashboardError, Result};
use std::collections::{BTreeMap, BTreeSet};

/// One category and the status codes that place a record in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub category: Category,
    pub codes: BTreeSet<i64>,
    /// Whether the aggregator keeps day/week/month/total sub-counts for this category.
    pub windowed: bool,
}

impl CategoryRule {
    pub fn new(category: Category, codes: impl IntoIterator<Item = i64>) -> Self {
        Self {
            category,
            codes: codes.into_iter().collect(),
            windowed: false,
        }
    }

    pub fn with_windows(mut self) -> Self {
        self.windowed = true;
        self
    }
}

/// Validated rule set. Codes never belong to more than one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRules {
    rules: Vec<CategoryRule>,
    index: BTreeMap<i64, Category>,
}

impl CategoryRules {
    /// 建立規則集並確認各類別的狀態碼互不重疊
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self> {
        let mut index = BTreeMap::new();
        let mut seen = BTreeSet::new();

        for rule in &rules {
            if !seen.insert(rule.category) {
                return Err(DashboardError::ConfigValidationError {
                    field: format!("categories.{}", rule.category),
                    message: "category is defined more than once".to_string(),
                });
            }
            for &code in &rule.codes {
                if let Some(first) = index.insert(code, rule.category) {
                    return Err(DashboardError::OverlappingRuleError {
                        code,
                        first: first.to_string(),
                        second: rule.category.to_string(),
                    });
                }
            }
        }

        Ok(Self { rules, index })
    }

    /// Rule set used by the operations dashboard. Only in-transit is windowed.
    pub fn dashboard_default() -> Self {
        let rules = vec![
            CategoryRule::new(
                Category::Origin,
                [100000000, 100000001, 100000015, 100000014, 100000017],
            ),
            CategoryRule::new(Category::InTransit, [100000002]).with_windows(),
            CategoryRule::new(Category::EntryPoint, [100000027, 100000003]),
            CategoryRule::new(Category::WarehouseMovement, [100000007, 100000024]),
            CategoryRule::new(
                Category::InWarehouse,
                [
                    100000010, 100000022, 100000023, 100000025, 100000004, 100000026, 100000020,
                    100000019, 100000016, 100000008, 100000011, 100000006, 100000013, 100000028,
                    100000009, 100000005,
                ],
            ),
        ];

        let index = rules
            .iter()
            .flat_map(|rule| rule.codes.iter().map(move |&code| (code, rule.category)))
            .collect();
        Self { rules, index }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.rules.iter().map(|rule| rule.category)
    }

    pub fn rule(&self, category: Category) -> Option<&CategoryRule> {
        self.rules.iter().find(|rule| rule.category == category)
    }

    pub fn is_windowed(&self, category: Category) -> bool {
        self.rule(category).map(|rule| rule.windowed).unwrap_or(false)
    }

    pub fn classify_code(&self, code: i64) -> Option<Category> {
        self.index.get(&code).copied()
    }

    /// Known status codes that no category covers, sorted ascending.
    pub fn uncovered(&self, known_codes: impl IntoIterator<Item = i64>) -> Vec<i64> {
        known_codes
            .into_iter()
            .filter(|code| !self.index.contains_key(code))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self::dashboard_default()
    }
}

/// `None` means unclassified: the record stays in listings but not in any category.
pub fn classify(record: &ShipmentRecord, rules: &CategoryRules) -> Option<Category> {
    record.status_code().and_then(|code| rules.classify_code(code))
}
