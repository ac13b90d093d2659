use crate::core::classifier::{classify, CategoryRules};
use crate::core::window::{Calendar, TimeWindow};
use crate::domain::model::{Category, ShipmentRecord, WindowKind};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Records matching one category, plus per-window subsets when the rule is windowed.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAggregate<'a> {
    pub category: Category,
    records: Vec<&'a ShipmentRecord>,
    windows: Option<BTreeMap<WindowKind, Vec<&'a ShipmentRecord>>>,
}

impl<'a> CategoryAggregate<'a> {
    fn new(category: Category, windowed: bool) -> Self {
        Self {
            category,
            records: Vec::new(),
            windows: windowed.then(|| {
                WindowKind::ALL
                    .iter()
                    .map(|&kind| (kind, Vec::new()))
                    .collect()
            }),
        }
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[&'a ShipmentRecord] {
        &self.records
    }

    pub fn is_windowed(&self) -> bool {
        self.windows.is_some()
    }

    /// `None` when the category does not track windows.
    pub fn window_count(&self, kind: WindowKind) -> Option<usize> {
        self.window_records(kind).map(<[_]>::len)
    }

    pub fn window_records(&self, kind: WindowKind) -> Option<&[&'a ShipmentRecord]> {
        self.windows
            .as_ref()
            .and_then(|windows| windows.get(&kind))
            .map(Vec::as_slice)
    }

    pub fn window_counts(&self) -> Option<BTreeMap<WindowKind, usize>> {
        self.windows.as_ref().map(|windows| {
            windows
                .iter()
                .map(|(&kind, records)| (kind, records.len()))
                .collect()
        })
    }
}

/// Result of one aggregation pass. Borrows the input records.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate<'a> {
    pub reference: DateTime<Utc>,
    categories: BTreeMap<Category, CategoryAggregate<'a>>,
    unclassified: usize,
    unclassified_codes: BTreeSet<i64>,
}

impl<'a> Aggregate<'a> {
    pub fn category(&self, category: Category) -> Option<&CategoryAggregate<'a>> {
        self.categories.get(&category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &CategoryAggregate<'a>> {
        self.categories.values()
    }

    /// Records with no status code or a code outside every category.
    pub fn unclassified(&self) -> usize {
        self.unclassified
    }

    pub fn unclassified_codes(&self) -> &BTreeSet<i64> {
        &self.unclassified_codes
    }

    pub fn classified(&self) -> usize {
        self.categories.values().map(CategoryAggregate::total).sum()
    }

    /// 明細查詢：window 為 None 時回傳整個類別
    pub fn drill_down(
        &self,
        category: Category,
        window: Option<WindowKind>,
    ) -> Option<&[&'a ShipmentRecord]> {
        let aggregate = self.categories.get(&category)?;
        match window {
            None => Some(aggregate.records()),
            Some(kind) => aggregate.window_records(kind),
        }
    }
}

/// Single pass over `records`: classify each one, then test windowed
/// categories against every window computed from `reference`.
pub fn aggregate<'a>(
    records: &'a [ShipmentRecord],
    rules: &CategoryRules,
    reference: DateTime<Utc>,
    calendar: &Calendar,
) -> Aggregate<'a> {
    let windows: Vec<(WindowKind, TimeWindow)> = WindowKind::ALL
        .iter()
        .map(|&kind| (kind, calendar.window(kind, reference)))
        .collect();

    let mut categories: BTreeMap<Category, CategoryAggregate<'a>> = rules
        .rules()
        .iter()
        .map(|rule| (rule.category, CategoryAggregate::new(rule.category, rule.windowed)))
        .collect();
    let mut unclassified = 0;
    let mut unclassified_codes = BTreeSet::new();

    for record in records {
        let Some(entry) = classify(record, rules).and_then(|c| categories.get_mut(&c)) else {
            unclassified += 1;
            if let Some(code) = record.status_code() {
                unclassified_codes.insert(code);
            }
            continue;
        };

        entry.records.push(record);

        if let Some(subsets) = entry.windows.as_mut() {
            let eta = record.eta(calendar.offset());
            for (kind, window) in &windows {
                if window.contains(eta) {
                    subsets.entry(*kind).or_default().push(record);
                }
            }
        }
    }

    if !unclassified_codes.is_empty() {
        tracing::debug!(
            "{} records outside every category, status codes: {:?}",
            unclassified,
            unclassified_codes
        );
    }

    Aggregate {
        reference,
        categories,
        unclassified,
        unclassified_codes,
    }
}
