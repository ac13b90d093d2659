use crate::app::export::{chart_slices, drill_down_table, encode_drill_down, encode_listing};
use crate::app::lookup::{LookupTable, LookupTables};
use crate::config::toml_config::ReportSettings;
use crate::core::aggregate::aggregate;
use crate::core::grouping::{chart_datasets, group_records_by};
use crate::core::sort::{sort_by_eta_soonest_first, upcoming};
use crate::core::{DashboardReport, Pipeline, RecordSource, ShipmentRecord, Storage};
use crate::domain::model::{fields, CategorySummary, ChartSlice, RecordQuery};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Fetches one record set, aggregates it into dashboard tiles and writes the
/// report archive through `Storage`.
pub struct DashboardPipeline<S: Storage, R: RecordSource> {
    storage: S,
    source: R,
    settings: ReportSettings,
    lookups: LookupTables,
    query: RecordQuery,
    reference: DateTime<Utc>,
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    reference: DateTime<Utc>,
    record_count: usize,
    unclassified: usize,
    categories: &'a [CategorySummary],
}

impl<S: Storage, R: RecordSource> DashboardPipeline<S, R> {
    pub fn new(storage: S, source: R, settings: ReportSettings, reference: DateTime<Utc>) -> Self {
        Self {
            storage,
            source,
            settings,
            lookups: LookupTables::default(),
            query: RecordQuery::default(),
            reference,
        }
    }

    pub fn with_lookups(mut self, lookups: LookupTables) -> Self {
        self.lookups = lookups;
        self
    }

    pub fn with_query(mut self, query: RecordQuery) -> Self {
        self.query = query;
        self
    }

    /// 由記錄集合計算完整報表；相同輸入與參考時間得到相同結果
    pub fn build_report(&self, records: &[ShipmentRecord]) -> DashboardReport {
        let calendar = &self.settings.calendar;
        let rules = &self.settings.rules;
        let summary = aggregate(records, rules, self.reference, calendar);

        let mut categories = Vec::new();
        let mut drill_downs = Vec::new();
        for category_aggregate in summary.categories() {
            let category = category_aggregate.category;
            categories.push(CategorySummary {
                category,
                title: category.title().to_string(),
                total: category_aggregate.total(),
                windows: category_aggregate.window_counts(),
            });

            drill_downs.push(drill_down_table(
                category.as_str(),
                category.title(),
                category_aggregate.records().iter().copied(),
                &self.lookups,
                calendar,
            ));

            if let Some(windows) = category_aggregate.window_counts() {
                for kind in windows.keys() {
                    let rows = category_aggregate.window_records(*kind).unwrap_or_default();
                    drill_downs.push(drill_down_table(
                        format!("{}_{}", category.as_str(), kind.as_str()),
                        format!("{} ({})", category.title(), kind.label()),
                        rows.iter().copied(),
                        &self.lookups,
                        calendar,
                    ));
                }
            }
        }

        let datasets = chart_datasets(records);
        let no_labels = LookupTable::new();
        let charts: BTreeMap<String, Vec<ChartSlice>> = [
            ("executive", chart_slices(&datasets.executive, &self.lookups.executive)),
            ("client", chart_slices(&datasets.client, &no_labels)),
            ("status", chart_slices(&datasets.status, &self.lookups.status)),
            ("pol", chart_slices(&datasets.pol, &self.lookups.pol)),
            ("poe", chart_slices(&datasets.poe, &self.lookups.poe)),
        ]
        .into_iter()
        .map(|(name, slices)| (name.to_string(), slices))
        .collect();

        // 圖表切片的明細：每位業務與每位客戶一張表
        let mut used_names: BTreeSet<String> = drill_downs.iter().map(|t| t.name.clone()).collect();
        let slice_sources = [
            ("executive", "Ejecutivo", fields::EXECUTIVE, &self.lookups.executive),
            ("client", "Cliente", fields::CUSTOMER, &no_labels),
        ];
        for (chart, noun, field, labels) in slice_sources {
            for (key, members) in group_records_by(records, |record| record.field(field)) {
                let label = labels
                    .get(&key)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(&key);
                drill_downs.push(drill_down_table(
                    slice_table_name(chart, &key, &mut used_names),
                    format!("Trámites para {}: {}", noun, label),
                    members,
                    &self.lookups,
                    calendar,
                ));
            }
        }

        let listing = if self.query.is_unfiltered() {
            upcoming(records, self.reference, calendar)
        } else {
            sort_by_eta_soonest_first(records, self.reference, calendar)
        };

        DashboardReport {
            reference: self.reference,
            record_count: records.len(),
            unclassified: summary.unclassified(),
            categories,
            drill_downs,
            charts,
            listing: listing.into_iter().cloned().collect(),
        }
    }

    /// 壓縮檔內的所有檔案 (路徑, 內容)
    pub fn archive_entries(&self, report: &DashboardReport) -> Result<Vec<(String, Vec<u8>)>> {
        let summary = SummaryDocument {
            reference: report.reference,
            record_count: report.record_count,
            unclassified: report.unclassified,
            categories: &report.categories,
        };

        let mut entries = vec![
            ("summary.json".to_string(), serde_json::to_vec_pretty(&summary)?),
            ("charts.json".to_string(), serde_json::to_vec_pretty(&report.charts)?),
        ];

        for format in &self.settings.formats {
            let ext = format.extension();
            entries.push((
                format!("listing.{}", ext),
                encode_listing(*format, &report.listing, &self.lookups, &self.settings.calendar)?,
            ));
            for table in &report.drill_downs {
                entries.push((
                    format!("drilldown/{}.{}", table.name, ext),
                    encode_drill_down(*format, table)?,
                ));
            }
        }

        Ok(entries)
    }
}

/// Archive-safe, unique table name for one chart slice.
fn slice_table_name(chart: &str, key: &str, used: &mut BTreeSet<String>) -> String {
    let slug: String = key
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let base = format!("{}_{}", chart, slug);

    let mut name = base.clone();
    let mut suffix = 2;
    while !used.insert(name.clone()) {
        name = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    name
}

#[async_trait]
impl<S: Storage, R: RecordSource> Pipeline for DashboardPipeline<S, R> {
    async fn extract(&self) -> Result<Vec<ShipmentRecord>> {
        tracing::debug!(
            "Fetching records with filter {:?} and text {:?}",
            self.query.filter,
            self.query.text
        );
        self.source.fetch(&self.query).await
    }

    async fn transform(&self, data: Vec<ShipmentRecord>) -> Result<DashboardReport> {
        let report = self.build_report(&data);
        for summary in &report.categories {
            tracing::debug!("{}: {}", summary.title, summary.total);
        }
        Ok(report)
    }

    async fn load(&self, report: DashboardReport) -> Result<String> {
        let entries = self.archive_entries(&report)?;
        tracing::debug!("Packing {} files into {}", entries.len(), self.settings.archive_name);

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for (name, bytes) in &entries {
                zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                zip.write_all(bytes)?;
            }
            zip.finish()?.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage
            .write_file(&self.settings.archive_name, &zip_data)
            .await?;

        Ok(format!(
            "{}/{}",
            self.settings.output_path, self.settings.archive_name
        ))
    }
}
