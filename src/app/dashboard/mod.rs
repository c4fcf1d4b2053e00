pub mod sources;

use crate::core::engine::ForecastEngine;
use crate::core::trend::with_trend;
use crate::domain::model::{HistoricalTable, SeriesPoint, TrendPoint};
use crate::domain::ports::{SeriesSource, Storage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sources::{ModelFittedSource, TableColumnSource};
use std::collections::BTreeMap;

pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// 儀表板圖表沒有設定顏色時使用
pub const DEFAULT_PANEL_COLOR: &str = "#003366";

pub fn default_summary_columns() -> Vec<String> {
    ["Urbain", "Rural", "Ensemble"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardOptions {
    pub histogram_bins: usize,
    pub distribution_columns: Vec<String>,
    pub overview_columns: Vec<String>,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            distribution_columns: default_summary_columns(),
            overview_columns: default_summary_columns(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesOrigin {
    Table,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPanel {
    pub category: String,
    pub color: String,
    pub points: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPanel {
    pub category: String,
    pub color: String,
    pub origin: SeriesOrigin,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonBar {
    pub category: String,
    pub color: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub columns: Vec<String>,
    pub bins: Vec<HistogramBin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewRow {
    pub quarter: String,
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub columns: Vec<String>,
    pub rows: Vec<OverviewRow>,
}

/// 儀表板所需的全部資料，繪圖交給前端
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub generated_at: DateTime<Utc>,
    pub trend_panels: Vec<TrendPanel>,
    pub rate_panels: Vec<SeriesPanel>,
    pub area_panels: Vec<SeriesPanel>,
    pub comparison: Vec<ComparisonBar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<Overview>,
}

/// 逐一處理每個葉類別：有歷史欄位用欄位，否則用模型配適值
///
/// 任何單一圖表失敗只會略過該圖表，不會讓整個儀表板失敗。
pub async fn build_dashboard<S: Storage>(
    engine: &ForecastEngine<S>,
    options: &DashboardOptions,
) -> DashboardSummary {
    tracing::info!("📊 Building dashboard summary");

    let table = match engine.data().get().await {
        Ok(table) => Some(table),
        Err(e) => {
            tracing::warn!("⚠️ Historical data unavailable, using model series only: {}", e);
            None
        }
    };

    let mut summary = DashboardSummary {
        generated_at: Utc::now(),
        trend_panels: Vec::new(),
        rate_panels: Vec::new(),
        area_panels: Vec::new(),
        comparison: Vec::new(),
        distribution: None,
        overview: None,
    };

    for leaf in engine.registry().leaves() {
        let color = leaf.color_or(DEFAULT_PANEL_COLOR).to_string();

        let table_source = match (&leaf.data_column, &table) {
            (Some(column), Some(table)) if table.has_column(column) => {
                Some(TableColumnSource::new(table.clone(), column.as_str()))
            }
            _ => None,
        };
        let model_source = leaf
            .model_ref
            .as_ref()
            .map(|_| ModelFittedSource::new(engine, leaf.name.as_str()));

        let source: &dyn SeriesSource = match (&table_source, &model_source) {
            (Some(source), _) => source,
            (None, Some(source)) => source,
            (None, None) => {
                tracing::debug!("Category '{}' has no series source, skipped", leaf.name);
                continue;
            }
        };

        let raw = match source.raw_series().await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    "⚠️ Skipping panels for '{}' ({}): {}",
                    leaf.name,
                    source.describe(),
                    e
                );
                continue;
            }
        };

        let trend = with_trend(&raw);
        if trend.is_empty() {
            tracing::warn!("⚠️ Trend unavailable for '{}', series too short", leaf.name);
        } else {
            summary.trend_panels.push(TrendPanel {
                category: leaf.name.clone(),
                color: color.clone(),
                points: trend,
            });
        }

        let points: Vec<SeriesPoint> = raw
            .into_iter()
            .filter_map(|(quarter, value)| value.map(|value| SeriesPoint { quarter, value }))
            .collect();

        let last_value = match &table_source {
            Some(source) => source.last_value(),
            None => points.last().map(|p| p.value),
        };
        if let Some(value) = last_value {
            summary.comparison.push(ComparisonBar {
                category: leaf.name.clone(),
                color: color.clone(),
                value,
            });
        }

        if points.is_empty() {
            continue;
        }

        let origin = if source.is_table_backed() {
            SeriesOrigin::Table
        } else {
            SeriesOrigin::Model
        };
        let panel = SeriesPanel {
            category: leaf.name.clone(),
            color,
            origin,
            points,
        };
        if source.is_table_backed() {
            summary.area_panels.push(panel.clone());
        }
        summary.rate_panels.push(panel);
    }

    summary
        .comparison
        .sort_by(|a, b| b.value.total_cmp(&a.value));

    if let Some(table) = &table {
        summary.distribution = distribution(table, &options.distribution_columns, options.histogram_bins);
        summary.overview = overview(table, &options.overview_columns);
    }

    tracing::info!(
        "✅ Dashboard ready: {} trend, {} rate, {} area panels, {} bars",
        summary.trend_panels.len(),
        summary.rate_panels.len(),
        summary.area_panels.len(),
        summary.comparison.len()
    );

    summary
}

/// 等寬直方圖；所有值相同時範圍往兩側各放寬 0.5
pub fn histogram(values: &[f64], bins: usize) -> Option<Vec<HistogramBin>> {
    if bins == 0 {
        return None;
    }
    let (mut min, mut max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;

    if max - min == 0.0 {
        min -= 0.5;
        max += 0.5;
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values.iter().filter(|v| v.is_finite()) {
        let index = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }

    Some(
        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: min + i as f64 * width,
                upper: min + (i + 1) as f64 * width,
                count,
            })
            .collect(),
    )
}

fn distribution(table: &HistoricalTable, columns: &[String], bins: usize) -> Option<Distribution> {
    let present: Vec<String> = columns
        .iter()
        .filter(|c| table.has_column(c))
        .cloned()
        .collect();

    let values: Vec<f64> = present
        .iter()
        .flat_map(|column| (0..table.len()).filter_map(move |row| table.value(row, column)))
        .collect();

    if values.is_empty() {
        tracing::warn!("⚠️ No values for distribution over {:?}", columns);
        return None;
    }

    Some(Distribution {
        columns: present,
        bins: histogram(&values, bins)?,
    })
}

/// 所有欄位都存在時才產生；只保留各欄皆有值的列
fn overview(table: &HistoricalTable, columns: &[String]) -> Option<Overview> {
    if let Some(missing) = columns.iter().find(|c| !table.has_column(c)) {
        tracing::warn!("⚠️ Overview omitted, column '{}' not in historical data", missing);
        return None;
    }

    let labels = match table.labels() {
        Ok(labels) => labels,
        Err(e) => {
            tracing::warn!("⚠️ Overview omitted: {}", e);
            return None;
        }
    };

    let rows = labels
        .into_iter()
        .enumerate()
        .filter_map(|(row, quarter)| {
            let values = columns
                .iter()
                .map(|column| Some((column.clone(), table.value(row, column)?)))
                .collect::<Option<BTreeMap<_, _>>>()?;
            Some(OverviewRow {
                quarter: quarter.to_string(),
                values,
            })
        })
        .collect();

    Some(Overview {
        columns: columns.to_vec(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::period::{Quarter, DEFAULT_LABEL_FALLBACK};
    use crate::core::registry::CategoryRegistry;
    use crate::utils::error::{ForecastError, Result};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MockStorage {
        files: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MockStorage {
        fn with_file(self, path: &str, content: &str) -> Self {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), content.as_bytes().to_vec());
            self
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.files.lock().unwrap().get(path).cloned().ok_or_else(|| {
                ForecastError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    const DATA: &str = "Trimestre,Ensemble,Urbain,Rural\n\
                        2022T1,12.1,16.0,5.0\n\
                        2022T2,11.8,15.8,4.9\n\
                        2022T3,12.4,16.4,5.6\n\
                        2022T4,11.9,15.9,5.3\n\
                        2023T1,12.9,17.1,5.7\n\
                        2023T2,12.4,17.0,\n\
                        2023T3,13.5,16.9,7.0\n\
                        2023T4,13.0,16.8,6.6\n";

    const FEMININ_MODEL: &str = r#"{
        "capability": "plain_forecast",
        "seasonal": {"level": 18.0, "seasonal": [0.0, 0.0, 0.0, 0.0]},
        "fittedvalues": [17.0, 17.5, 18.0, 18.5, 19.0, 19.5]
    }"#;

    fn engine(storage: MockStorage) -> ForecastEngine<MockStorage> {
        ForecastEngine::new(
            Arc::new(storage),
            Arc::new(CategoryRegistry::builtin()),
            "data.csv",
            "Trimestre",
            Quarter::new(2023, 4).unwrap(),
            DEFAULT_LABEL_FALLBACK,
        )
    }

    #[tokio::test]
    async fn test_dashboard_mixes_table_and_model_sources() {
        let storage = MockStorage::default()
            .with_file("data.csv", DATA)
            .with_file("sarima_feminin.json", FEMININ_MODEL);
        let engine = engine(storage);

        let summary = build_dashboard(&engine, &DashboardOptions::default()).await;

        let rate: Vec<(&str, SeriesOrigin)> = summary
            .rate_panels
            .iter()
            .map(|p| (p.category.as_str(), p.origin))
            .collect();
        assert_eq!(
            rate,
            vec![
                ("Ensemble", SeriesOrigin::Table),
                ("Urbain", SeriesOrigin::Table),
                ("Rural", SeriesOrigin::Table),
                ("Féminin", SeriesOrigin::Model),
            ]
        );

        let area: Vec<&str> = summary.area_panels.iter().map(|p| p.category.as_str()).collect();
        assert_eq!(area, vec!["Ensemble", "Urbain", "Rural"]);

        // Rural 在 2023T2 缺值，缺值列與邊緣列都被捨棄
        let rural_trend = summary
            .trend_panels
            .iter()
            .find(|p| p.category == "Rural")
            .unwrap();
        assert!(rural_trend.points.iter().all(|p| p.quarter != "2023T2"));
        let ensemble_trend = summary
            .trend_panels
            .iter()
            .find(|p| p.category == "Ensemble")
            .unwrap();
        assert_eq!(ensemble_trend.points.len(), 5);

        // 模型序列依歷史表前段標籤
        let feminin = summary
            .rate_panels
            .iter()
            .find(|p| p.category == "Féminin")
            .unwrap();
        assert_eq!(feminin.points[0].quarter, "2022T1");
        assert_eq!(feminin.points.len(), 6);
    }

    #[tokio::test]
    async fn test_comparison_bars_sorted_descending() {
        let storage = MockStorage::default()
            .with_file("data.csv", DATA)
            .with_file("sarima_feminin.json", FEMININ_MODEL);
        let summary = build_dashboard(&engine(storage), &DashboardOptions::default()).await;

        let bars: Vec<(&str, f64)> = summary
            .comparison
            .iter()
            .map(|b| (b.category.as_str(), b.value))
            .collect();
        assert_eq!(
            bars,
            vec![
                ("Féminin", 19.5),
                ("Urbain", 16.8),
                ("Ensemble", 13.0),
                ("Rural", 6.6),
            ]
        );
    }

    #[tokio::test]
    async fn test_distribution_and_overview() {
        let storage = MockStorage::default().with_file("data.csv", DATA);
        let summary = build_dashboard(&engine(storage), &DashboardOptions::default()).await;

        let distribution = summary.distribution.unwrap();
        assert_eq!(distribution.bins.len(), DEFAULT_HISTOGRAM_BINS);
        // 8 + 8 + 7 個非缺值
        assert_eq!(distribution.bins.iter().map(|b| b.count).sum::<usize>(), 23);

        let overview = summary.overview.unwrap();
        assert_eq!(overview.rows.len(), 7);
        assert!(overview.rows.iter().all(|r| r.quarter != "2023T2"));

        let options = DashboardOptions {
            overview_columns: vec!["Urbain".to_string(), "Casablanca".to_string()],
            ..DashboardOptions::default()
        };
        let storage = MockStorage::default().with_file("data.csv", DATA);
        let summary = build_dashboard(&engine(storage), &options).await;
        assert!(summary.overview.is_none());
    }

    #[tokio::test]
    async fn test_dashboard_without_any_source_is_empty() {
        let summary =
            build_dashboard(&engine(MockStorage::default()), &DashboardOptions::default()).await;
        assert!(summary.rate_panels.is_empty());
        assert!(summary.comparison.is_empty());
        assert!(summary.distribution.is_none());
        assert!(summary.overview.is_none());
    }

    #[test]
    fn test_histogram_bins() {
        let bins = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4).unwrap();
        assert_eq!(bins.len(), 4);
        assert_eq!(
            bins.iter().map(|b| b.count).collect::<Vec<_>>(),
            vec![1, 1, 1, 2]
        );
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[3].upper, 4.0);

        let degenerate = histogram(&[5.0, 5.0], 2).unwrap();
        assert_eq!(degenerate[0].lower, 4.5);
        assert_eq!(degenerate[1].upper, 5.5);
        assert_eq!(degenerate[1].count, 2);

        assert!(histogram(&[], 20).is_none());
        assert!(histogram(&[1.0], 0).is_none());
    }
}
