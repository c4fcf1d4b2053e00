use crate::domain::ports::{GenericPredictor, IntervalForecaster, PointForecaster};
use crate::utils::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 類別樹的葉節點，可綁定模型及/或歷史資料欄位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafCategory {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl LeafCategory {
    pub fn color_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.color.as_deref().unwrap_or(default)
    }
}

/// 兩層類別樹：分組節點只含子類別，不綁定模型
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryNode {
    Branch {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<String>,
        subcategories: Vec<LeafCategory>,
    },
    Leaf(LeafCategory),
}

impl CategoryNode {
    pub fn name(&self) -> &str {
        match self {
            CategoryNode::Branch { name, .. } => name,
            CategoryNode::Leaf(leaf) => &leaf.name,
        }
    }

    pub fn subcategories(&self) -> &[LeafCategory] {
        match self {
            CategoryNode::Branch { subcategories, .. } => subcategories,
            CategoryNode::Leaf(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelBinding {
    pub model_ref: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub quarter: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub quarter: String,
    pub value: f64,
    pub trend: f64,
}

/// 歷史資料表的一列
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub quarter: Option<String>,
    pub values: HashMap<String, Option<f64>>,
}

/// 依季度標籤排序的歷史資料表
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalTable {
    pub quarter_column: String,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
    pub sorted: bool,
}

impl HistoricalTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_quarter_column(&self) -> bool {
        self.columns.iter().any(|c| c == &self.quarter_column)
    }

    pub fn has_column(&self, name: &str) -> bool {
        name != self.quarter_column && self.columns.iter().any(|c| c == name)
    }

    pub fn labels(&self) -> Result<Vec<&str>> {
        if !self.has_quarter_column() {
            return Err(self.missing_quarter_column());
        }
        Ok(self
            .rows
            .iter()
            .map(|row| row.quarter.as_deref().unwrap_or_default())
            .collect())
    }

    pub fn last_label(&self) -> Option<&str> {
        self.rows.last().and_then(|row| row.quarter.as_deref())
    }

    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        self.rows
            .get(row)
            .and_then(|r| r.values.get(column).copied().flatten())
    }

    /// 欄位原始值 (含缺值)，與標籤一一對應
    pub fn raw_column(&self, column: &str) -> Result<Vec<(String, Option<f64>)>> {
        if !self.has_quarter_column() {
            return Err(self.missing_quarter_column());
        }
        if !self.has_column(column) {
            return Err(ForecastError::DataFormatError {
                message: format!("column '{}' not found in historical data", column),
            });
        }
        Ok(self
            .rows
            .iter()
            .map(|row| {
                (
                    row.quarter.clone().unwrap_or_default(),
                    row.values.get(column).copied().flatten(),
                )
            })
            .collect())
    }

    /// 去除缺值後的序列
    pub fn column_series(&self, column: &str) -> Result<Vec<SeriesPoint>> {
        Ok(self
            .raw_column(column)?
            .into_iter()
            .filter_map(|(quarter, value)| value.map(|value| SeriesPoint { quarter, value }))
            .collect())
    }

    pub fn last_value(&self, column: &str) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        self.value(self.rows.len() - 1, column)
    }

    fn missing_quarter_column(&self) -> ForecastError {
        ForecastError::DataFormatError {
            message: format!(
                "quarter column '{}' not found in historical data",
                self.quarter_column
            ),
        }
    }
}

/// 模型預測結果的三種形狀
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutput {
    Labeled(Vec<(String, f64)>),
    Indexed(Vec<f64>),
    Scalar(f64),
}

impl PredictionOutput {
    /// 取最後一個值：帶標籤序列依位置、陣列取 -1、純量直接轉換
    pub fn final_value(&self) -> Result<f64> {
        match self {
            PredictionOutput::Labeled(points) => points
                .last()
                .map(|(_, value)| *value)
                .ok_or_else(|| ForecastError::prediction("labeled prediction series is empty")),
            PredictionOutput::Indexed(values) => values
                .last()
                .copied()
                .ok_or_else(|| ForecastError::prediction("prediction array is empty")),
            PredictionOutput::Scalar(value) => Ok(*value),
        }
    }

    pub fn into_values(self) -> Vec<f64> {
        match self {
            PredictionOutput::Labeled(points) => points.into_iter().map(|(_, v)| v).collect(),
            PredictionOutput::Indexed(values) => values,
            PredictionOutput::Scalar(value) => vec![value],
        }
    }
}

/// 含信賴區間的預測
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalForecast {
    pub predicted_mean: PredictionOutput,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictRequest {
    Ahead(usize),
    InSample,
    InSampleFrom(usize),
}

pub enum ModelCapability {
    ForecastWithInterval(Box<dyn IntervalForecaster>),
    PlainForecast(Box<dyn PointForecaster>),
    GenericPredict(Box<dyn GenericPredictor>),
    Unsupported(String),
}

impl ModelCapability {
    pub fn tag(&self) -> &str {
        match self {
            ModelCapability::ForecastWithInterval(_) => "forecast_with_interval",
            ModelCapability::PlainForecast(_) => "plain_forecast",
            ModelCapability::GenericPredict(_) => "generic_predict",
            ModelCapability::Unsupported(tag) => tag,
        }
    }
}

impl fmt::Debug for ModelCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelCapability").field(&self.tag()).finish()
    }
}

/// 模型匯出時附帶的樣本內配適值，不同匯出工具欄位名稱不同
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InSampleFit {
    pub fittedvalues: Option<Vec<f64>>,
    pub fitted_values: Option<Vec<f64>>,
}

#[derive(Debug)]
pub struct ForecastModel {
    pub category: String,
    pub capability: ModelCapability,
    pub fit: InSampleFit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResponse {
    pub success: bool,
    pub category: String,
    pub year: i32,
    pub quarter: String,
    pub quarter_label: String,
    pub steps: usize,
    pub prediction: f64,
}
