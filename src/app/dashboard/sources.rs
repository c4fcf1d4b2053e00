use crate::core::engine::ForecastEngine;
use crate::domain::model::HistoricalTable;
use crate::domain::ports::{SeriesSource, Storage};
use crate::utils::error::{ForecastError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// 歷史表中的單一欄位
pub struct TableColumnSource {
    table: Arc<HistoricalTable>,
    column: String,
}

impl TableColumnSource {
    pub fn new(table: Arc<HistoricalTable>, column: impl Into<String>) -> Self {
        Self {
            table,
            column: column.into(),
        }
    }

    pub fn last_value(&self) -> Option<f64> {
        self.table.last_value(&self.column)
    }
}

#[async_trait]
impl SeriesSource for TableColumnSource {
    fn describe(&self) -> String {
        format!("table column '{}'", self.column)
    }

    fn is_table_backed(&self) -> bool {
        true
    }

    async fn raw_series(&self) -> Result<Vec<(String, Option<f64>)>> {
        self.table.raw_column(&self.column)
    }
}

/// 沒有歷史欄位的類別改用模型的樣本內配適值
pub struct ModelFittedSource<'a, S: Storage> {
    engine: &'a ForecastEngine<S>,
    category: String,
}

impl<'a, S: Storage> ModelFittedSource<'a, S> {
    pub fn new(engine: &'a ForecastEngine<S>, category: impl Into<String>) -> Self {
        Self {
            engine,
            category: category.into(),
        }
    }
}

#[async_trait]
impl<'a, S: Storage> SeriesSource for ModelFittedSource<'a, S> {
    fn describe(&self) -> String {
        format!("fitted values of '{}'", self.category)
    }

    fn is_table_backed(&self) -> bool {
        false
    }

    async fn raw_series(&self) -> Result<Vec<(String, Option<f64>)>> {
        let series = self
            .engine
            .fitted_series(&self.category)
            .await
            .ok_or_else(|| ForecastError::DataFormatError {
                message: format!("no in-sample values available for '{}'", self.category),
            })?;

        Ok(series
            .into_iter()
            .map(|point| (point.quarter, Some(point.value)))
            .collect())
    }
}
