use crate::core::data_cache::DataCache;
use crate::core::fitted::FittedSeriesReconstructor;
use crate::core::forecast::ForecastInvoker;
use crate::core::model_cache::ModelCache;
use crate::core::period::{quarters_ahead, Quarter, DEFAULT_MAX_HORIZON};
use crate::core::registry::CategoryRegistry;
use crate::domain::model::{CategoryNode, ForecastResponse, ModelBinding, SeriesPoint};
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::{ForecastError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// 預測引擎：類別解析、快取與預測呼叫的組合點
pub struct ForecastEngine<S: Storage> {
    registry: Arc<CategoryRegistry>,
    models: ModelCache<S>,
    data: DataCache<S>,
    invoker: ForecastInvoker,
    reconstructor: FittedSeriesReconstructor,
    reference: Quarter,
    max_horizon: usize,
}

impl<S: Storage> ForecastEngine<S> {
    pub fn new(
        storage: Arc<S>,
        registry: Arc<CategoryRegistry>,
        data_file: impl Into<String>,
        quarter_column: impl Into<String>,
        reference: Quarter,
        label_fallback: Quarter,
    ) -> Self {
        Self {
            models: ModelCache::new(storage.clone(), registry.clone()),
            data: DataCache::new(storage, data_file, quarter_column),
            registry,
            invoker: ForecastInvoker::new(),
            reconstructor: FittedSeriesReconstructor::new(label_fallback),
            reference,
            max_horizon: DEFAULT_MAX_HORIZON,
        }
    }

    pub fn with_max_horizon(mut self, max_horizon: usize) -> Self {
        self.max_horizon = max_horizon;
        self
    }

    pub fn from_config(
        storage: Arc<S>,
        registry: Arc<CategoryRegistry>,
        config: &impl ConfigProvider,
    ) -> Result<Self> {
        let (ref_year, ref_quarter) = config.reference_period();
        let (fallback_year, fallback_quarter) = config.label_fallback();
        let reference = Quarter::new(ref_year, ref_quarter as i64)?;
        let label_fallback = Quarter::new(fallback_year, fallback_quarter as i64)?;

        tracing::info!(
            "🚀 Forecast engine ready: {} targets, reference period {}, horizon up to {} quarters",
            registry.flatten().len(),
            reference,
            config.max_horizon()
        );
        tracing::debug!(
            "Data source {} (quarter column '{}'), label fallback {}",
            Path::new(config.base_path()).join(config.data_file()).display(),
            config.quarter_column(),
            label_fallback
        );

        Ok(Self::new(
            storage,
            registry,
            config.data_file(),
            config.quarter_column(),
            reference,
            label_fallback,
        )
        .with_max_horizon(config.max_horizon()))
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn models(&self) -> &ModelCache<S> {
        &self.models
    }

    pub fn data(&self) -> &DataCache<S> {
        &self.data
    }

    pub fn reference(&self) -> Quarter {
        self.reference
    }

    pub fn max_horizon(&self) -> usize {
        self.max_horizon
    }

    /// 預測指定類別在 (year, quarter) 的失業率
    ///
    /// 驗證 (類別、季度、步數與上限) 先於模型載入。
    pub async fn forecast_request(
        &self,
        category: &str,
        year: i32,
        quarter: i64,
    ) -> Result<ForecastResponse> {
        self.registry.binding(category)?;
        let target = Quarter::new(year, quarter)?;
        let steps = quarters_ahead(
            target.year,
            target.quarter,
            self.reference.year,
            self.reference.quarter,
        )?;
        if steps > self.max_horizon {
            return Err(ForecastError::InvalidHorizon {
                requested: target.label(),
                reference: self.reference.label(),
                reason: format!(
                    "is {} quarters ahead, limit is {}",
                    steps, self.max_horizon
                ),
            });
        }

        let model = self.models.get(category).await?;
        let value = self.invoker.forecast(&model, steps)?;
        let prediction = (value * 100.0).round() / 100.0;

        tracing::info!(
            "✅ Forecast for '{}' at {}: {} ({} step(s) ahead)",
            category,
            target,
            prediction,
            steps
        );

        Ok(ForecastResponse {
            success: true,
            category: category.to_string(),
            year: target.year,
            quarter: target.short_label(),
            quarter_label: target.label(),
            steps,
            prediction,
        })
    }

    pub fn category_hierarchy(&self) -> &[CategoryNode] {
        self.registry.hierarchy()
    }

    pub fn subcategories_of(&self, main_category: &str) -> Result<BTreeMap<String, ModelBinding>> {
        self.registry.subcategories_of(main_category)
    }

    /// 模型的樣本內序列；任何失敗都只記錄並回傳 `None`
    pub async fn fitted_series(&self, category: &str) -> Option<Vec<SeriesPoint>> {
        let model = match self.models.get(category).await {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!("⚠️ No fitted series for '{}': {}", category, e);
                return None;
            }
        };

        let table = match self.data.get().await {
            Ok(table) => Some(table),
            Err(e) => {
                tracing::warn!(
                    "⚠️ Historical data unavailable, labels for '{}' will be synthesized: {}",
                    category,
                    e
                );
                None
            }
        };

        let series = self.reconstructor.reconstruct(&model, table.as_deref());
        if series.is_none() {
            tracing::warn!(
                "⚠️ Model for '{}' exposes no in-sample values ({})",
                category,
                model.capability.tag()
            );
        }
        series
    }
}
