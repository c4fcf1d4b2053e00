use crate::core::period::{anchor_from_label, synthesize_labels, Quarter};
use crate::domain::model::{
    ForecastModel, HistoricalTable, ModelCapability, PredictRequest, SeriesPoint,
};

/// 從模型取得樣本內配適值的一種方式
pub trait FittedExtraction: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, model: &ForecastModel) -> Option<Vec<f64>>;
}

/// 模型檔的 `fittedvalues` 欄位
pub struct FittedValuesField;

impl FittedExtraction for FittedValuesField {
    fn name(&self) -> &'static str {
        "fittedvalues"
    }

    fn extract(&self, model: &ForecastModel) -> Option<Vec<f64>> {
        model.fit.fittedvalues.clone()
    }
}

/// 部分匯出工具使用的 `fitted_values` 欄位
pub struct AlternateFittedField;

impl FittedExtraction for AlternateFittedField {
    fn name(&self) -> &'static str {
        "fitted_values"
    }

    fn extract(&self, model: &ForecastModel) -> Option<Vec<f64>> {
        model.fit.fitted_values.clone()
    }
}

/// 呼叫通用 predict 做樣本內預測；先不帶參數，再從 0 開始
pub struct InSamplePredict;

impl FittedExtraction for InSamplePredict {
    fn name(&self) -> &'static str {
        "in-sample predict"
    }

    fn extract(&self, model: &ForecastModel) -> Option<Vec<f64>> {
        let ModelCapability::GenericPredict(predictor) = &model.capability else {
            return None;
        };

        [PredictRequest::InSample, PredictRequest::InSampleFrom(0)]
            .into_iter()
            .find_map(|request| match predictor.predict(request) {
                Ok(output) => Some(output.into_values()),
                Err(e) => {
                    tracing::debug!(
                        "In-sample predict {:?} failed for '{}': {}",
                        request,
                        model.category,
                        e
                    );
                    None
                }
            })
    }
}

/// 還原模型的樣本內序列並加上季度標籤
pub struct FittedSeriesReconstructor {
    strategies: Vec<Box<dyn FittedExtraction>>,
    label_fallback: Quarter,
}

impl FittedSeriesReconstructor {
    pub fn new(label_fallback: Quarter) -> Self {
        Self {
            strategies: vec![
                Box::new(FittedValuesField),
                Box::new(AlternateFittedField),
                Box::new(InSamplePredict),
            ],
            label_fallback,
        }
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn FittedExtraction>>,
        label_fallback: Quarter,
    ) -> Self {
        Self {
            strategies,
            label_fallback,
        }
    }

    /// 依序嘗試各策略，第一個非空結果勝出
    pub fn fitted_values(&self, model: &ForecastModel) -> Option<Vec<f64>> {
        self.strategies.iter().find_map(|strategy| {
            let values = strategy.extract(model).filter(|v| !v.is_empty())?;
            tracing::debug!(
                "Fitted values for '{}' taken from {} ({} points)",
                model.category,
                strategy.name(),
                values.len()
            );
            Some(values)
        })
    }

    /// 序列不長於歷史表時沿用表的前段標籤，否則從最後已知標籤往回合成
    pub fn label(&self, values: Vec<f64>, table: Option<&HistoricalTable>) -> Vec<SeriesPoint> {
        let n = values.len();
        let table_labels = table
            .filter(|t| n <= t.len())
            .and_then(|t| t.labels().ok())
            .filter(|labels| labels.iter().take(n).all(|l| !l.is_empty()));

        let labels: Vec<String> = match table_labels {
            Some(labels) => labels.into_iter().take(n).map(str::to_string).collect(),
            None => {
                let anchor = anchor_from_label(table.and_then(|t| t.last_label()), self.label_fallback);
                synthesize_labels(anchor, n)
            }
        };

        labels
            .into_iter()
            .zip(values)
            .map(|(quarter, value)| SeriesPoint { quarter, value })
            .collect()
    }

    pub fn reconstruct(
        &self,
        model: &ForecastModel,
        table: Option<&HistoricalTable>,
    ) -> Option<Vec<SeriesPoint>> {
        let values = self.fitted_values(model)?;
        let series: Vec<SeriesPoint> = self
            .label(values, table)
            .into_iter()
            .filter(|p| p.value.is_finite())
            .collect();
        (!series.is_empty()).then_some(series)
    }
}
