use crate::domain::model::{ForecastModel, ModelCapability, PredictRequest};
use crate::utils::error::{ForecastError, Result};

/// 依模型能力標籤呼叫對應的預測介面，並取出最後一步的預測值
///
/// 優先順序：含信賴區間的預測 > 一般預測 > 通用 predict。
/// 季節模型是確定性的，失敗不重試。
#[derive(Debug, Default, Clone, Copy)]
pub struct ForecastInvoker;

impl ForecastInvoker {
    pub fn new() -> Self {
        Self
    }

    pub fn forecast(&self, model: &ForecastModel, steps: usize) -> Result<f64> {
        tracing::debug!(
            "Forecasting {} step(s) for '{}' via {}",
            steps,
            model.category,
            model.capability.tag()
        );

        let outcome = match &model.capability {
            ModelCapability::ForecastWithInterval(forecaster) => forecaster
                .get_forecast(steps)
                .and_then(|result| result.predicted_mean.final_value()),
            ModelCapability::PlainForecast(forecaster) => forecaster
                .forecast(steps)
                .and_then(|output| output.final_value()),
            ModelCapability::GenericPredict(predictor) => predictor
                .predict(PredictRequest::Ahead(steps))
                .and_then(|output| output.final_value()),
            ModelCapability::Unsupported(capability) => {
                return Err(ForecastError::UnsupportedModelInterface {
                    category: model.category.clone(),
                    capability: capability.clone(),
                });
            }
        };

        match outcome {
            Ok(value) if value.is_finite() => Ok(value),
            Ok(value) => Err(ForecastError::prediction(format!(
                "model for '{}' returned a non-finite value ({})",
                model.category, value
            ))),
            Err(e @ ForecastError::PredictionError { .. }) => Err(e),
            Err(e) => Err(ForecastError::prediction(e)),
        }
    }
}
