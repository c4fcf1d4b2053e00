use crate::app::models::seasonal::{ConstantPredictor, SeasonalState};
use crate::domain::model::{ForecastModel, InSampleFit, ModelCapability};
use crate::domain::ports::ModelDecoder;
use crate::utils::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// 序列化的模型檔 (JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub capability: String,
    #[serde(default)]
    pub seasonal: Option<SeasonalState>,
    #[serde(default)]
    pub constant: Option<f64>,
    #[serde(default)]
    pub fittedvalues: Option<Vec<f64>>,
    #[serde(default)]
    pub fitted_values: Option<Vec<f64>>,
}

impl ModelArtifact {
    pub fn into_model(self, category: &str) -> Result<ForecastModel> {
        let load_error = |message: String| ForecastError::ModelLoadError {
            category: category.to_string(),
            message,
        };

        if let Some(state) = &self.seasonal {
            state.validate().map_err(|e| load_error(e.to_string()))?;
        }

        let require_state = |seasonal: Option<SeasonalState>| {
            seasonal.ok_or_else(|| {
                load_error(format!(
                    "capability '{}' requires a 'seasonal' state",
                    self.capability
                ))
            })
        };

        let capability = match self.capability.as_str() {
            "forecast_with_interval" => {
                ModelCapability::ForecastWithInterval(Box::new(require_state(self.seasonal)?))
            }
            "plain_forecast" => ModelCapability::PlainForecast(Box::new(require_state(self.seasonal)?)),
            "generic_predict" => match (self.seasonal, self.constant) {
                (Some(state), _) => ModelCapability::GenericPredict(Box::new(state)),
                (None, Some(value)) if value.is_finite() => {
                    ModelCapability::GenericPredict(Box::new(ConstantPredictor { value }))
                }
                _ => {
                    return Err(load_error(
                        "generic_predict requires a 'seasonal' state or a finite 'constant'"
                            .to_string(),
                    ))
                }
            },
            other => {
                tracing::warn!(
                    "⚠️ Model for '{}' declares unknown capability '{}'",
                    category,
                    other
                );
                ModelCapability::Unsupported(other.to_string())
            }
        };

        Ok(ForecastModel {
            category: category.to_string(),
            capability,
            fit: InSampleFit {
                fittedvalues: self.fittedvalues,
                fitted_values: self.fitted_values,
            },
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonArtifactDecoder;

impl ModelDecoder for JsonArtifactDecoder {
    fn decode(&self, category: &str, bytes: &[u8]) -> Result<ForecastModel> {
        let artifact: ModelArtifact =
            serde_json::from_slice(bytes).map_err(|e| ForecastError::ModelLoadError {
                category: category.to_string(),
                message: format!("invalid model artifact: {}", e),
            })?;
        artifact.into_model(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<ForecastModel> {
        JsonArtifactDecoder.decode("Ensemble", json.as_bytes())
    }

    #[test]
    fn test_decodes_each_capability() {
        let state = r#"{"level": 10.0, "seasonal": [0.0, 0.0, 0.0, 0.0]}"#;

        let interval = decode(&format!(
            r#"{{"capability": "forecast_with_interval", "seasonal": {}}}"#,
            state
        ))
        .unwrap();
        assert_eq!(interval.capability.tag(), "forecast_with_interval");

        let plain = decode(&format!(
            r#"{{"capability": "plain_forecast", "seasonal": {}, "fittedvalues": [1.0, 2.0]}}"#,
            state
        ))
        .unwrap();
        assert_eq!(plain.capability.tag(), "plain_forecast");
        assert_eq!(plain.fit.fittedvalues, Some(vec![1.0, 2.0]));
        assert_eq!(plain.fit.fitted_values, None);

        let generic = decode(r#"{"capability": "generic_predict", "constant": 7.5}"#).unwrap();
        assert_eq!(generic.capability.tag(), "generic_predict");
    }

    #[test]
    fn test_unknown_capability_is_unsupported_not_an_error() {
        let model = decode(r#"{"capability": "lstm"}"#).unwrap();
        assert!(matches!(model.capability, ModelCapability::Unsupported(ref c) if c == "lstm"));
    }

    #[test]
    fn test_missing_state_is_a_load_error() {
        assert!(matches!(
            decode(r#"{"capability": "plain_forecast"}"#),
            Err(ForecastError::ModelLoadError { .. })
        ));
        assert!(matches!(
            decode(r#"{"capability": "generic_predict"}"#),
            Err(ForecastError::ModelLoadError { .. })
        ));
    }

    #[test]
    fn test_invalid_state_is_a_load_error() {
        let err = decode(r#"{"capability": "plain_forecast", "seasonal": {"level": 1.0, "seasonal": []}}"#)
            .unwrap_err();
        assert!(matches!(err, ForecastError::ModelLoadError { .. }));
        assert!(decode("{not json").is_err());
    }
}
