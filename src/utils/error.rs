use serde::Serialize;
use thiserror::Error;

/// 預測模型必須提供的能力提示
pub const MODEL_CAPABILITY_HINT: &str =
    "The model must provide one of: forecast-with-interval, plain forecast, or generic predict";

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Category '{name}' not found")]
    UnknownCategory { name: String },

    #[error("Requested period ({requested}) {reason}")]
    InvalidHorizon {
        requested: String,
        reference: String,
        reason: String,
    },

    #[error("Quarter must be between 1 and 4 (got {quarter})")]
    InvalidQuarter { quarter: i64 },

    #[error("Invalid quarter label '{label}': expected format YYYYTq")]
    InvalidQuarterLabel { label: String },

    #[error("Model '{path}' not found for category '{category}'")]
    ModelArtifactMissing { category: String, path: String },

    #[error("Data source '{path}' not found")]
    DataSourceMissing { path: String },

    #[error("Failed to load model for '{category}': {message}")]
    ModelLoadError { category: String, message: String },

    #[error("Data format error: {message}")]
    DataFormatError { message: String },

    #[error("Model for '{category}' exposes no supported prediction interface ({capability})")]
    UnsupportedModelInterface { category: String, capability: String },

    #[error("Prediction failed: {message}")]
    PredictionError { message: String, hint: String },

    #[error("Invalid category hierarchy: {message}")]
    RegistryError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },
}

/// 呼叫端可以機器判讀的錯誤種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    UnknownCategory,
    InvalidHorizon,
    InvalidQuarter,
    ModelArtifactMissing,
    DataSourceMissing,
    ModelLoadError,
    DataFormatError,
    UnsupportedModelInterface,
    PredictionError,
    RegistryError,
    ConfigError,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Deployment,
    Model,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// 對外輸出的錯誤內容
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ForecastError {
    pub fn prediction(cause: impl std::fmt::Display) -> Self {
        ForecastError::PredictionError {
            message: cause.to_string(),
            hint: MODEL_CAPABILITY_HINT.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ForecastError::UnknownCategory { .. } => ErrorKind::UnknownCategory,
            ForecastError::InvalidHorizon { .. } => ErrorKind::InvalidHorizon,
            ForecastError::InvalidQuarter { .. } => ErrorKind::InvalidQuarter,
            ForecastError::InvalidQuarterLabel { .. } | ForecastError::DataFormatError { .. } => {
                ErrorKind::DataFormatError
            }
            ForecastError::ModelArtifactMissing { .. } => ErrorKind::ModelArtifactMissing,
            ForecastError::DataSourceMissing { .. } => ErrorKind::DataSourceMissing,
            ForecastError::ModelLoadError { .. } => ErrorKind::ModelLoadError,
            ForecastError::UnsupportedModelInterface { .. } => {
                ErrorKind::UnsupportedModelInterface
            }
            ForecastError::PredictionError { .. } => ErrorKind::PredictionError,
            ForecastError::RegistryError { .. } => ErrorKind::RegistryError,
            ForecastError::IoError(_) | ForecastError::SerializationError(_) => ErrorKind::Io,
            ForecastError::ConfigError { .. }
            | ForecastError::ConfigValidationError { .. }
            | ForecastError::InvalidConfigValueError { .. }
            | ForecastError::MissingConfigError { .. } => ErrorKind::ConfigError,
        }
    }

    /// HTTP 對應的狀態碼 (400 使用者輸入, 404 部署缺檔, 500 其他)
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::UnknownCategory | ErrorKind::InvalidHorizon | ErrorKind::InvalidQuarter => {
                400
            }
            ErrorKind::ModelArtifactMissing | ErrorKind::DataSourceMissing => 404,
            _ => 500,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            ForecastError::PredictionError { hint, .. } => Some(hint),
            ForecastError::UnsupportedModelInterface { .. } => Some(MODEL_CAPABILITY_HINT),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.kind() {
            ErrorKind::UnknownCategory | ErrorKind::InvalidHorizon | ErrorKind::InvalidQuarter => {
                ErrorCategory::Input
            }
            ErrorKind::ModelArtifactMissing | ErrorKind::DataSourceMissing => {
                ErrorCategory::Deployment
            }
            ErrorKind::ModelLoadError
            | ErrorKind::DataFormatError
            | ErrorKind::UnsupportedModelInterface
            | ErrorKind::PredictionError => ErrorCategory::Model,
            ErrorKind::RegistryError | ErrorKind::ConfigError => ErrorCategory::Configuration,
            ErrorKind::Io => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Deployment => ErrorSeverity::Medium,
            ErrorCategory::Model | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ForecastError::UnknownCategory { .. } => {
                "Use one of the categories listed by the `categories` command".to_string()
            }
            ForecastError::InvalidHorizon { reference, .. } => {
                format!(
                    "Request a quarter strictly after {} and within the forecast horizon",
                    reference
                )
            }
            ForecastError::InvalidQuarter { .. } => "Use a quarter between 1 and 4".to_string(),
            ForecastError::ModelArtifactMissing { path, .. } => {
                format!("Deploy the model artifact '{}' under the storage base path", path)
            }
            ForecastError::DataSourceMissing { path } => {
                format!("Deploy the historical data file '{}'", path)
            }
            ForecastError::ModelLoadError { .. } => {
                "Re-export the model artifact in the supported JSON format".to_string()
            }
            ForecastError::InvalidQuarterLabel { .. } | ForecastError::DataFormatError { .. } => {
                "Check the historical CSV header and quarter labels (YYYYTq)".to_string()
            }
            ForecastError::UnsupportedModelInterface { .. }
            | ForecastError::PredictionError { .. } => MODEL_CAPABILITY_HINT.to_string(),
            ForecastError::RegistryError { .. } => {
                "Fix the [[categories]] section of the configuration".to_string()
            }
            ForecastError::ConfigError { .. }
            | ForecastError::ConfigValidationError { .. }
            | ForecastError::InvalidConfigValueError { .. }
            | ForecastError::MissingConfigError { .. } => {
                "Check the configuration file and command line flags".to_string()
            }
            ForecastError::IoError(_) | ForecastError::SerializationError(_) => {
                "Check file permissions and available disk space".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Invalid request: {}", self),
            ErrorCategory::Deployment => format!("Missing artifact: {}", self),
            ErrorCategory::Model => format!("Model failure: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            error: self.to_string(),
            hint: self.hint().map(str::to_string),
        }
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_map_to_400() {
        let err = ForecastError::UnknownCategory {
            name: "NoSuchCategory".to_string(),
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.severity(), ErrorSeverity::Low);

        let err = ForecastError::InvalidHorizon {
            requested: "2023T4".to_string(),
            reference: "2023T4".to_string(),
            reason: "must be after 2023T4".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidHorizon);
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_missing_artifacts_map_to_404() {
        let err = ForecastError::ModelArtifactMissing {
            category: "Rural".to_string(),
            path: "sarima_rural.json".to_string(),
        };
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.category(), ErrorCategory::Deployment);
    }

    #[test]
    fn test_prediction_error_payload_carries_hint() {
        let err = ForecastError::prediction("series is empty");
        let payload = err.to_payload();
        assert_eq!(payload.kind, ErrorKind::PredictionError);
        assert_eq!(payload.hint.as_deref(), Some(MODEL_CAPABILITY_HINT));
        assert_eq!(err.status_code(), 500);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "PredictionError");
    }

    #[test]
    fn test_payload_without_hint_omits_field() {
        let err = ForecastError::DataSourceMissing {
            path: "data.csv".to_string(),
        };
        let json = serde_json::to_value(err.to_payload()).unwrap();
        assert!(json.get("hint").is_none());
    }
}
