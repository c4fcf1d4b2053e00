use crate::app::dashboard::DashboardOptions;
use crate::core::data_cache::DEFAULT_QUARTER_COLUMN;
use crate::core::period::{Quarter, DEFAULT_LABEL_FALLBACK, DEFAULT_MAX_HORIZON};
use crate::core::registry::{CategoryDefinition, CategoryRegistry};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ForecastError, Result};
use crate::utils::validation::{
    validate_extension, validate_non_empty_string, validate_path, validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BASE_PATH: &str = "./models";
pub const DEFAULT_DATA_FILE: &str = "unemployment_data.csv";

/// `max_horizon` 可設定的最大值
pub const MAX_HORIZON_CEILING: usize = 4000;

const LOG_FORMATS: [&str; 2] = ["compact", "json"];

/// 服務設定檔；所有區段皆可省略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub service: ServiceSection,
    pub storage: StorageConfig,
    pub forecast: ForecastConfig,
    pub labels: LabelConfig,
    pub dashboard: DashboardOptions,
    pub logging: LoggingConfig,
    pub categories: Vec<CategoryDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub name: String,
    pub description: Option<String>,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: "unemployment-forecast".to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub base_path: String,
    pub data_file: String,
    pub quarter_column: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            data_file: DEFAULT_DATA_FILE.to_string(),
            quarter_column: DEFAULT_QUARTER_COLUMN.to_string(),
        }
    }
}

/// 訓練資料最後一季，預測步數由此起算
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub reference_year: i32,
    pub reference_quarter: u8,
    pub max_horizon: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            reference_year: 2023,
            reference_quarter: 4,
            max_horizon: DEFAULT_MAX_HORIZON,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// 歷史標籤無法解析時的合成起點
    pub fallback: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            fallback: DEFAULT_LABEL_FALLBACK.label(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbose: bool,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            format: "compact".to_string(),
        }
    }
}

impl ServiceConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ForecastError::MissingConfigError {
                field: path.as_ref().display().to_string(),
            },
            _ => ForecastError::ConfigError {
                message: format!("cannot read {}: {}", path.as_ref().display(), e),
            },
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ForecastError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MODEL_DIR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ForecastError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 設定檔沒有 [[categories]] 時使用內建類別樹
    pub fn registry(&self) -> Result<CategoryRegistry> {
        if self.categories.is_empty() {
            Ok(CategoryRegistry::builtin())
        } else {
            CategoryRegistry::from_definitions(&self.categories)
        }
    }

    pub fn label_fallback_quarter(&self) -> Result<Quarter> {
        Quarter::parse(&self.labels.fallback).map_err(|_| ForecastError::InvalidConfigValueError {
            field: "labels.fallback".to_string(),
            value: self.labels.fallback.clone(),
            reason: "Expected a quarter label such as 2023T4".to_string(),
        })
    }

    pub fn json_logs(&self) -> bool {
        self.logging.format == "json"
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_path("storage.base_path", &self.storage.base_path)?;
        validate_extension("storage.data_file", &self.storage.data_file, &["csv"])?;
        validate_non_empty_string("storage.quarter_column", &self.storage.quarter_column)?;
        validate_range("forecast.reference_quarter", self.forecast.reference_quarter, 1, 4)?;
        validate_range("forecast.max_horizon", self.forecast.max_horizon, 1, MAX_HORIZON_CEILING)?;
        self.label_fallback_quarter()?;
        validate_range("dashboard.histogram_bins", self.dashboard.histogram_bins, 1, 200)?;

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ForecastError::InvalidConfigValueError {
                field: "logging.format".to_string(),
                value: self.logging.format.clone(),
                reason: format!("Valid formats: {}", LOG_FORMATS.join(", ")),
            });
        }

        self.registry()?;
        Ok(())
    }
}

impl ConfigProvider for ServiceConfig {
    fn base_path(&self) -> &str {
        &self.storage.base_path
    }

    fn data_file(&self) -> &str {
        &self.storage.data_file
    }

    fn quarter_column(&self) -> &str {
        &self.storage.quarter_column
    }

    fn reference_period(&self) -> (i32, u8) {
        (self.forecast.reference_year, self.forecast.reference_quarter)
    }

    fn label_fallback(&self) -> (i32, u8) {
        let fallback = self.label_fallback_quarter().unwrap_or(DEFAULT_LABEL_FALLBACK);
        (fallback.year, fallback.quarter)
    }

    fn max_horizon(&self) -> usize {
        self.forecast.max_horizon
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ServiceConfig::from_toml_str("").unwrap();

        assert_eq!(config.base_path(), DEFAULT_BASE_PATH);
        assert_eq!(config.quarter_column(), "Trimestre");
        assert_eq!(config.reference_period(), (2023, 4));
        assert_eq!(config.label_fallback(), (2023, 4));
        assert_eq!(config.max_horizon(), DEFAULT_MAX_HORIZON);
        assert_eq!(config.dashboard, DashboardOptions::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.registry().unwrap().flatten().len(), 12);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r##"
[service]
name = "chomage"

[storage]
base_path = "/srv/models"
data_file = "chomage.csv"
quarter_column = "Periode"

[forecast]
reference_year = 2024
reference_quarter = 2
max_horizon = 80

[labels]
fallback = "2024T2"

[dashboard]
histogram_bins = 10
overview_columns = ["Ensemble"]

[logging]
format = "json"

[[categories]]
name = "Ensemble"
model = "total.json"
data_column = "Ensemble"

[[categories]]
name = "Milieu"
subcategories = [
    { name = "Urbain", model = "urbain.json", color = "#0066CC" },
]
"##;

        let config = ServiceConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.service.name, "chomage");
        assert_eq!(config.data_file(), "chomage.csv");
        assert_eq!(config.reference_period(), (2024, 2));
        assert_eq!(config.max_horizon(), 80);
        assert_eq!(config.label_fallback(), (2024, 2));
        assert_eq!(config.dashboard.histogram_bins, 10);
        assert_eq!(config.dashboard.distribution_columns.len(), 3);
        assert!(config.json_logs());

        let registry = config.registry().unwrap();
        assert_eq!(registry.binding("Urbain").unwrap().model_ref, "urbain.json");
        assert!(registry.binding("Rural").is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_FORECAST_MODEL_DIR", "/opt/models");

        let toml_content = r#"
[storage]
base_path = "${TEST_FORECAST_MODEL_DIR}"
data_file = "${TEST_FORECAST_UNSET_VAR}.csv"
"#;

        let config = ServiceConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.storage.base_path, "/opt/models");
        assert_eq!(config.storage.data_file, "${TEST_FORECAST_UNSET_VAR}.csv");

        std::env::remove_var("TEST_FORECAST_MODEL_DIR");
    }

    #[test]
    fn test_config_validation() {
        let bad_quarter = ServiceConfig::from_toml_str("[forecast]\nreference_quarter = 5\n").unwrap();
        assert!(bad_quarter.validate().is_err());

        let no_horizon = ServiceConfig::from_toml_str("[forecast]\nmax_horizon = 0\n").unwrap();
        assert!(matches!(
            no_horizon.validate(),
            Err(ForecastError::InvalidConfigValueError { .. })
        ));

        let bad_label = ServiceConfig::from_toml_str("[labels]\nfallback = \"Q4-2023\"\n").unwrap();
        assert!(matches!(
            bad_label.validate(),
            Err(ForecastError::InvalidConfigValueError { .. })
        ));
        assert_eq!(bad_label.label_fallback(), (2023, 4));

        let bad_format = ServiceConfig::from_toml_str("[logging]\nformat = \"xml\"\n").unwrap();
        assert!(bad_format.validate().is_err());

        let bad_tree = ServiceConfig::from_toml_str(
            r#"
[[categories]]
name = "Milieu"
model = "milieu.json"
subcategories = [{ name = "Urbain", model = "urbain.json" }]
"#,
        )
        .unwrap();
        assert!(matches!(
            bad_tree.validate(),
            Err(ForecastError::RegistryError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[storage]\nbase_path = \"./fixtures\"\n")
            .unwrap();

        let config = ServiceConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.base_path(), "./fixtures");

        assert!(matches!(
            ServiceConfig::from_file("/nonexistent/forecast.toml"),
            Err(ForecastError::MissingConfigError { .. })
        ));
    }
}
