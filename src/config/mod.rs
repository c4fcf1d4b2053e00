pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use args::{CliConfig, Command};

#[cfg(feature = "cli")]
mod args {
    use super::toml_config::{ServiceConfig, DEFAULT_BASE_PATH, DEFAULT_DATA_FILE};
    use crate::core::data_cache::DEFAULT_QUARTER_COLUMN;
    use super::toml_config::MAX_HORIZON_CEILING;
    use crate::core::period::{DEFAULT_LABEL_FALLBACK, DEFAULT_MAX_HORIZON};
    use crate::domain::ports::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{
        validate_extension, validate_non_empty_string, validate_path, validate_range, Validate,
    };
    use clap::{Parser, Subcommand};

    /// 訓練資料最後一季
    const DEFAULT_REFERENCE_PERIOD: (i32, u8) = (2023, 4);

    #[derive(Debug, Clone, Parser)]
    #[command(name = "unemployment-forecast")]
    #[command(about = "Quarterly unemployment-rate forecasts by demographic category")]
    pub struct CliConfig {
        #[arg(long, global = true, help = "TOML service configuration file")]
        pub config: Option<String>,

        #[arg(long, global = true, help = "Directory holding model artifacts and data")]
        pub base_path: Option<String>,

        #[arg(long, global = true, help = "Historical data CSV, relative to base path")]
        pub data_file: Option<String>,

        #[arg(long, global = true, help = "Name of the quarter label column")]
        pub quarter_column: Option<String>,

        #[arg(long, global = true, help = "Maximum number of quarters ahead a forecast may reach")]
        pub max_horizon: Option<usize>,

        #[arg(long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, global = true, help = "Emit logs as JSON")]
        pub json_logs: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// 預測指定類別與季度的失業率
        Forecast {
            #[arg(long)]
            category: String,
            #[arg(long)]
            year: i32,
            #[arg(long, allow_negative_numbers = true)]
            quarter: i64,
        },
        /// 列出完整類別樹
        Categories,
        /// 列出主類別下的子類別
        Subcategories { main: String },
        /// 輸出模型的樣本內配適序列
        Fitted { category: String },
        /// 產生儀表板資料
        Dashboard {
            #[arg(long, help = "Write the summary to this file under the base path")]
            output: Option<String>,
        },
    }

    impl CliConfig {
        /// 命令列參數優先於設定檔
        pub fn apply_overrides(&self, config: &mut ServiceConfig) {
            if let Some(base_path) = &self.base_path {
                config.storage.base_path = base_path.clone();
            }
            if let Some(data_file) = &self.data_file {
                config.storage.data_file = data_file.clone();
            }
            if let Some(quarter_column) = &self.quarter_column {
                config.storage.quarter_column = quarter_column.clone();
            }
            if let Some(max_horizon) = self.max_horizon {
                config.forecast.max_horizon = max_horizon;
            }
            if self.verbose {
                config.logging.verbose = true;
            }
            if self.json_logs {
                config.logging.format = "json".to_string();
            }
        }
    }

    impl ConfigProvider for CliConfig {
        fn base_path(&self) -> &str {
            self.base_path.as_deref().unwrap_or(DEFAULT_BASE_PATH)
        }

        fn data_file(&self) -> &str {
            self.data_file.as_deref().unwrap_or(DEFAULT_DATA_FILE)
        }

        fn quarter_column(&self) -> &str {
            self.quarter_column.as_deref().unwrap_or(DEFAULT_QUARTER_COLUMN)
        }

        fn reference_period(&self) -> (i32, u8) {
            DEFAULT_REFERENCE_PERIOD
        }

        fn label_fallback(&self) -> (i32, u8) {
            (DEFAULT_LABEL_FALLBACK.year, DEFAULT_LABEL_FALLBACK.quarter)
        }

        fn max_horizon(&self) -> usize {
            self.max_horizon.unwrap_or(DEFAULT_MAX_HORIZON)
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_path("base_path", self.base_path())?;
            validate_extension("data_file", self.data_file(), &["csv"])?;
            validate_non_empty_string("quarter_column", self.quarter_column())?;
            validate_range("max_horizon", self.max_horizon(), 1, MAX_HORIZON_CEILING)?;
            Ok(())
        }
    }

}
