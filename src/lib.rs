pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use app::dashboard::{build_dashboard, DashboardOptions, DashboardSummary};
pub use config::cli::LocalStorage;
pub use config::toml_config::ServiceConfig;
#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use crate::core::{CategoryRegistry, ForecastEngine, Quarter};
pub use utils::error::{ForecastError, Result};
