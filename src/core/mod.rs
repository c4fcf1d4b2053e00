pub mod data_cache;
pub mod engine;
pub mod fitted;
pub mod forecast;
pub mod model_cache;
pub mod period;
pub mod registry;
pub mod trend;

pub use crate::domain::model::{ForecastResponse, HistoricalTable, SeriesPoint, TrendPoint};
pub use crate::domain::ports::{ConfigProvider, SeriesSource, Storage};
pub use crate::utils::error::Result;
pub use data_cache::DataCache;
pub use engine::ForecastEngine;
pub use model_cache::ModelCache;
pub use period::Quarter;
pub use registry::CategoryRegistry;
