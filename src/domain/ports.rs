use crate::domain::model::{ForecastModel, IntervalForecast, PredictRequest, PredictionOutput};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 模型與歷史資料的位元組來源
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn base_path(&self) -> &str;
    fn data_file(&self) -> &str;
    fn quarter_column(&self) -> &str;
    /// 訓練資料最後一季 (year, quarter)
    fn reference_period(&self) -> (i32, u8);
    /// 歷史標籤無法解析時使用的起點
    fn label_fallback(&self) -> (i32, u8);
    /// 預測步數上限
    fn max_horizon(&self) -> usize {
        crate::core::period::DEFAULT_MAX_HORIZON
    }
}

pub trait IntervalForecaster: Send + Sync {
    fn get_forecast(&self, steps: usize) -> Result<IntervalForecast>;
}

pub trait PointForecaster: Send + Sync {
    fn forecast(&self, steps: usize) -> Result<PredictionOutput>;
}

pub trait GenericPredictor: Send + Sync {
    fn predict(&self, request: PredictRequest) -> Result<PredictionOutput>;
}

pub trait ModelDecoder: Send + Sync {
    fn decode(&self, category: &str, bytes: &[u8]) -> Result<ForecastModel>;
}

/// 儀表板單一類別的序列來源 (歷史表欄位或模型配適值)
#[async_trait]
pub trait SeriesSource: Send + Sync {
    fn describe(&self) -> String;

    fn is_table_backed(&self) -> bool;

    /// 含缺值的原始序列，趨勢計算需要保留原始位置
    async fn raw_series(&self) -> Result<Vec<(String, Option<f64>)>>;
}
