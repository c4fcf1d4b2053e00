use crate::core::period::Quarter;
use crate::domain::model::{IntervalForecast, PredictRequest, PredictionOutput};
use crate::domain::ports::{GenericPredictor, IntervalForecaster, PointForecaster};
use crate::utils::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalType {
    #[default]
    Additive,
    Multiplicative,
}

fn default_confidence_level() -> f64 {
    0.95
}

/// 已配適的季節模型狀態 (水準、趨勢、季節因子)
///
/// 只做預測，不做配適；狀態由外部訓練流程匯出。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalState {
    pub level: f64,
    #[serde(default)]
    pub trend: f64,
    pub seasonal: Vec<f64>,
    #[serde(default)]
    pub seasonal_type: SeasonalType,
    /// 最後一筆觀測之後的下一個季節位置
    #[serde(default)]
    pub season_offset: usize,
    /// 殘差標準差，用來計算信賴區間
    #[serde(default)]
    pub residual_std: Option<f64>,
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    /// 訓練資料最後一季，例如 "2023T4"
    #[serde(default)]
    pub last_period: Option<String>,
    /// 樣本內觀測數
    #[serde(default)]
    pub nobs: Option<usize>,
}

impl SeasonalState {
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| ForecastError::DataFormatError { message };

        if self.seasonal.is_empty() {
            return Err(invalid("seasonal factors cannot be empty".to_string()));
        }
        if self.season_offset >= self.seasonal.len() {
            return Err(invalid(format!(
                "season_offset {} out of range for period {}",
                self.season_offset,
                self.seasonal.len()
            )));
        }
        let all_finite = [self.level, self.trend]
            .iter()
            .chain(self.seasonal.iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(invalid("model state contains non-finite values".to_string()));
        }
        if !(0.0..1.0).contains(&self.confidence_level) {
            return Err(invalid(format!(
                "confidence_level {} must be in [0, 1)",
                self.confidence_level
            )));
        }
        Ok(())
    }

    pub fn period(&self) -> usize {
        self.seasonal.len()
    }

    /// 相對最後觀測的第 h 步 (h <= 0 為樣本內位置)
    fn value_at(&self, h: i64) -> f64 {
        let period = self.period() as i64;
        let season_idx = (self.season_offset as i64 + h - 1).rem_euclid(period) as usize;
        let base = self.level + h as f64 * self.trend;
        match self.seasonal_type {
            SeasonalType::Additive => base + self.seasonal[season_idx],
            SeasonalType::Multiplicative => base * self.seasonal[season_idx],
        }
    }

    pub fn point_forecast(&self, steps: usize) -> Result<Vec<f64>> {
        if steps == 0 {
            return Err(ForecastError::prediction("forecast horizon must be at least 1"));
        }
        Ok((1..=steps as i64).map(|h| self.value_at(h)).collect())
    }

    /// 從狀態回推的樣本內序列 (趨勢 + 季節成分)
    pub fn in_sample(&self, start: usize) -> Result<Vec<f64>> {
        let nobs = self.nobs.ok_or_else(|| {
            ForecastError::prediction("model does not record its in-sample size (nobs)")
        })?;
        if start >= nobs {
            return Err(ForecastError::prediction(format!(
                "in-sample start {} is beyond nobs {}",
                start, nobs
            )));
        }
        let last = nobs as i64 - 1;
        Ok((start as i64..=last).map(|t| self.value_at(t - last)).collect())
    }

    fn labels(&self, steps: usize) -> Option<Vec<String>> {
        let last = Quarter::parse(self.last_period.as_deref()?).ok()?;
        Some((1..=steps as i64).map(|h| last.shift(h).label()).collect())
    }

    fn z_score(&self) -> f64 {
        match self.confidence_level {
            x if x >= 0.99 => 2.576,
            x if x >= 0.95 => 1.96,
            x if x >= 0.90 => 1.645,
            x if x >= 0.80 => 1.282,
            _ => 1.96,
        }
    }
}

impl IntervalForecaster for SeasonalState {
    fn get_forecast(&self, steps: usize) -> Result<IntervalForecast> {
        let forecast = self.point_forecast(steps)?;
        let std = self.residual_std.unwrap_or(0.0);
        let z = self.z_score();

        let (lower, upper): (Vec<f64>, Vec<f64>) = forecast
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let margin = z * std * ((i + 1) as f64).sqrt();
                (f - margin, f + margin)
            })
            .unzip();

        let predicted_mean = match self.labels(steps) {
            Some(labels) => PredictionOutput::Labeled(labels.into_iter().zip(forecast).collect()),
            None => PredictionOutput::Indexed(forecast),
        };

        Ok(IntervalForecast {
            predicted_mean,
            lower,
            upper,
            confidence_level: self.confidence_level,
        })
    }
}

impl PointForecaster for SeasonalState {
    fn forecast(&self, steps: usize) -> Result<PredictionOutput> {
        Ok(PredictionOutput::Indexed(self.point_forecast(steps)?))
    }
}

impl GenericPredictor for SeasonalState {
    fn predict(&self, request: PredictRequest) -> Result<PredictionOutput> {
        let values = match request {
            PredictRequest::Ahead(steps) => self.point_forecast(steps)?,
            PredictRequest::InSample => self.in_sample(0)?,
            PredictRequest::InSampleFrom(start) => self.in_sample(start)?,
        };
        Ok(PredictionOutput::Indexed(values))
    }
}

/// 常數模型：任何步數都回傳同一個純量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPredictor {
    pub value: f64,
}

impl GenericPredictor for ConstantPredictor {
    fn predict(&self, request: PredictRequest) -> Result<PredictionOutput> {
        match request {
            PredictRequest::Ahead(_) => Ok(PredictionOutput::Scalar(self.value)),
            _ => Err(ForecastError::prediction(
                "constant model has no in-sample predictions",
            )),
        }
    }
}
