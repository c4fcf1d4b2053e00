use crate::utils::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 歷史標籤無法解析時的預設起點 (訓練資料截止季)
pub const DEFAULT_LABEL_FALLBACK: Quarter = Quarter {
    year: 2023,
    quarter: 4,
};

/// 單次預測最多往前的季數 (100 年)
pub const DEFAULT_MAX_HORIZON: usize = 400;

/// 日曆季度，標籤格式為 `{year}T{quarter}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quarter {
    pub year: i32,
    pub quarter: u8,
}

impl Quarter {
    pub fn new(year: i32, quarter: i64) -> Result<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(ForecastError::InvalidQuarter { quarter });
        }
        Ok(Self {
            year,
            quarter: quarter as u8,
        })
    }

    /// 線性季度序號 (year * 4 + quarter - 1)
    pub fn index(&self) -> i64 {
        self.year as i64 * 4 + (self.quarter as i64 - 1)
    }

    pub fn from_index(index: i64) -> Self {
        Self {
            year: index.div_euclid(4) as i32,
            quarter: (index.rem_euclid(4) + 1) as u8,
        }
    }

    pub fn shift(&self, quarters: i64) -> Self {
        Self::from_index(self.index() + quarters)
    }

    pub fn label(&self) -> String {
        self.to_string()
    }

    pub fn short_label(&self) -> String {
        format!("T{}", self.quarter)
    }

    pub fn parse(label: &str) -> Result<Self> {
        let invalid = || ForecastError::InvalidQuarterLabel {
            label: label.to_string(),
        };
        let (year, quarter) = label.trim().split_once('T').ok_or_else(invalid)?;
        if year.len() != 4 || quarter.len() != 1 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let quarter: i64 = quarter.parse().map_err(|_| invalid())?;
        Self::new(year, quarter).map_err(|_| invalid())
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", self.year, self.quarter)
    }
}

impl FromStr for Quarter {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// 從參考季 (訓練截止) 到目標季需要預測的步數，必須嚴格為正
pub fn quarters_ahead(
    year: i32,
    quarter: u8,
    reference_year: i32,
    reference_quarter: u8,
) -> Result<usize> {
    let ahead = (year as i64 - reference_year as i64) * 4
        + (quarter as i64 - reference_quarter as i64);

    if ahead <= 0 {
        let reference = format!("T{} {}", reference_quarter, reference_year);
        return Err(ForecastError::InvalidHorizon {
            requested: format!("T{} {}", quarter, year),
            reason: format!("must be after {}", reference),
            reference,
        });
    }

    Ok(ahead as usize)
}

/// 第 `index` 個點 (共 `total` 點，最後一點對齊 `base`) 的季度標籤
pub fn label_for(base: Quarter, index: usize, total: usize) -> String {
    let back = total as i64 - index as i64 - 1;
    base.shift(-back).label()
}

pub fn synthesize_labels(base: Quarter, total: usize) -> Vec<String> {
    (0..total).map(|i| label_for(base, i, total)).collect()
}

/// 解析最後已知標籤；格式不符時改用設定的起點
///
/// 這是已知的脆弱點：歷史表標籤格式改變時，合成標籤會對齊到固定起點而非真實日期。
pub fn anchor_from_label(label: Option<&str>, fallback: Quarter) -> Quarter {
    match label.map(Quarter::parse) {
        Some(Ok(quarter)) => quarter,
        Some(Err(e)) => {
            tracing::warn!(
                "⚠️ Cannot parse last quarter label ({}), falling back to {}",
                e,
                fallback
            );
            fallback
        }
        None => {
            tracing::warn!("⚠️ No quarter label available, falling back to {}", fallback);
            fallback
        }
    }
}
