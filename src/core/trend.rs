use crate::domain::model::TrendPoint;

/// 趨勢線的移動平均視窗 (四季)
pub const TREND_WINDOW: usize = 4;

/// 置中移動平均
///
/// 偶數視窗向右偏一格：第 `i` 點使用 `i - window/2 ..= i + (window-1)/2`，
/// 視窗不完整或含缺值的位置回傳 `None`。
pub fn centered_moving_average(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let left = window / 2;
    let right = (window - 1) / 2;

    (0..values.len())
        .map(|i| {
            if i < left || i + right >= values.len() {
                return None;
            }
            let slice = &values[i - left..=i + right];
            let sum = slice.iter().try_fold(0.0, |acc, v| v.map(|v| acc + v))?;
            Some(sum / window as f64)
        })
        .collect()
}

/// 加上四季趨勢後的序列，邊緣與缺值列直接捨棄
///
/// 短序列可能得到空結果，呼叫端應視為「無趨勢」而非錯誤。
pub fn with_trend(series: &[(String, Option<f64>)]) -> Vec<TrendPoint> {
    let values: Vec<Option<f64>> = series.iter().map(|(_, v)| *v).collect();
    let trend = centered_moving_average(&values, TREND_WINDOW);

    series
        .iter()
        .zip(trend)
        .filter_map(|((quarter, value), trend)| {
            Some(TrendPoint {
                quarter: quarter.clone(),
                value: (*value)?,
                trend: trend?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[Option<f64>]) -> Vec<(String, Option<f64>)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("p{}", i), *v))
            .collect()
    }

    #[test]
    fn test_eight_point_series_drops_edges() {
        let values: Vec<Option<f64>> = (1..=8).map(|v| Some(v as f64)).collect();
        let result = with_trend(&series(&values));

        assert_eq!(result.len(), 5);
        assert_eq!(result.first().unwrap().quarter, "p2");
        assert_eq!(result.last().unwrap().quarter, "p6");

        let trends: Vec<f64> = result.iter().map(|p| p.trend).collect();
        assert_eq!(trends, vec![2.5, 3.5, 4.5, 5.5, 6.5]);
        assert_eq!(result[0].value, 3.0);
    }

    #[test]
    fn test_window_alignment() {
        let values = vec![Some(4.0), Some(8.0), Some(12.0), Some(16.0), Some(20.0)];
        let avg = centered_moving_average(&values, 4);
        assert_eq!(avg, vec![None, None, Some(10.0), Some(14.0), None]);

        let odd = centered_moving_average(&values, 3);
        assert_eq!(odd, vec![None, Some(8.0), Some(12.0), Some(16.0), None]);
    }

    #[test]
    fn test_missing_values_invalidate_window() {
        let values = vec![
            Some(1.0),
            Some(2.0),
            None,
            Some(4.0),
            Some(5.0),
            Some(6.0),
            Some(7.0),
            Some(8.0),
        ];
        let result = with_trend(&series(&values));
        // 視窗 i-2..=i+1 含第 2 點者 (i = 2, 3, 4) 皆無法計算
        let quarters: Vec<&str> = result.iter().map(|p| p.quarter.as_str()).collect();
        assert_eq!(quarters, vec!["p5", "p6"]);
    }

    #[test]
    fn test_short_series_yields_empty_trend() {
        let values = vec![Some(10.0), Some(11.0), Some(12.0)];
        assert!(with_trend(&series(&values)).is_empty());
        assert!(with_trend(&[]).is_empty());
    }
}
