//! 基于不可变 K 线序列的窗口聚合函数。
//!
//! 每个函数接收完整序列与当前下标，只读取下标及其之前的数据；
//! 历史不足时返回 `None` (或 `false`)，由调用方决定视为跳过。

use orb_core::market::entity::Candle;

/// 算术平均，空迭代返回 None。
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0.0), |(s, n), v| (s + v, n + 1.0));
    if count > 0.0 { Some(sum / count) } else { None }
}

/// # Summary
/// 第 `idx` 根 K 线的真实波幅。
///
/// # Logic
/// 1. 首根 K 线没有前收盘价，真实波幅即 high - low。
/// 2. 其余取 max(high - low, |high - prev_close|, |low - prev_close|)。
pub fn true_range(candles: &[Candle], idx: usize) -> Option<f64> {
    let c = candles.get(idx)?;
    let hl = c.high - c.low;
    if idx == 0 {
        return Some(hl);
    }
    let prev_close = candles.get(idx - 1)?.close;
    Some(
        hl.max((c.high - prev_close).abs())
            .max((c.low - prev_close).abs()),
    )
}

/// # Summary
/// 截至 `idx` (含) 的简单平均真实波幅。
///
/// # Returns
/// 不足 `period` 根 K 线时返回 None。
pub fn average_true_range(candles: &[Candle], idx: usize, period: usize) -> Option<f64> {
    if period == 0 || idx >= candles.len() || idx + 1 < period {
        return None;
    }
    mean((idx + 1 - period..=idx).filter_map(|j| true_range(candles, j)))
}

/// # Summary
/// 截至 `idx` (含) 的滚动平均成交量。
///
/// # Returns
/// 不足 `window` 根 K 线时返回 None。
pub fn rolling_mean_volume(candles: &[Candle], idx: usize, window: usize) -> Option<f64> {
    if window == 0 || idx >= candles.len() || idx + 1 < window {
        return None;
    }
    mean(candles[idx + 1 - window..=idx].iter().map(|c| c.volume))
}

/// # Summary
/// 判断 ATR 是否在最近 `lookback` 根 K 线 (含当前) 上非递减。
///
/// # Logic
/// 1. 历史少于 `lookback + period` 根时视为不扩张。
/// 2. 依次比较相邻 ATR 值，任意一处下降即返回 false。
pub fn is_atr_expanding(candles: &[Candle], idx: usize, period: usize, lookback: usize) -> bool {
    if lookback == 0 || idx >= candles.len() || idx + 1 < lookback + period {
        return false;
    }
    let values: Vec<f64> = (idx + 1 - lookback..=idx)
        .filter_map(|j| average_true_range(candles, j, period))
        .collect();
    values.len() == lookback && values.windows(2).all(|w| w[0] <= w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_core::testing::five_minute_session;

    fn flat_series(n: usize, range: f64) -> Vec<Candle> {
        let rows: Vec<_> = (0..n)
            .map(|_| (100.0, 100.0 + range / 2.0, 100.0 - range / 2.0, 100.0, 1000.0))
            .collect();
        five_minute_session(&rows)
    }

    #[test]
    fn test_true_range_uses_previous_close_gap() {
        let candles = five_minute_session(&[
            (100.0, 101.0, 99.0, 100.0, 1.0),
            (105.0, 106.0, 104.0, 105.0, 1.0),
        ]);
        assert_eq!(true_range(&candles, 0), Some(2.0));
        // 跳空：|106 - 100| = 6 大于本根振幅 2
        assert_eq!(true_range(&candles, 1), Some(6.0));
        assert_eq!(true_range(&candles, 2), None);
    }

    #[test]
    fn test_atr_requires_full_period() {
        let candles = flat_series(14, 4.0);
        assert_eq!(average_true_range(&candles, 12, 14), None);
        assert_eq!(average_true_range(&candles, 13, 14), Some(4.0));
    }

    #[test]
    fn test_rolling_volume_window() {
        let mut candles = flat_series(10, 2.0);
        candles[9].volume = 10_000.0;
        assert_eq!(rolling_mean_volume(&candles, 8, 10), None);
        assert_eq!(rolling_mean_volume(&candles, 9, 10), Some(1900.0));
    }

    #[test]
    fn test_atr_expansion_needs_history() {
        let candles = flat_series(16, 2.0);
        // 16 根 < 3 + 14
        assert!(!is_atr_expanding(&candles, 15, 14, 3));
        let candles = flat_series(17, 2.0);
        // 恒定 ATR 视为非递减
        assert!(is_atr_expanding(&candles, 16, 14, 3));
    }

    #[test]
    fn test_atr_contraction_detected() {
        let mut candles = flat_series(20, 4.0);
        candles[19].high = 100.5;
        candles[19].low = 99.5;
        assert!(!is_atr_expanding(&candles, 19, 14, 3));
    }
}
