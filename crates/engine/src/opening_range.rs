use chrono::Duration;
use orb_core::common::Direction;
use orb_core::config::SessionConfig;
use orb_core::engine::entity::OpeningRange;
use orb_core::engine::error::EngineError;
use orb_core::market::entity::Candle;

/// # Summary
/// 将数据源返回的 K 线裁剪为单一交易时段。
///
/// # Logic
/// 1. 只保留最后一个交易日的 K 线。
/// 2. 只保留开盘至收盘 (两端包含) 之间的 K 线。
///
/// # Returns
/// 按时间升序的时段内 K 线。
pub fn session_candles(
    candles: &[Candle],
    session: &SessionConfig,
) -> Result<Vec<Candle>, EngineError> {
    let open = session.open_time()?;
    let close = session.close_time()?;
    let Some(last_date) = candles.iter().map(|c| c.time.date_naive()).max() else {
        return Ok(Vec::new());
    };
    Ok(candles
        .iter()
        .filter(|c| {
            let t = c.time.time();
            c.time.date_naive() == last_date && t >= open && t <= close
        })
        .cloned()
        .collect())
}

/// # Summary
/// 开盘区间构建器。
///
/// # Invariants
/// - 只读取开盘窗口 `[open, open + opening_range_minutes)` 内的 K 线。
pub struct OpeningRangeBuilder<'a> {
    session: &'a SessionConfig,
    // 判定方向偏向的开盘位置阈值
    location_threshold: f64,
}

impl<'a> OpeningRangeBuilder<'a> {
    pub fn new(session: &'a SessionConfig, location_threshold: f64) -> Self {
        Self {
            session,
            location_threshold,
        }
    }

    /// # Summary
    /// 根据时段 K 线计算开盘区间及方向偏向。
    ///
    /// # Logic
    /// 1. 取开盘窗口内的 K 线，数量不足时返回 `InsufficientData` (等待状态)。
    /// 2. high = max(High)，low = min(Low)，range = high - low。
    /// 3. 计算首根 K 线开盘价距区间上下沿的相对位置。
    /// 4. 开在高点附近偏向向下突破，开在低点附近偏向向上突破 (均值回归思路)。
    ///
    /// # Arguments
    /// * `candles`: 已经过 `session_candles` 裁剪的时段 K 线。
    ///
    /// # Returns
    /// 成功返回 `OpeningRange`。
    pub fn build(&self, candles: &[Candle]) -> Result<OpeningRange, EngineError> {
        let open = self.session.open_time()?;
        let window_end = self.session.opening_window_end()?;
        let window: Vec<&Candle> = candles
            .iter()
            .take_while(|c| c.time.time() < window_end)
            .filter(|c| c.time.time() >= open)
            .collect();

        let need = self.session.min_opening_candles;
        let (Some(first), Some(last)) = (window.first(), window.last()) else {
            return Err(EngineError::InsufficientData { have: 0, need });
        };
        if window.len() < need {
            return Err(EngineError::InsufficientData {
                have: window.len(),
                need,
            });
        }

        let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        if high < low {
            return Err(EngineError::Data(format!(
                "opening range high {high} below low {low}"
            )));
        }

        let range = high - low;
        let open_price = first.open;
        let (from_high, from_low) = if range > 0.0 {
            (
                ((high - open_price) / range).clamp(0.0, 1.0),
                ((open_price - low) / range).clamp(0.0, 1.0),
            )
        } else {
            (0.5, 0.5)
        };

        let (bias, bias_reason) = if range <= 0.0 {
            (None, "Flat opening range - no directional bias".to_string())
        } else if from_high <= self.location_threshold {
            (
                Some(Direction::Down),
                "Market opened near ORB high - prefer DOWN breakouts first".to_string(),
            )
        } else if from_low <= self.location_threshold {
            (
                Some(Direction::Up),
                "Market opened near ORB low - prefer UP breakouts first".to_string(),
            )
        } else {
            (None, "Market opened mid-range - no directional bias".to_string())
        };

        Ok(OpeningRange {
            high,
            low,
            range,
            open_price,
            open_location_from_high: from_high,
            open_location_from_low: from_low,
            bias,
            bias_reason,
            candle_count: window.len(),
            completed_at: last.time + Duration::minutes(self.session.timeframe.minutes()),
        })
    }
}
