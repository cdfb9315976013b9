use crate::indicators::{is_atr_expanding, rolling_mean_volume};
use chrono::{DateTime, FixedOffset, NaiveTime};
use orb_core::common::Direction;
use orb_core::config::StrategyConfig;
use orb_core::engine::entity::{
    BreakoutQuality, OpeningRange, OptionPick, SessionContext, Signal, SignalContext,
};
use orb_core::engine::error::EngineError;
use orb_core::engine::port::ContractResolver;
use orb_core::market::entity::Candle;
use tracing::{debug, info};

fn round_to(v: f64, dp: i32) -> f64 {
    let f = 10f64.powi(dp);
    (v * f).round() / f
}

/// # Summary
/// 单次前向扫描中跨 K 线携带的累加器。
///
/// # Invariants
/// - 只在信号真正产出 (期权解析成功) 后更新。
/// - 信号按产生顺序追加，不删除不修改。
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    last_entry_price: Option<f64>,
    last_signal_index: Option<usize>,
    signals: Vec<Signal>,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已有的上一次信号位置构造状态 (用于单独验证过滤条件)。
    pub fn with_last_signal(index: usize, entry_price: f64) -> Self {
        Self {
            last_entry_price: Some(entry_price),
            last_signal_index: Some(index),
            signals: Vec::new(),
        }
    }

    pub fn into_signals(self) -> Vec<Signal> {
        self.signals
    }

    fn record(&mut self, index: usize, entry_price: f64, signal: Signal) {
        self.last_entry_price = Some(entry_price);
        self.last_signal_index = Some(index);
        self.signals.push(signal);
    }
}

/// # Summary
/// 候选 K 线被跳过的原因，按过滤链顺序排列。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    // 缺少前一根 K 线
    InsufficientHistory,
    Stale,
    Cooldown,
    Overtrading,
    NoBreakout,
    WeakBody,
    SmallCandle,
    // 平均成交量缺失或为 0
    NoVolumeData,
    NoVolumeSurge,
    AtrNotExpanding,
    NearPriorExtreme,
    InsideValueArea,
    CounterBias,
}

/// # Summary
/// 通过全部过滤条件、等待期权解析的突破。
///
/// # Invariants
/// - `distance_from_boundary` 使用触发 K 线收盘价，`entry_price` 使用前一根 K 线收盘价。
#[derive(Debug, Clone, PartialEq)]
pub struct Breakout {
    pub index: usize,
    pub time: DateTime<FixedOffset>,
    pub direction: Direction,
    pub entry_price: f64,
    pub distance_from_boundary: f64,
    pub candle_body_pct: f64,
    pub volume_ratio: f64,
    pub atr_expanding: bool,
    pub minutes_since_orb: i64,
}

/// # Summary
/// 开盘区间突破扫描器。
///
/// # Invariants
/// - 只做一次前向遍历，从开盘窗口结束后的第一根 K 线到倒数第二根 K 线。
/// - 到达截止时刻即终止整个扫描，而非跳过单根 K 线。
/// - 信号数量达到上限即提前结束。
pub struct BreakoutScanner<'a> {
    config: &'a StrategyConfig,
    orb: &'a OpeningRange,
    context: &'a SessionContext,
    cutoff: NaiveTime,
}

impl<'a> BreakoutScanner<'a> {
    pub fn new(
        config: &'a StrategyConfig,
        orb: &'a OpeningRange,
        context: &'a SessionContext,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            config,
            orb,
            context,
            cutoff: config.cutoff()?,
        })
    }

    /// # Summary
    /// 对第 `idx` 根 K 线依次应用过滤链 (截止时刻除外)。
    ///
    /// # Logic
    /// 1. 新鲜度：距开盘区间完成超过窗口分钟数即跳过。
    /// 2. 冷却：距上一个信号不足 `cooldown_candles` 根即跳过。
    /// 3. 防过度交易：入场价距上一个入场价小于 `overtrading_distance * range` 即跳过。
    /// 4. 方向：收盘价高于区间上沿为向上，低于下沿为向下，否则跳过。
    /// 5. K 线强度：实体百分比与振幅均需达标。
    /// 6. 放量：成交量与滚动均量之比需达标，均量缺失或为 0 视为跳过。
    /// 7. 波动扩张：ATR 在最近若干根 K 线上非递减。
    /// 8. 关键价位陷阱：入场价过于接近前日对应极值，或落在前日价值区内即跳过。
    /// 9. 方向偏向：与开盘偏向相反的突破需要满足更强的实体与放量阈值。
    ///
    /// # Returns
    /// 通过全部过滤返回 `Breakout`，否则返回第一个未通过的原因。
    pub fn evaluate(
        &self,
        candles: &[Candle],
        idx: usize,
        state: &ScanState,
    ) -> Result<Breakout, Rejection> {
        let cfg = self.config;
        let orb = self.orb;

        let candle = candles.get(idx).ok_or(Rejection::InsufficientHistory)?;
        let prev = idx
            .checked_sub(1)
            .and_then(|p| candles.get(p))
            .ok_or(Rejection::InsufficientHistory)?;
        let entry_price = prev.close;

        let minutes_since_orb = (candle.time - orb.completed_at).num_minutes();
        if minutes_since_orb > cfg.fresh_move_window_minutes {
            return Err(Rejection::Stale);
        }

        if let Some(last) = state.last_signal_index
            && idx.saturating_sub(last) < cfg.cooldown_candles
        {
            return Err(Rejection::Cooldown);
        }

        if let Some(last_entry) = state.last_entry_price
            && (entry_price - last_entry).abs() < cfg.overtrading_distance * orb.range
        {
            return Err(Rejection::Overtrading);
        }

        let (direction, distance_from_boundary) = if candle.close > orb.high {
            (Direction::Up, candle.close - orb.high)
        } else if candle.close < orb.low {
            (Direction::Down, orb.low - candle.close)
        } else {
            return Err(Rejection::NoBreakout);
        };

        let body_pct = candle.body_pct();
        if body_pct < cfg.candle_body_min_pct {
            return Err(Rejection::WeakBody);
        }
        if candle.range() < cfg.candle_range_vs_orb * orb.range {
            return Err(Rejection::SmallCandle);
        }

        let avg_volume = rolling_mean_volume(candles, idx, cfg.volume_window)
            .filter(|v| *v > 0.0)
            .ok_or(Rejection::NoVolumeData)?;
        let volume_ratio = candle.volume / avg_volume;
        if volume_ratio < cfg.volume_surge_multiplier {
            return Err(Rejection::NoVolumeSurge);
        }

        if !is_atr_expanding(candles, idx, cfg.atr_period, cfg.atr_lookback) {
            return Err(Rejection::AtrNotExpanding);
        }

        if let Some(levels) = &self.context.previous_session {
            let min_distance = cfg.level_distance * orb.range;
            let extreme = match direction {
                Direction::Up => levels.high,
                Direction::Down => levels.low,
            };
            if (entry_price - extreme).abs() < min_distance {
                return Err(Rejection::NearPriorExtreme);
            }
            if levels.contains_in_value_area(entry_price) {
                return Err(Rejection::InsideValueArea);
            }
        }

        if let Some(bias) = orb.bias
            && bias != direction
            && (body_pct < cfg.counter_bias_body_pct
                || volume_ratio < cfg.counter_bias_volume_ratio)
        {
            return Err(Rejection::CounterBias);
        }

        Ok(Breakout {
            index: idx,
            time: candle.time,
            direction,
            entry_price,
            distance_from_boundary,
            candle_body_pct: body_pct,
            volume_ratio,
            atr_expanding: true,
            minutes_since_orb,
        })
    }

    /// # Summary
    /// 执行完整的前向扫描。
    ///
    /// # Logic
    /// 1. 信号数达到上限即结束。
    /// 2. K 线时刻到达截止时刻即终止。
    /// 3. 未通过过滤链的 K 线跳过。
    /// 4. 通过过滤链后解析期权合约，解析失败的候选直接丢弃，不更新状态。
    /// 5. 解析成功则构造信号并更新累加器。
    ///
    /// # Arguments
    /// * `candles`: 时段内全部 K 线 (最后一根视为未收盘，不参与扫描)。
    /// * `resolver`: 期权合约解析器。
    ///
    /// # Returns
    /// 按时间顺序排列的信号列表。
    pub async fn scan(&self, candles: &[Candle], resolver: &dyn ContractResolver) -> Vec<Signal> {
        let mut state = ScanState::new();
        let end = candles.len().saturating_sub(1);

        for idx in self.orb.candle_count..end {
            if state.signals.len() >= self.config.max_signals {
                debug!("Signal cap {} reached", self.config.max_signals);
                break;
            }
            let Some(candle) = candles.get(idx) else {
                break;
            };
            if candle.time.time() >= self.cutoff {
                debug!("Reached cutoff {} at {}", self.cutoff, candle.time);
                break;
            }

            let breakout = match self.evaluate(candles, idx, &state) {
                Ok(b) => b,
                Err(reason) => {
                    debug!("Candle {} ({}) skipped: {:?}", idx, candle.time, reason);
                    continue;
                }
            };

            let pick = match resolver
                .resolve(breakout.entry_price, breakout.direction)
                .await
            {
                Ok(pick) => pick,
                Err(e) => {
                    debug!("Candle {} breakout discarded, option unavailable: {}", idx, e);
                    continue;
                }
            };

            let signal = self.build_signal(&breakout, pick);
            info!(
                "{} breakout at {} -> {} @ {}",
                signal.direction, signal.time, signal.option_symbol, signal.premium_entry
            );
            state.record(idx, breakout.entry_price, signal);
        }

        state.into_signals()
    }

    /// 将突破与期权合约组装为信号。
    fn build_signal(&self, breakout: &Breakout, pick: OptionPick) -> Signal {
        let cfg = self.config;
        let levels = self.context.previous_session.as_ref();

        let mut reasons = vec![
            format!(
                "Strong {} breakout ({:.0}% body candle)",
                breakout.direction, breakout.candle_body_pct
            ),
            format!("Volume surge: {:.1}x average", breakout.volume_ratio),
            format!("ATR expanding over last {} candles", cfg.atr_lookback),
        ];
        if levels.is_some() {
            reasons.push("Outside previous day value area".to_string());
            reasons.push("Safe distance from previous day high/low".to_string());
        } else {
            reasons.push("Previous day levels unavailable - level filter skipped".to_string());
        }
        match self.orb.bias {
            Some(bias) if bias == breakout.direction => reasons.push(format!(
                "Aligned with open location bias ({})",
                self.orb.bias_reason
            )),
            Some(_) => {
                reasons.push("Counter-bias breakout cleared stronger thresholds".to_string())
            }
            None => {}
        }
        reasons.push(format!(
            "Fresh move (within {} min of ORB completion)",
            breakout.minutes_since_orb
        ));

        Signal {
            time: breakout.time.format("%H:%M").to_string(),
            timestamp: breakout.time,
            candle_index: breakout.index,
            direction: breakout.direction,
            strike: pick.strike,
            option_symbol: pick.option_symbol,
            entry_price: round_to(breakout.entry_price, 2),
            premium_entry: pick.premium_entry,
            target_premium: pick.target_premium,
            stoploss_premium: pick.stoploss_premium,
            expiry: pick.expiry,
            target_pct: cfg.premium_target_pct,
            stoploss_pct: cfg.premium_stoploss_pct,
            quality: BreakoutQuality {
                candle_body_pct: round_to(breakout.candle_body_pct, 1),
                volume_ratio: round_to(breakout.volume_ratio, 2),
                atr_expanding: breakout.atr_expanding,
                distance_from_orb: round_to(breakout.distance_from_boundary, 2),
                time_since_orb_min: breakout.minutes_since_orb,
            },
            open_interest: pick.open_interest,
            volume: pick.volume,
            reasons,
            market_context: SignalContext {
                vix: self.context.volatility_index_value,
                orb_range: round_to(self.orb.range, 2),
                open_bias: self.orb.bias,
                pdh: levels.map(|l| l.high),
                pdl: levels.map(|l| l.low),
            },
        }
    }
}
