use crate::common::{Direction, OptionSide};
use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 开盘区间：交易时段最初固定窗口内形成的高低点区间。
///
/// # Invariants
/// - `high >= low`，`range = high - low`。
/// - 仅当窗口内所有 K 线完全走平时 `range == 0`，此时两个位置比例均取 0.5 且无方向偏向。
/// - 两个位置比例均位于 [0, 1]。
/// - 每个交易时段只计算一次，之后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningRange {
    pub high: f64,
    pub low: f64,
    pub range: f64,
    // 窗口内第一根 K 线的开盘价
    pub open_price: f64,
    // (high - open) / range
    pub open_location_from_high: f64,
    // (open - low) / range
    pub open_location_from_low: f64,
    // 开盘位置导出的方向偏向
    pub bias: Option<Direction>,
    pub bias_reason: String,
    // 参与计算的 K 线数量
    pub candle_count: usize,
    // 开盘区间完成时刻
    pub completed_at: DateTime<FixedOffset>,
}

/// # Summary
/// 前一交易日关键价位及价值区。
///
/// # Invariants
/// - `value_area_low < value_area_high`，均由前一日振幅按比例 (默认 15%/85%) 自低点推出。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviousSessionLevels {
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub value_area_high: f64,
    pub value_area_low: f64,
}

impl PreviousSessionLevels {
    pub fn contains_in_value_area(&self, price: f64) -> bool {
        self.value_area_low <= price && price <= self.value_area_high
    }
}

/// # Summary
/// 交易时段级别的准入事实，扫描前一次性计算。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    // 波动率指数最新值，数据源不可用时为 None
    pub volatility_index_value: Option<f64>,
    pub volatility_safe: bool,
    pub min_range_required: f64,
    pub range_adequate: bool,
    pub previous_session: Option<PreviousSessionLevels>,
}

/// # Summary
/// 通过全部过滤条件的突破质量指标。
///
/// # Invariants
/// - `candle_body_pct` ∈ [0, 100]，`volume_ratio >= 0`。
/// - `distance_from_orb` 基于触发 K 线自身的收盘价计算。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutQuality {
    pub candle_body_pct: f64,
    pub volume_ratio: f64,
    pub atr_expanding: bool,
    pub distance_from_orb: f64,
    pub time_since_orb_min: i64,
}

/// # Summary
/// 期权选择器的结果：实值合约及其权利金目标/止损。
///
/// # Invariants
/// - `premium_entry > 0`。
/// - 当目标和止损百分比均为正时，`stoploss_premium < premium_entry < target_premium`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPick {
    pub strike: f64,
    pub side: OptionSide,
    pub option_symbol: String,
    pub premium_entry: Decimal,
    pub target_premium: Decimal,
    pub stoploss_premium: Decimal,
    pub expiry: NaiveDate,
    pub open_interest: Option<u64>,
    pub volume: Option<u64>,
}

/// # Summary
/// 信号附带的市场背景快照。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalContext {
    pub vix: Option<f64>,
    pub orb_range: f64,
    pub open_bias: Option<Direction>,
    pub pdh: Option<f64>,
    pub pdl: Option<f64>,
}

/// # Summary
/// 扫描器产出的交易建议。
///
/// # Invariants
/// - 每根合格 K 线至多一个信号；创建后不再修改。
/// - `entry_price` 为触发 K 线前一根 K 线的收盘价。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    // 触发 K 线的时刻 (HH:MM)
    pub time: String,
    pub timestamp: DateTime<FixedOffset>,
    // 触发 K 线在当日序列中的下标
    pub candle_index: usize,
    pub direction: Direction,
    pub strike: f64,
    pub option_symbol: String,
    pub entry_price: f64,
    pub premium_entry: Decimal,
    pub target_premium: Decimal,
    pub stoploss_premium: Decimal,
    pub expiry: NaiveDate,
    pub target_pct: f64,
    pub stoploss_pct: f64,
    pub quality: BreakoutQuality,
    pub open_interest: Option<u64>,
    pub volume: Option<u64>,
    pub reasons: Vec<String>,
    pub market_context: SignalContext,
}

impl Signal {
    /// # Summary
    /// 下游通知端用于去重的稳定键。
    ///
    /// # Returns
    /// 形如 `10:40_UP_26000` 的字符串。
    pub fn dedup_key(&self) -> String {
        format!("{}_{}_{:.0}", self.time, self.direction, self.strike)
    }
}
