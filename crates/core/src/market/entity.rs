use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// # Summary
/// 单根 K 线数据实体，记录特定时段内的行情波动。
///
/// # Invariants
/// - `high` 必须大于或等于 `low`, `open`, `close`。
/// - `time` 为 K 线开始时间，已归一化到交易时段所在时区。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线开始时间
    pub time: DateTime<FixedOffset>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量
    pub volume: f64,
}

impl Candle {
    /// 振幅 (high - low)。
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// # Summary
    /// 实体占振幅的百分比。
    ///
    /// # Logic
    /// 1. 振幅为 0 (十字星/停滞) 时返回 0。
    /// 2. 否则返回 |close - open| / (high - low) * 100。
    ///
    /// # Returns
    /// 取值范围 [0, 100]。
    pub fn body_pct(&self) -> f64 {
        let range = self.range();
        if range <= 0.0 {
            return 0.0;
        }
        ((self.close - self.open).abs() / range * 100.0).min(100.0)
    }
}

/// # Summary
/// 单个期权合约的报价快照。
///
/// # Invariants
/// - `bid`/`ask`/`last_price` 可能缺失或为 0 (未成交或盘前)，由选择器决定取价优先级。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    // 行权价
    pub strike: f64,
    // 买一价
    pub bid: Option<f64>,
    // 卖一价
    pub ask: Option<f64>,
    // 最新成交价
    pub last_price: Option<f64>,
    // 持仓量
    pub open_interest: Option<u64>,
    // 当日成交量
    pub volume: Option<u64>,
    // 到期日
    pub expiry: NaiveDate,
}

/// # Summary
/// 某一到期日的完整期权链。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionChain {
    pub calls: Vec<OptionQuote>,
    pub puts: Vec<OptionQuote>,
}
