use crate::common::TimeFrame;
use crate::market::entity::{Candle, OptionChain};
use crate::market::error::MarketError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// # Summary
/// 市场行情数据提供者接口（原始数据源）。
///
/// # Invariants
/// - 所有返回的时间戳必须已归一化到交易时段所在时区。
/// - 返回的 K 线序列按时间升序排列。
/// - 每次调用都是有界请求，失败即返回 `MarketError`，不在内部重试。
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// # Summary
    /// 获取标的当日的日内 K 线。
    ///
    /// # Arguments
    /// * `symbol`: 数据源识别的标的代码 (例如 `^NSEI`)。
    /// * `timeframe`: K 线周期。
    ///
    /// # Returns
    /// 成功返回单一交易日的 K 线列表。
    async fn fetch_intraday(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
    ) -> Result<Vec<Candle>, MarketError>;

    /// # Summary
    /// 获取最近若干个交易日的日线。
    ///
    /// # Arguments
    /// * `symbol`: 标的代码。
    /// * `lookback_days`: 回溯的自然日数量。
    ///
    /// # Returns
    /// 成功返回日线列表 (可能包含当日未收盘的日线)。
    async fn fetch_daily(&self, symbol: &str, lookback_days: u32)
    -> Result<Vec<Candle>, MarketError>;

    /// # Summary
    /// 获取波动率指数的最新值。
    ///
    /// # Arguments
    /// * `symbol`: 波动率指数代码 (例如 `^INDIAVIX`)。
    async fn fetch_volatility_index(&self, symbol: &str) -> Result<f64, MarketError>;

    /// # Summary
    /// 获取标的可交易的期权到期日，按时间升序排列。
    async fn fetch_expiries(&self, symbol: &str) -> Result<Vec<NaiveDate>, MarketError>;

    /// # Summary
    /// 获取指定到期日的期权链。
    async fn fetch_option_chain(
        &self,
        symbol: &str,
        expiry: NaiveDate,
    ) -> Result<OptionChain, MarketError>;
}
