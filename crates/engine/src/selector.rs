use async_trait::async_trait;
use chrono::NaiveDate;
use orb_core::common::{Direction, OptionSide};
use orb_core::config::InstrumentConfig;
use orb_core::engine::entity::OptionPick;
use orb_core::engine::error::SelectionError;
use orb_core::engine::port::ContractResolver;
use orb_core::market::entity::OptionQuote;
use orb_core::market::port::MarketDataProvider;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::Arc;
use tracing::debug;

// 期权链中行权价的匹配容差
const STRIKE_EPSILON: f64 = 1e-6;

/// # Summary
/// 计算实值一档的行权价。
///
/// # Logic
/// 1. 入场价按行权价间距四舍五入 (银行家舍入，与交易所取整口径一致) 得到平值档。
/// 2. 认购取平值下一档，认沽取平值上一档。
pub fn itm_strike(price: f64, step: f64, direction: Direction) -> f64 {
    let atm = (price / step).round_ties_even() * step;
    match direction {
        Direction::Up => atm - step,
        Direction::Down => atm + step,
    }
}

/// # Summary
/// 构造人类可读的合约代码，例如 `NIFTY 12FEB26 26000 CE`。
pub fn contract_symbol(name: &str, expiry: NaiveDate, strike: f64, side: OptionSide) -> String {
    format!(
        "{} {} {:.0} {}",
        name,
        expiry.format("%d%b%y").to_string().to_uppercase(),
        strike,
        side.code()
    )
}

/// # Summary
/// 报价取价优先级：买卖价均为正时取中间价，否则取最新成交价。
///
/// # Returns
/// 非正或非有限值返回 None。
pub fn quoted_premium(quote: &OptionQuote) -> Option<f64> {
    let premium = match (quote.bid, quote.ask) {
        (Some(bid), Some(ask)) if bid > 0.0 && ask > 0.0 => Some((bid + ask) / 2.0),
        _ => quote.last_price,
    };
    premium.filter(|p| p.is_finite() && *p > 0.0)
}

/// # Summary
/// 由入场权利金推出目标价与止损价。
///
/// # Logic
/// 1. target = premium * (1 + target_pct / 100)，stop = premium * (1 - stop_pct / 100)。
/// 2. 三个价格各自从未取整的权利金算出后再保留两位小数。
///
/// # Returns
/// (entry, target, stop)，无法表示为十进制时返回 None。
pub fn premium_levels(
    premium: f64,
    target_pct: f64,
    stoploss_pct: f64,
) -> Option<(Decimal, Decimal, Decimal)> {
    let raw = Decimal::from_f64(premium)?;
    let entry = raw.round_dp(2);
    if entry <= Decimal::ZERO {
        return None;
    }
    let target_frac = Decimal::from_f64(target_pct)? / Decimal::ONE_HUNDRED;
    let stop_frac = Decimal::from_f64(stoploss_pct)? / Decimal::ONE_HUNDRED;
    let target = (raw * (Decimal::ONE + target_frac)).round_dp(2);
    let stop = (raw * (Decimal::ONE - stop_frac)).round_dp(2);
    Some((entry, target, stop))
}

/// # Summary
/// 基于行情数据源的期权选择器。
///
/// # Invariants
/// - 始终使用数据源给出的最近到期日。
/// - 不做重试，任何失败都交由扫描器丢弃候选信号。
pub struct OptionSelector {
    provider: Arc<dyn MarketDataProvider>,
    instrument: InstrumentConfig,
    target_pct: f64,
    stoploss_pct: f64,
}

impl OptionSelector {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        instrument: InstrumentConfig,
        target_pct: f64,
        stoploss_pct: f64,
    ) -> Self {
        Self {
            provider,
            instrument,
            target_pct,
            stoploss_pct,
        }
    }
}

#[async_trait]
impl ContractResolver for OptionSelector {
    /// # Summary
    /// 选出实值一档合约并读取其权利金。
    ///
    /// # Logic
    /// 1. 计算实值行权价与合约类型。
    /// 2. 取最近到期日并拉取该到期日的期权链。
    /// 3. 在对应方向的合约中匹配行权价。
    /// 4. 按取价优先级得到权利金，计算目标/止损。
    ///
    /// # Returns
    /// 无到期日、行权价缺失、权利金非正时返回对应的 `SelectionError`。
    async fn resolve(
        &self,
        entry_price: f64,
        direction: Direction,
    ) -> Result<OptionPick, SelectionError> {
        let strike = itm_strike(entry_price, self.instrument.strike_step, direction);
        let side = direction.option_side();
        let symbol = &self.instrument.symbol;

        let expiry = self
            .provider
            .fetch_expiries(symbol)
            .await?
            .into_iter()
            .min()
            .ok_or(SelectionError::NoExpiry)?;
        let chain = self.provider.fetch_option_chain(symbol, expiry).await?;
        let quotes = match side {
            OptionSide::Call => &chain.calls,
            OptionSide::Put => &chain.puts,
        };
        let quote = quotes
            .iter()
            .find(|q| (q.strike - strike).abs() < STRIKE_EPSILON)
            .ok_or(SelectionError::StrikeNotFound(strike))?;

        let premium = quoted_premium(quote).ok_or(SelectionError::InvalidPremium(strike))?;
        let (premium_entry, target_premium, stoploss_premium) =
            premium_levels(premium, self.target_pct, self.stoploss_pct)
                .ok_or(SelectionError::InvalidPremium(strike))?;

        let option_symbol = contract_symbol(&self.instrument.name, expiry, strike, side);
        debug!("Resolved {option_symbol} at premium {premium_entry}");

        Ok(OptionPick {
            strike,
            side,
            option_symbol,
            premium_entry,
            target_premium,
            stoploss_premium,
            expiry,
            open_interest: quote.open_interest,
            volume: quote.volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_core::testing::session_date;

    #[test]
    fn test_itm_strike() {
        assert_eq!(itm_strike(26012.0, 50.0, Direction::Up), 25950.0);
        assert_eq!(itm_strike(26012.0, 50.0, Direction::Down), 26050.0);
        assert_eq!(itm_strike(51260.0, 100.0, Direction::Up), 51200.0);
        // 恰好位于两档中间时舍入到偶数档
        assert_eq!(itm_strike(26025.0, 50.0, Direction::Up), 25950.0);
    }

    #[test]
    fn test_contract_symbol_format() {
        let expiry = NaiveDate::from_ymd_opt(2026, 2, 12).unwrap();
        assert_eq!(
            contract_symbol("NIFTY", expiry, 26000.0, OptionSide::Call),
            "NIFTY 12FEB26 26000 CE"
        );
    }

    #[test]
    fn test_premium_priority() {
        let expiry = session_date();
        let mut q = OptionQuote {
            strike: 100.0,
            bid: Some(9.5),
            ask: Some(10.5),
            last_price: Some(12.0),
            open_interest: None,
            volume: None,
            expiry,
        };
        assert_eq!(quoted_premium(&q), Some(10.0));
        q.bid = Some(0.0);
        assert_eq!(quoted_premium(&q), Some(12.0));
        q.last_price = Some(0.0);
        assert_eq!(quoted_premium(&q), None);
        q.last_price = None;
        assert_eq!(quoted_premium(&q), None);
    }

    #[test]
    fn test_premium_levels_bracket_entry() {
        let (entry, target, stop) = premium_levels(142.37, 30.0, 35.0).unwrap();
        assert!(stop < entry && entry < target);
        assert_eq!(entry.to_string(), "142.37");
        assert_eq!(target.to_string(), "185.08");
        assert_eq!(stop.to_string(), "92.54");
    }

    #[test]
    fn test_premium_levels_use_unrounded_mid() {
        // 10.005 * 1.30 = 13.0065，若先取整为 10.00 则目标价会变成 13.00
        let (_, target, stop) = premium_levels(10.005, 30.0, 35.0).unwrap();
        assert_eq!(target.to_string(), "13.01");
        assert_eq!(stop.to_string(), "6.50");
    }
}
