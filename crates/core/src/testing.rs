//! 测试工具：固定快照的行情数据源与 K 线构造函数。
#![allow(clippy::expect_used)]

use crate::common::TimeFrame;
use crate::market::entity::{Candle, OptionChain, OptionQuote};
use crate::market::error::MarketError;
use crate::market::port::MarketDataProvider;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 测试使用的交易日。
pub fn session_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 10).expect("valid date")
}

pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("valid offset")
}

/// 测试交易日内的某一时刻 (IST)。
pub fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    let naive = session_date()
        .and_hms_opt(hour, minute, 0)
        .expect("valid time");
    ist()
        .from_local_datetime(&naive)
        .single()
        .expect("fixed offset is unambiguous")
}

/// # Summary
/// 从 09:15 起按 5 分钟间隔构造 K 线序列。
///
/// # Arguments
/// * `rows`: 每行为 (open, high, low, close, volume)。
pub fn five_minute_session(rows: &[(f64, f64, f64, f64, f64)]) -> Vec<Candle> {
    let start = at(9, 15);
    rows.iter()
        .zip(0i64..)
        .map(|(&(open, high, low, close, volume), i)| Candle {
            time: start + chrono::Duration::minutes(5 * i),
            open,
            high,
            low,
            close,
            volume,
        })
        .collect()
}

/// 某一日的日线。
pub fn daily_bar(date: NaiveDate, high: f64, low: f64, close: f64) -> Candle {
    let naive = date.and_hms_opt(9, 15, 0).expect("valid time");
    Candle {
        time: ist()
            .from_local_datetime(&naive)
            .single()
            .expect("fixed offset is unambiguous"),
        open: (high + low) / 2.0,
        high,
        low,
        close,
        volume: 0.0,
    }
}

pub fn quote(strike: f64, bid: f64, ask: f64, last: f64, expiry: NaiveDate) -> OptionQuote {
    OptionQuote {
        strike,
        bid: Some(bid),
        ask: Some(ask),
        last_price: Some(last),
        open_interest: Some(125_000),
        volume: Some(40_000),
        expiry,
    }
}

/// # Summary
/// 固定快照的行情数据源。
///
/// # Invariants
/// - 字段为 `None` 时对应接口返回 `MarketError::Unavailable`，用于模拟数据源故障。
/// - 同一实例对相同请求永远返回相同数据。
#[derive(Default)]
pub struct StaticMarketData {
    pub intraday: Option<Vec<Candle>>,
    pub daily: Option<Vec<Candle>>,
    pub vix: Option<f64>,
    pub expiries: Vec<NaiveDate>,
    pub chains: HashMap<NaiveDate, OptionChain>,
    chain_requests: AtomicUsize,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_intraday(mut self, candles: Vec<Candle>) -> Self {
        self.intraday = Some(candles);
        self
    }

    pub fn with_daily(mut self, candles: Vec<Candle>) -> Self {
        self.daily = Some(candles);
        self
    }

    pub fn with_vix(mut self, value: f64) -> Self {
        self.vix = Some(value);
        self
    }

    pub fn with_chain(mut self, expiry: NaiveDate, chain: OptionChain) -> Self {
        if !self.expiries.contains(&expiry) {
            self.expiries.push(expiry);
            self.expiries.sort();
        }
        self.chains.insert(expiry, chain);
        self
    }

    /// 期权链被请求的次数。
    pub fn chain_requests(&self) -> usize {
        self.chain_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarketData {
    async fn fetch_intraday(
        &self,
        _symbol: &str,
        _timeframe: TimeFrame,
    ) -> Result<Vec<Candle>, MarketError> {
        self.intraday
            .clone()
            .ok_or_else(|| MarketError::Unavailable("intraday".into()))
    }

    async fn fetch_daily(
        &self,
        _symbol: &str,
        _lookback_days: u32,
    ) -> Result<Vec<Candle>, MarketError> {
        self.daily
            .clone()
            .ok_or_else(|| MarketError::Unavailable("daily".into()))
    }

    async fn fetch_volatility_index(&self, _symbol: &str) -> Result<f64, MarketError> {
        self.vix
            .ok_or_else(|| MarketError::Unavailable("volatility index".into()))
    }

    async fn fetch_expiries(&self, _symbol: &str) -> Result<Vec<NaiveDate>, MarketError> {
        Ok(self.expiries.clone())
    }

    async fn fetch_option_chain(
        &self,
        _symbol: &str,
        expiry: NaiveDate,
    ) -> Result<OptionChain, MarketError> {
        self.chain_requests.fetch_add(1, Ordering::SeqCst);
        self.chains.get(&expiry).cloned().ok_or(MarketError::NotFound)
    }
}
