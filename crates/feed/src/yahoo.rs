use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use orb_core::common::TimeFrame;
use orb_core::market::entity::{Candle, OptionChain, OptionQuote};
use orb_core::market::error::MarketError;
use orb_core::market::port::MarketDataProvider;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const OPTIONS_URL: &str = "https://query2.finance.yahoo.com/v7/finance/options";
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// # Summary
/// Yahoo Finance 行情提供者实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯。
/// - 所有 K 线时间戳统一换算到交易所时区 (`offset`)。
#[derive(Clone)]
pub struct YahooProvider {
    client: Client,
    // 交易所所在时区
    offset: FixedOffset,
}

impl YahooProvider {
    /// # Summary
    /// 创建一个新的 YahooProvider 实例。
    ///
    /// # Logic
    /// 1. 配置 10 秒超时。
    /// 2. 设置浏览器 User-Agent 以减少被拦截。
    /// 3. 初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `offset`: 交易所时区，K 线时间戳按此换算。
    ///
    /// # Returns
    /// 客户端构建失败时返回 `MarketError::Unknown`。
    pub fn new(offset: FixedOffset) -> Result<Self, MarketError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()
            .map_err(|e| MarketError::Unknown(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, offset })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Err(MarketError::NotFound),
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                return Err(MarketError::Unavailable(format!("HTTP {}", resp.status())));
            }
            s => return Err(MarketError::Network(format!("HTTP {s}"))),
        }

        resp.json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Vec<Candle>, MarketError> {
        let url = format!("{CHART_URL}/{symbol}");
        let body: ChartResponse = self
            .get_json(
                &url,
                &[
                    ("range", range.to_string()),
                    ("interval", interval.to_string()),
                ],
            )
            .await?;
        let candles = parse_chart(body, self.offset)?;
        debug!("{symbol}: fetched {} candles ({range}/{interval})", candles.len());
        Ok(candles)
    }

    async fn fetch_options(
        &self,
        symbol: &str,
        expiry: Option<NaiveDate>,
    ) -> Result<OptionsResult, MarketError> {
        let url = format!("{OPTIONS_URL}/{symbol}");
        let mut query = Vec::new();
        if let Some(date) = expiry {
            query.push(("date", expiry_timestamp(date)?.to_string()));
        }
        let body: OptionsResponse = self.get_json(&url, &query).await?;
        first_options_result(body)
    }
}

fn interval(timeframe: TimeFrame) -> &'static str {
    match timeframe {
        TimeFrame::Minute1 => "1m",
        TimeFrame::Minute5 => "5m",
        TimeFrame::Minute15 => "15m",
        TimeFrame::Day1 => "1d",
    }
}

/// 到期日在 Yahoo 中以当日 00:00 UTC 的秒级时间戳表示。
fn expiry_timestamp(date: NaiveDate) -> Result<i64, MarketError> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| MarketError::Parse(format!("invalid expiry {date}")))
}

fn expiry_date(ts: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Deserialize, Debug)]
struct YahooError {
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    // 无成交的时段 Yahoo 会省略该字段
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Deserialize, Debug)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Deserialize, Debug)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// # Summary
/// 将 v8 chart 响应转换为 K 线序列。
///
/// # Logic
/// 1. 响应中的错误描述映射为 `MarketError::Unknown`。
/// 2. OHLC 任一缺失的行直接丢弃 (Yahoo 用 null 填充停牌时段)。
/// 3. 成交量缺失视为 0 (指数类标的常见)。
/// 4. 时间戳换算到交易所时区。
fn parse_chart(body: ChartResponse, offset: FixedOffset) -> Result<Vec<Candle>, MarketError> {
    if let Some(err) = body.chart.error {
        return Err(MarketError::Unknown(err.description));
    }
    let result = body
        .chart
        .result
        .and_then(|mut r| r.pop())
        .ok_or(MarketError::NotFound)?;
    let quote = result
        .indicators
        .quote
        .first()
        .ok_or_else(|| MarketError::Parse("No quote data".into()))?;

    let mut candles = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
        ) else {
            continue;
        };
        let Some(time) = DateTime::from_timestamp(ts, 0) else {
            continue;
        };
        candles.push(Candle {
            time: time.with_timezone(&offset),
            open,
            high,
            low,
            close,
            volume: field(&quote.volume).unwrap_or(0.0),
        });
    }
    Ok(candles)
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    option_chain: OptionsEnvelope,
}

#[derive(Deserialize, Debug)]
struct OptionsEnvelope {
    result: Option<Vec<OptionsResult>>,
    error: Option<YahooError>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct OptionsResult {
    #[serde(default)]
    expiration_dates: Vec<i64>,
    #[serde(default)]
    options: Vec<OptionsSlice>,
}

#[derive(Deserialize, Debug)]
struct OptionsSlice {
    #[serde(default)]
    calls: Vec<YahooContract>,
    #[serde(default)]
    puts: Vec<YahooContract>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct YahooContract {
    strike: f64,
    bid: Option<f64>,
    ask: Option<f64>,
    last_price: Option<f64>,
    open_interest: Option<u64>,
    volume: Option<u64>,
    expiration: i64,
}

impl YahooContract {
    fn into_quote(self) -> Option<OptionQuote> {
        Some(OptionQuote {
            strike: self.strike,
            bid: self.bid,
            ask: self.ask,
            last_price: self.last_price,
            open_interest: self.open_interest,
            volume: self.volume,
            expiry: expiry_date(self.expiration)?,
        })
    }
}

fn first_options_result(body: OptionsResponse) -> Result<OptionsResult, MarketError> {
    if let Some(err) = body.option_chain.error {
        return Err(MarketError::Unknown(err.description));
    }
    body.option_chain
        .result
        .and_then(|mut r| r.pop())
        .ok_or(MarketError::NotFound)
}

fn parse_expiries(result: &OptionsResult) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = result
        .expiration_dates
        .iter()
        .filter_map(|ts| expiry_date(*ts))
        .collect();
    dates.sort();
    dates.dedup();
    dates
}

fn parse_option_chain(result: OptionsResult) -> Result<OptionChain, MarketError> {
    let slice = result
        .options
        .into_iter()
        .next()
        .ok_or(MarketError::NotFound)?;
    Ok(OptionChain {
        calls: slice
            .calls
            .into_iter()
            .filter_map(YahooContract::into_quote)
            .collect(),
        puts: slice
            .puts
            .into_iter()
            .filter_map(YahooContract::into_quote)
            .collect(),
    })
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    async fn fetch_intraday(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
    ) -> Result<Vec<Candle>, MarketError> {
        self.fetch_chart(symbol, "1d", interval(timeframe)).await
    }

    async fn fetch_daily(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<Vec<Candle>, MarketError> {
        let range = format!("{}d", lookback_days.max(1));
        self.fetch_chart(symbol, &range, "1d").await
    }

    /// # Summary
    /// 波动率指数的最新值，取最近 5 个交易日日线的最后收盘价。
    async fn fetch_volatility_index(&self, symbol: &str) -> Result<f64, MarketError> {
        self.fetch_chart(symbol, "5d", "1d")
            .await?
            .last()
            .map(|c| c.close)
            .ok_or(MarketError::NotFound)
    }

    async fn fetch_expiries(&self, symbol: &str) -> Result<Vec<NaiveDate>, MarketError> {
        let result = self.fetch_options(symbol, None).await?;
        Ok(parse_expiries(&result))
    }

    async fn fetch_option_chain(
        &self,
        symbol: &str,
        expiry: NaiveDate,
    ) -> Result<OptionChain, MarketError> {
        let result = self.fetch_options(symbol, Some(expiry)).await?;
        parse_option_chain(result)
    }
}
