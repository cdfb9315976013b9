use crate::common::TimeFrame;
use chrono::{FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// # Summary
/// 配置校验错误。
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub strategy: StrategyConfig,
    pub session: SessionConfig,
    pub instruments: Vec<InstrumentConfig>,
    // 波动率指数代码
    pub volatility_symbol: String,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// # Summary
/// 突破过滤链的全部阈值。
///
/// # Invariants
/// - 所有 `*_pct` 字段以百分数表示 (60 表示 60%)。
/// - 所有以开盘区间为基准的距离字段以区间大小的比例表示 (0.25 表示 25%)。
/// - 逆偏向信号的两项阈值独立配置，与基础阈值无推导关系。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub candle_body_min_pct: f64,
    pub candle_range_vs_orb: f64,
    pub volume_surge_multiplier: f64,
    pub volume_window: usize,
    pub atr_period: usize,
    pub atr_lookback: usize,
    // 与前日高低点的最小距离 (开盘区间比例)
    pub level_distance: f64,
    pub value_area_low_pct: f64,
    pub value_area_high_pct: f64,
    pub fresh_move_window_minutes: i64,
    pub overtrading_distance: f64,
    pub open_location_threshold: f64,
    pub cutoff_hour: u32,
    pub cutoff_minute: u32,
    pub max_vix: f64,
    pub premium_target_pct: f64,
    pub premium_stoploss_pct: f64,
    pub max_signals: usize,
    pub cooldown_candles: usize,
    pub counter_bias_body_pct: f64,
    pub counter_bias_volume_ratio: f64,
    pub daily_lookback_days: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            candle_body_min_pct: 60.0,
            candle_range_vs_orb: 0.35,
            volume_surge_multiplier: 1.8,
            volume_window: 10,
            atr_period: 14,
            atr_lookback: 3,
            level_distance: 0.25,
            value_area_low_pct: 0.15,
            value_area_high_pct: 0.85,
            fresh_move_window_minutes: 90,
            overtrading_distance: 0.15,
            open_location_threshold: 0.20,
            cutoff_hour: 12,
            cutoff_minute: 30,
            max_vix: 20.0,
            premium_target_pct: 30.0,
            premium_stoploss_pct: 35.0,
            max_signals: 10,
            cooldown_candles: 2,
            counter_bias_body_pct: 75.0,
            counter_bias_volume_ratio: 2.5,
            daily_lookback_days: 5,
        }
    }
}

impl StrategyConfig {
    /// 停止产生新信号的时刻。
    pub fn cutoff(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::from_hms_opt(self.cutoff_hour, self.cutoff_minute, 0).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "cutoff {}:{} is not a valid time",
                self.cutoff_hour, self.cutoff_minute
            ))
        })
    }
}

/// # Summary
/// 交易时段定义。
///
/// # Invariants
/// - 开盘区间从 `open` 开始，持续 `opening_range_minutes` 分钟 (左闭右开)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    // 交易时段相对 UTC 的偏移秒数 (IST = +05:30)
    pub utc_offset_secs: i32,
    pub timezone_label: String,
    pub open_hour: u32,
    pub open_minute: u32,
    pub close_hour: u32,
    pub close_minute: u32,
    pub opening_range_minutes: i64,
    pub timeframe: TimeFrame,
    pub min_opening_candles: usize,
    pub min_session_candles: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            utc_offset_secs: 5 * 3600 + 30 * 60,
            timezone_label: "IST".to_string(),
            open_hour: 9,
            open_minute: 15,
            close_hour: 15,
            close_minute: 30,
            opening_range_minutes: 30,
            timeframe: TimeFrame::Minute5,
            min_opening_candles: 6,
            min_session_candles: 10,
        }
    }
}

impl SessionConfig {
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_secs).ok_or_else(|| {
            ConfigError::Invalid(format!("utc offset {} out of range", self.utc_offset_secs))
        })
    }

    pub fn open_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::from_hms_opt(self.open_hour, self.open_minute, 0)
            .ok_or_else(|| ConfigError::Invalid("session open is not a valid time".into()))
    }

    pub fn close_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::from_hms_opt(self.close_hour, self.close_minute, 0)
            .ok_or_else(|| ConfigError::Invalid("session close is not a valid time".into()))
    }

    /// 开盘区间结束时刻 (不含)。
    pub fn opening_window_end(&self) -> Result<NaiveTime, ConfigError> {
        Ok(self.open_time()? + chrono::Duration::minutes(self.opening_range_minutes))
    }
}

/// # Summary
/// 单个交易标的配置。
///
/// # Invariants
/// - `min_orb_range` 按标的区分，因为不同指数的绝对点数差异很大。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    // 展示名称 (例如: NIFTY)，同时用于合约代码
    pub name: String,
    // 数据源代码 (例如: ^NSEI)
    pub symbol: String,
    // 行权价间距
    pub strike_step: f64,
    // 开盘区间最小点数
    pub min_orb_range: f64,
}

impl InstrumentConfig {
    /// 报告中使用的键 (小写名称)。
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "orb_analysis_multi_trade.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    // 为空时只输出到标准输出
    pub dir: Option<String>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: "orb-engine.log".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            session: SessionConfig::default(),
            instruments: vec![
                InstrumentConfig {
                    name: "NIFTY".to_string(),
                    symbol: "^NSEI".to_string(),
                    strike_step: 50.0,
                    min_orb_range: 50.0,
                },
                InstrumentConfig {
                    name: "BANKNIFTY".to_string(),
                    symbol: "^NSEBANK".to_string(),
                    strike_step: 100.0,
                    min_orb_range: 100.0,
                },
            ],
            volatility_symbol: "^INDIAVIX".to_string(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// # Summary
    /// 校验配置的自洽性。
    ///
    /// # Logic
    /// 1. 时间字段必须能构成合法时刻，且开盘区间落在交易时段内。
    /// 2. 窗口长度、信号上限必须为正。
    /// 3. 价值区上下沿比例必须满足 0 <= low < high <= 1。
    /// 4. 标的列表非空，行权价间距为正。
    ///
    /// # Returns
    /// 校验通过返回 Ok，否则返回第一个发现的问题。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.strategy;
        let session = &self.session;

        session.offset()?;
        s.cutoff()?;
        let open = session.open_time()?;
        let close = session.close_time()?;
        let window_end = session.opening_window_end()?;
        if open >= close || window_end <= open || window_end > close {
            return Err(ConfigError::Invalid(
                "opening range must fit inside the session".into(),
            ));
        }
        if session.min_opening_candles == 0 {
            return Err(ConfigError::Invalid(
                "min_opening_candles must be positive".into(),
            ));
        }
        if s.volume_window == 0 || s.atr_period == 0 || s.atr_lookback == 0 {
            return Err(ConfigError::Invalid(
                "indicator windows must be positive".into(),
            ));
        }
        if s.max_signals == 0 {
            return Err(ConfigError::Invalid("max_signals must be positive".into()));
        }
        if !(0.0..1.0).contains(&s.value_area_low_pct)
            || s.value_area_high_pct > 1.0
            || s.value_area_low_pct >= s.value_area_high_pct
        {
            return Err(ConfigError::Invalid(format!(
                "value area fractions {}..{} are inverted or out of [0, 1]",
                s.value_area_low_pct, s.value_area_high_pct
            )));
        }
        if s.premium_target_pct < 0.0
            || s.premium_stoploss_pct < 0.0
            || s.premium_stoploss_pct >= 100.0
        {
            return Err(ConfigError::Invalid(
                "premium target/stoploss percentages out of range".into(),
            ));
        }
        if self.instruments.is_empty() {
            return Err(ConfigError::Invalid("no instruments configured".into()));
        }
        for inst in &self.instruments {
            if inst.strike_step <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{}: strike_step must be positive",
                    inst.name
                )));
            }
        }
        Ok(())
    }
}
