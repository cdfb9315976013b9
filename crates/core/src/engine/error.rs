use crate::config::ConfigError;
use crate::market::error::MarketError;
use thiserror::Error;

/// # Summary
/// 引擎域错误枚举。
///
/// # Invariants
/// - `InsufficientData` 表示时段尚未走到足够远，是正常的等待状态而非故障。
#[derive(Error, Debug)]
pub enum EngineError {
    // 开盘区间所需 K 线尚未齐备
    #[error("Insufficient data: have {have} candles, need {need}")]
    InsufficientData { have: usize, need: usize },
    // 行情数据获取错误
    #[error("Market error: {0}")]
    Market(#[from] MarketError),
    // 配置无法支撑本次运行
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    // 数据本身不合法 (例如 K 线不满足 high >= low)
    #[error("Invalid data: {0}")]
    Data(String),
}

/// # Summary
/// 期权选择失败的原因。对扫描器而言任何一种都意味着丢弃该候选信号。
#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("No option expiries available")]
    NoExpiry,
    #[error("Strike {0} not found in option chain")]
    StrikeNotFound(f64),
    #[error("Premium unavailable or non-positive for strike {0}")]
    InvalidPremium(f64),
    #[error("Market error: {0}")]
    Market(#[from] MarketError),
}
