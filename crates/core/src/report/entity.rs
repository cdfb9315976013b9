use crate::common::Direction;
use crate::config::{InstrumentConfig, StrategyConfig};
use crate::engine::entity::{OpeningRange, PreviousSessionLevels, SessionContext, Signal};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// # Summary
/// 单个标的本次运行的状态分类。
///
/// # Invariants
/// - 每次运行每个标的恰好一种状态，按 数据存在 → 开盘区间形成 → 波动率安全 →
///   区间足够 → 扫描结果 的顺序判定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Waiting,
    NoData,
    VixTooHigh,
    RangeTooNarrow,
    NoSignals,
    Active,
    Error,
}

/// 报告中的开盘区间摘要。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningRangeSummary {
    pub high: f64,
    pub low: f64,
    pub size: f64,
    pub open_bias: Option<Direction>,
    pub bias_reason: String,
}

impl From<&OpeningRange> for OpeningRangeSummary {
    fn from(orb: &OpeningRange) -> Self {
        Self {
            high: orb.high,
            low: orb.low,
            size: orb.range,
            open_bias: orb.bias,
            bias_reason: orb.bias_reason.clone(),
        }
    }
}

/// 报告中的市场背景摘要。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketContextSummary {
    pub vix: Option<f64>,
    pub vix_safe: bool,
    pub orb_range_adequate: bool,
    pub min_range_required: f64,
    pub previous_day: Option<PreviousSessionLevels>,
}

impl From<&SessionContext> for MarketContextSummary {
    fn from(ctx: &SessionContext) -> Self {
        Self {
            vix: ctx.volatility_index_value,
            vix_safe: ctx.volatility_safe,
            orb_range_adequate: ctx.range_adequate,
            min_range_required: ctx.min_range_required,
            previous_day: ctx.previous_session.clone(),
        }
    }
}

/// # Summary
/// 单个标的的完整分析报告。
///
/// # Invariants
/// - 组装完成后不再修改。
/// - `signals` 为空且 `status` 非 `Error` 表示 "暂无信号" 而非故障。
/// - `generated_at` 是唯一依赖墙钟的字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentReport {
    pub index: String,
    pub status: ReportStatus,
    pub message: String,
    pub total_signals: usize,
    pub current_price: Option<f64>,
    pub opening_range: Option<OpeningRangeSummary>,
    pub market_context: Option<MarketContextSummary>,
    pub signals: Vec<Signal>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    pub generated_at: Option<DateTime<FixedOffset>>,
}

/// # Summary
/// 整体运行状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactStatus {
    Ok,
    EngineError,
}

pub const STRATEGY_NAME: &str = "Opening Range Breakout Options Engine";
pub const DISCLAIMER: &str = "Educational only. Not financial advice. Trade at your own risk.";

/// # Summary
/// 每次运行写出的 JSON 产物。
///
/// # Invariants
/// - 即使顶层失败也必须产出 (降级为 `EngineError` 状态)，下游自动化依赖其存在。
/// - `live_signals` 以标的小写名称为键，按键有序，保证序列化结果稳定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisArtifact {
    pub strategy: String,
    pub status: ArtifactStatus,
    pub configuration: Option<StrategyConfig>,
    pub live_signals: BTreeMap<String, InstrumentReport>,
    pub generated_at: DateTime<FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    pub disclaimer: String,
}

impl AnalysisArtifact {
    /// # Summary
    /// 由各标的报告构造正常产物。
    pub fn from_reports(
        configuration: StrategyConfig,
        reports: Vec<InstrumentReport>,
        generated_at: DateTime<FixedOffset>,
    ) -> Self {
        let live_signals = reports
            .into_iter()
            .map(|r| (r.index.to_lowercase(), r))
            .collect();
        Self {
            strategy: STRATEGY_NAME.to_string(),
            status: ArtifactStatus::Ok,
            configuration: Some(configuration),
            live_signals,
            generated_at,
            error: None,
            disclaimer: DISCLAIMER.to_string(),
        }
    }

    /// # Summary
    /// 顶层失败时的最小产物。
    ///
    /// # Logic
    /// 1. 为每个已配置标的生成 `Error` 状态且信号为空的报告。
    /// 2. 记录错误文本，整体状态为 `EngineError`。
    pub fn fallback(
        instruments: &[InstrumentConfig],
        error: &str,
        generated_at: DateTime<FixedOffset>,
    ) -> Self {
        let live_signals = instruments
            .iter()
            .map(|inst| {
                (
                    inst.key(),
                    InstrumentReport {
                        index: inst.name.clone(),
                        status: ReportStatus::Error,
                        message: "Engine encountered an error; artifact written for automation"
                            .to_string(),
                        total_signals: 0,
                        current_price: None,
                        opening_range: None,
                        market_context: None,
                        signals: Vec::new(),
                        error: Some(error.to_string()),
                        generated_at: Some(generated_at),
                    },
                )
            })
            .collect();
        Self {
            strategy: STRATEGY_NAME.to_string(),
            status: ArtifactStatus::EngineError,
            configuration: None,
            live_signals,
            generated_at,
            error: Some(error.to_string()),
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}
