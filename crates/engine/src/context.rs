use chrono::NaiveDate;
use orb_core::config::StrategyConfig;
use orb_core::engine::entity::{PreviousSessionLevels, SessionContext};
use orb_core::market::entity::Candle;
use orb_core::market::error::MarketError;
use tracing::warn;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// # Summary
/// 波动率指数准入结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityGate {
    pub value: Option<f64>,
    pub safe: bool,
}

/// # Summary
/// 时段级准入评估器。
///
/// # Invariants
/// - 波动率数据源不可用时放行 (fail-open)，因为本系统只给出建议。
/// - 前一交易日数据不可用时不启用关键价位过滤。
pub struct ContextEvaluator<'a> {
    config: &'a StrategyConfig,
}

impl<'a> ContextEvaluator<'a> {
    pub fn new(config: &'a StrategyConfig) -> Self {
        Self { config }
    }

    /// # Summary
    /// 波动率准入：最新值大于等于上限即视为不适合买入期权。
    ///
    /// # Arguments
    /// * `reading`: 数据源返回结果，失败时放行。
    pub fn volatility(&self, reading: Result<f64, MarketError>) -> VolatilityGate {
        match reading {
            Ok(v) if v.is_finite() => VolatilityGate {
                value: Some(round2(v)),
                safe: v < self.config.max_vix,
            },
            Ok(v) => {
                warn!("Volatility index returned non-finite value {v}, treating as safe");
                VolatilityGate {
                    value: None,
                    safe: true,
                }
            }
            Err(e) => {
                warn!("Volatility index unavailable ({e}), treating as safe");
                VolatilityGate {
                    value: None,
                    safe: true,
                }
            }
        }
    }

    /// # Summary
    /// 从日线中提取前一交易日关键价位及价值区。
    ///
    /// # Logic
    /// 1. 选取日期早于当前交易日的最后一根日线。
    /// 2. 价值区 = [low + 15% * range, low + 85% * range] (比例可配置)。
    ///
    /// # Arguments
    /// * `daily`: 数据源返回的日线结果，失败时返回 None。
    /// * `session_date`: 当前交易日。
    pub fn previous_session(
        &self,
        daily: Result<Vec<Candle>, MarketError>,
        session_date: NaiveDate,
    ) -> Option<PreviousSessionLevels> {
        let bars = match daily {
            Ok(bars) => bars,
            Err(e) => {
                warn!("Previous session levels unavailable: {e}");
                return None;
            }
        };
        let prev = bars
            .iter()
            .filter(|c| c.time.date_naive() < session_date)
            .max_by_key(|c| c.time)?;
        let range = prev.high - prev.low;
        if range <= 0.0 {
            return None;
        }
        Some(PreviousSessionLevels {
            high: round2(prev.high),
            low: round2(prev.low),
            close: round2(prev.close),
            value_area_high: round2(prev.low + range * self.config.value_area_high_pct),
            value_area_low: round2(prev.low + range * self.config.value_area_low_pct),
        })
    }

    /// # Summary
    /// 汇总时段准入事实。
    ///
    /// # Logic
    /// 开盘区间小于标的最小区间即判定为窄幅震荡日。
    pub fn evaluate(
        &self,
        volatility: VolatilityGate,
        orb_range: f64,
        min_range_required: f64,
        previous_session: Option<PreviousSessionLevels>,
    ) -> SessionContext {
        SessionContext {
            volatility_index_value: volatility.value,
            volatility_safe: volatility.safe,
            min_range_required,
            range_adequate: orb_range >= min_range_required,
            previous_session,
        }
    }
}
