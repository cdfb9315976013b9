use crate::assembler::ReportAssembler;
use crate::context::ContextEvaluator;
use crate::opening_range::{OpeningRangeBuilder, session_candles};
use crate::scanner::BreakoutScanner;
use crate::selector::OptionSelector;
use futures::future::join_all;
use orb_core::common::time::TimeProvider;
use orb_core::config::{AppConfig, InstrumentConfig};
use orb_core::engine::error::EngineError;
use orb_core::market::port::MarketDataProvider;
use orb_core::report::entity::InstrumentReport;
use std::sync::Arc;
use tracing::{error, info, warn};

/// # Summary
/// 单标的分析流水线的入口。
///
/// # Invariants
/// - `analyze` 永不返回错误：任何失败都折叠为带 `Error` 状态的报告。
/// - 对同一份行情快照重复运行，除 `generated_at` 外结果完全一致。
/// - 不持有跨运行状态。
pub struct OrbAnalyzer {
    provider: Arc<dyn MarketDataProvider>,
    config: AppConfig,
    clock: Arc<dyn TimeProvider>,
}

impl OrbAnalyzer {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        config: AppConfig,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            provider,
            config,
            clock,
        }
    }

    /// # Summary
    /// 并发分析全部已配置标的，标的之间互不影响。
    ///
    /// # Returns
    /// 与配置顺序一致的报告列表。
    pub async fn analyze_all(&self) -> Vec<InstrumentReport> {
        join_all(self.config.instruments.iter().map(|inst| self.analyze(inst))).await
    }

    /// # Summary
    /// 分析单个标的并产出报告。
    pub async fn analyze(&self, instrument: &InstrumentConfig) -> InstrumentReport {
        let generated_at = match self.config.session.offset() {
            Ok(offset) => self.clock.session_now(offset),
            Err(_) => self.clock.now().fixed_offset(),
        };
        let assembler = ReportAssembler::new(instrument, generated_at);
        match self.run(instrument, &assembler).await {
            Ok(report) => {
                info!(
                    "{}: {:?} ({} signals)",
                    instrument.name, report.status, report.total_signals
                );
                report
            }
            Err(e) => {
                error!("{}: analysis failed: {}", instrument.name, e);
                assembler.error(&e.to_string())
            }
        }
    }

    /// # Summary
    /// 分析流水线。
    ///
    /// # Logic
    /// 1. 拉取日内 K 线并裁剪为当日时段，数量不足即 `NoData`。
    /// 2. 构建开盘区间，窗口未走完即 `Waiting`。
    /// 3. 波动率准入，不通过即 `VixTooHigh`。
    /// 4. 区间大小准入，不通过即 `RangeTooNarrow`。
    /// 5. 读取前一交易日关键价位 (可缺失)。
    /// 6. 扫描突破并解析期权，得到 `Active` 或 `NoSignals`。
    async fn run(
        &self,
        instrument: &InstrumentConfig,
        assembler: &ReportAssembler<'_>,
    ) -> Result<InstrumentReport, EngineError> {
        let session = &self.config.session;
        let strategy = &self.config.strategy;

        let raw = match self
            .provider
            .fetch_intraday(&instrument.symbol, session.timeframe)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                warn!("{}: intraday data unavailable: {}", instrument.name, e);
                return Ok(assembler.no_data(&e.to_string()));
            }
        };
        let candles = session_candles(&raw, session)?;
        if candles.len() < session.min_session_candles {
            return Ok(assembler.no_data(&format!(
                "only {} session candles, need {}",
                candles.len(),
                session.min_session_candles
            )));
        }

        // 最后一根 K 线可能尚未收盘，现价取倒数第二根
        let current_price = candles
            .len()
            .checked_sub(2)
            .and_then(|i| candles.get(i))
            .map(|c| c.close);

        let orb = match OpeningRangeBuilder::new(session, strategy.open_location_threshold)
            .build(&candles)
        {
            Ok(orb) => orb,
            Err(EngineError::InsufficientData { have, need }) => {
                info!("{}: opening range incomplete ({have}/{need})", instrument.name);
                let window_end = session.opening_window_end()?.format("%H:%M").to_string();
                return Ok(assembler.waiting(&window_end, current_price));
            }
            Err(e) => return Err(e),
        };

        let evaluator = ContextEvaluator::new(strategy);
        let gate = evaluator.volatility(
            self.provider
                .fetch_volatility_index(&self.config.volatility_symbol)
                .await,
        );
        if !gate.safe {
            let context = evaluator.evaluate(gate, orb.range, instrument.min_orb_range, None);
            return Ok(assembler.volatility_too_high(
                &orb,
                &context,
                strategy.max_vix,
                current_price,
            ));
        }
        if orb.range < instrument.min_orb_range {
            let context = evaluator.evaluate(gate, orb.range, instrument.min_orb_range, None);
            return Ok(assembler.range_too_narrow(&orb, &context, current_price));
        }

        let session_date = orb.completed_at.date_naive();
        let previous = evaluator.previous_session(
            self.provider
                .fetch_daily(&instrument.symbol, strategy.daily_lookback_days)
                .await,
            session_date,
        );
        let context = evaluator.evaluate(gate, orb.range, instrument.min_orb_range, previous);

        let selector = OptionSelector::new(
            self.provider.clone(),
            instrument.clone(),
            strategy.premium_target_pct,
            strategy.premium_stoploss_pct,
        );
        let signals = BreakoutScanner::new(strategy, &orb, &context)?
            .scan(&candles, &selector)
            .await;

        Ok(assembler.scanned(&orb, &context, current_price, signals))
    }
}
