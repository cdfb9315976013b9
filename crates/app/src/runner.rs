use crate::error::AppError;
use chrono::{DateTime, FixedOffset};
use orb_core::common::time::TimeProvider;
use orb_core::config::{AppConfig, InstrumentConfig};
use orb_core::market::port::MarketDataProvider;
use orb_core::report::entity::AnalysisArtifact;
use orb_core::store::port::ArtifactStore;
use orb_engine::analyzer::OrbAnalyzer;
use std::sync::Arc;
use tracing::{error, info};

/// 以交易所时区表示的当前时间，配置的时区非法时退回 UTC。
pub fn session_now(clock: &dyn TimeProvider, config: &AppConfig) -> DateTime<FixedOffset> {
    match config.session.offset() {
        Ok(offset) => clock.session_now(offset),
        Err(_) => clock.now().fixed_offset(),
    }
}

/// # Summary
/// 单次完整运行：分析全部标的并写出产物。
///
/// # Logic
/// 1. 并发分析所有标的 (单个标的的失败已折叠进其报告)。
/// 2. 组装产物并原子写出。
///
/// # Returns
/// 写出的产物；仅在写出失败时返回错误。
pub async fn run(
    config: AppConfig,
    provider: Arc<dyn MarketDataProvider>,
    clock: Arc<dyn TimeProvider>,
    store: &dyn ArtifactStore,
) -> Result<AnalysisArtifact, AppError> {
    let generated_at = session_now(clock.as_ref(), &config);
    let strategy = config.strategy.clone();
    let analyzer = OrbAnalyzer::new(provider, config, clock);

    let reports = analyzer.analyze_all().await;
    let active: usize = reports.iter().map(|r| r.total_signals).sum();
    let artifact = AnalysisArtifact::from_reports(strategy, reports, generated_at);
    store.save(&artifact).await?;

    info!(
        "Analysis complete: {} instruments, {} signals",
        artifact.live_signals.len(),
        active
    );
    Ok(artifact)
}

/// # Summary
/// 顶层失败时写出最小产物，保证下游每次运行都能读到文件。
pub async fn write_fallback(
    store: &dyn ArtifactStore,
    instruments: &[InstrumentConfig],
    reason: &str,
    generated_at: DateTime<FixedOffset>,
) -> Result<AnalysisArtifact, AppError> {
    error!("Engine error, writing fallback artifact: {reason}");
    let artifact = AnalysisArtifact::fallback(instruments, reason, generated_at);
    store.save(&artifact).await?;
    Ok(artifact)
}
