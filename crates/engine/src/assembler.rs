use chrono::{DateTime, FixedOffset};
use orb_core::config::InstrumentConfig;
use orb_core::engine::entity::{OpeningRange, SessionContext, Signal};
use orb_core::report::entity::{
    InstrumentReport, MarketContextSummary, OpeningRangeSummary, ReportStatus,
};

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// # Summary
/// 单个标的的报告组装器。
///
/// # Invariants
/// - 每个方法恰好产出一种状态的报告，组装后报告不再修改。
/// - `generated_at` 由调用方从时钟取得，组装器本身不读取墙钟。
pub struct ReportAssembler<'a> {
    instrument: &'a InstrumentConfig,
    generated_at: DateTime<FixedOffset>,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(instrument: &'a InstrumentConfig, generated_at: DateTime<FixedOffset>) -> Self {
        Self {
            instrument,
            generated_at,
        }
    }

    fn base(&self, status: ReportStatus, message: String) -> InstrumentReport {
        InstrumentReport {
            index: self.instrument.name.clone(),
            status,
            message,
            total_signals: 0,
            current_price: None,
            opening_range: None,
            market_context: None,
            signals: Vec::new(),
            error: None,
            generated_at: Some(self.generated_at),
        }
    }

    fn summary(orb: &OpeningRange) -> OpeningRangeSummary {
        let mut summary = OpeningRangeSummary::from(orb);
        summary.high = round2(summary.high);
        summary.low = round2(summary.low);
        summary.size = round2(summary.size);
        summary
    }

    pub fn no_data(&self, detail: &str) -> InstrumentReport {
        let mut report = self.base(
            ReportStatus::NoData,
            format!("Not enough data for {}", self.instrument.name),
        );
        report.error = Some(detail.to_string());
        report
    }

    pub fn waiting(&self, window_end: &str, current_price: Option<f64>) -> InstrumentReport {
        let mut report = self.base(
            ReportStatus::Waiting,
            format!("Opening range not yet formed (wait till {window_end})"),
        );
        report.current_price = current_price;
        report
    }

    pub fn volatility_too_high(
        &self,
        orb: &OpeningRange,
        context: &SessionContext,
        max_vix: f64,
        current_price: Option<f64>,
    ) -> InstrumentReport {
        let value = context
            .volatility_index_value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        let mut report = self.base(
            ReportStatus::VixTooHigh,
            format!("Volatility index at {value} - too high for options buying (need < {max_vix})"),
        );
        report.current_price = current_price;
        report.opening_range = Some(Self::summary(orb));
        report.market_context = Some(MarketContextSummary::from(context));
        report
    }

    pub fn range_too_narrow(
        &self,
        orb: &OpeningRange,
        context: &SessionContext,
        current_price: Option<f64>,
    ) -> InstrumentReport {
        let mut report = self.base(
            ReportStatus::RangeTooNarrow,
            format!(
                "ORB range {:.2} too narrow (need >= {}) - likely choppy day",
                orb.range, context.min_range_required
            ),
        );
        report.current_price = current_price;
        report.opening_range = Some(Self::summary(orb));
        report.market_context = Some(MarketContextSummary::from(context));
        report
    }

    /// # Summary
    /// 扫描完成后的报告：有信号为 `Active`，否则为 `NoSignals`。
    pub fn scanned(
        &self,
        orb: &OpeningRange,
        context: &SessionContext,
        current_price: Option<f64>,
        signals: Vec<Signal>,
    ) -> InstrumentReport {
        let (status, message) = if signals.is_empty() {
            (
                ReportStatus::NoSignals,
                "No high-quality breakout signals yet".to_string(),
            )
        } else {
            (
                ReportStatus::Active,
                format!("{} high-probability signal(s) generated", signals.len()),
            )
        };
        let mut report = self.base(status, message);
        report.total_signals = signals.len();
        report.current_price = current_price;
        report.opening_range = Some(Self::summary(orb));
        report.market_context = Some(MarketContextSummary::from(context));
        report.signals = signals;
        report
    }

    pub fn error(&self, detail: &str) -> InstrumentReport {
        let mut report = self.base(
            ReportStatus::Error,
            format!("Analysis failed for {}", self.instrument.name),
        );
        report.error = Some(detail.to_string());
        report
    }
}
