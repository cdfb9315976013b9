use async_trait::async_trait;
use chrono::NaiveDate;
use orb_core::common::{Direction, OptionSide};
use orb_core::config::{SessionConfig, StrategyConfig};
use orb_core::engine::entity::{
    OpeningRange, OptionPick, PreviousSessionLevels, SessionContext,
};
use orb_core::engine::error::SelectionError;
use orb_core::engine::port::ContractResolver;
use orb_core::market::entity::Candle;
use orb_core::testing::five_minute_session;
use orb_engine::opening_range::OpeningRangeBuilder;
use orb_engine::scanner::{BreakoutScanner, Rejection, ScanState};
use rust_decimal_macros::dec;
use std::sync::Mutex;

/// # Summary
/// 固定返回同一合约的解析器，记录每次请求的入场价。
struct FixedResolver {
    requests: Mutex<Vec<f64>>,
    fail: bool,
}

impl FixedResolver {
    fn new(fail: bool) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail,
        }
    }

    fn requests(&self) -> Vec<f64> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContractResolver for FixedResolver {
    async fn resolve(
        &self,
        entry_price: f64,
        direction: Direction,
    ) -> Result<OptionPick, SelectionError> {
        self.requests.lock().unwrap().push(entry_price);
        if self.fail {
            return Err(SelectionError::NoExpiry);
        }
        Ok(OptionPick {
            strike: 90.0,
            side: direction.option_side(),
            option_symbol: format!("TEST 12FEB26 90 {}", direction.option_side().code()),
            premium_entry: dec!(10),
            target_premium: dec!(13),
            stoploss_premium: dec!(6.5),
            expiry: NaiveDate::from_ymd_opt(2026, 2, 12).unwrap(),
            open_interest: None,
            volume: None,
        })
    }
}

/// # Summary
/// 开盘区间 90-100；第 17 根 (10:40) 向上突破；第 18 根回到区间内；
/// 第 19 根再次向上突破，其入场价 (96.5) 与上一信号入场价 (96) 仅差 0.5。
fn double_breakout_session() -> Vec<Candle> {
    let mut rows = vec![
        (95.0, 100.0, 92.0, 96.0, 1000.0),
        (96.0, 98.0, 90.0, 94.0, 1000.0),
        (94.0, 97.0, 91.0, 95.0, 1000.0),
        (95.0, 97.0, 92.0, 96.0, 1000.0),
        (96.0, 98.0, 93.0, 97.0, 1000.0),
        (97.0, 99.0, 94.0, 96.0, 1000.0),
    ];
    rows.extend(std::iter::repeat_n((96.0, 100.0, 92.0, 96.0, 1000.0), 11));
    rows.push((94.0, 102.0, 92.0, 101.0, 2250.0));
    rows.push((100.0, 101.0, 93.0, 96.5, 1000.0));
    rows.push((94.0, 103.0, 93.0, 101.0, 3000.0));
    rows.push((96.0, 100.0, 92.0, 96.0, 1000.0));
    five_minute_session(&rows)
}

/// # Summary
/// 与 `double_breakout_session` 以 95 为轴镜像：开盘区间仍为 90-100，
/// 第 17 根 (10:40) 放量阴线收于 89 跌破下沿，前一根收于 94。
fn breakdown_session() -> Vec<Candle> {
    let mut rows = vec![
        (95.0, 98.0, 90.0, 94.0, 1000.0),
        (94.0, 100.0, 92.0, 96.0, 1000.0),
        (96.0, 99.0, 93.0, 95.0, 1000.0),
        (95.0, 98.0, 93.0, 94.0, 1000.0),
        (94.0, 97.0, 92.0, 93.0, 1000.0),
        (93.0, 96.0, 91.0, 94.0, 1000.0),
    ];
    rows.extend(std::iter::repeat_n((94.0, 98.0, 90.0, 94.0, 1000.0), 11));
    rows.push((96.0, 98.0, 88.0, 89.0, 2250.0));
    rows.push((94.0, 98.0, 90.0, 94.0, 1000.0));
    five_minute_session(&rows)
}

fn opening_range(candles: &[Candle]) -> OpeningRange {
    OpeningRangeBuilder::new(&SessionConfig::default(), 0.2)
        .build(candles)
        .unwrap()
}

fn open_context() -> SessionContext {
    SessionContext {
        volatility_index_value: Some(14.0),
        volatility_safe: true,
        min_range_required: 5.0,
        range_adequate: true,
        previous_session: None,
    }
}

#[tokio::test]
async fn test_overtrading_suppresses_second_breakout() {
    let candles = double_breakout_session();
    let cfg = StrategyConfig::default();
    let orb = opening_range(&candles);
    let ctx = open_context();
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    let resolver = FixedResolver::new(false);

    let signals = scanner.scan(&candles, &resolver).await;
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].candle_index, 17);
    assert_eq!(resolver.requests(), vec![96.0]);

    assert_eq!(
        scanner.evaluate(&candles, 18, &ScanState::with_last_signal(17, 96.0)),
        Err(Rejection::Cooldown)
    );
    assert_eq!(
        scanner.evaluate(&candles, 19, &ScanState::with_last_signal(17, 96.0)),
        Err(Rejection::Overtrading)
    );
    let fresh = scanner.evaluate(&candles, 19, &ScanState::new()).unwrap();
    assert_eq!(fresh.direction, Direction::Up);
    assert_eq!(fresh.entry_price, 96.5);
}

#[tokio::test]
async fn test_signals_respect_cooldown_and_cap() {
    let candles = double_breakout_session();
    let mut cfg = StrategyConfig::default();
    cfg.overtrading_distance = 0.0;
    let orb = opening_range(&candles);
    let ctx = open_context();

    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    let signals = scanner.scan(&candles, &FixedResolver::new(false)).await;
    assert_eq!(signals.len(), 2);
    for pair in signals.windows(2) {
        assert!(pair[1].candle_index - pair[0].candle_index >= cfg.cooldown_candles);
        assert!(pair[0].timestamp < pair[1].timestamp);
    }

    cfg.max_signals = 1;
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    let signals = scanner.scan(&candles, &FixedResolver::new(false)).await;
    assert_eq!(signals.len(), 1);
}

#[tokio::test]
async fn test_failed_resolution_does_not_update_state() {
    let candles = double_breakout_session();
    let cfg = StrategyConfig::default();
    let orb = opening_range(&candles);
    let ctx = open_context();
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    let resolver = FixedResolver::new(true);

    let signals = scanner.scan(&candles, &resolver).await;
    assert!(signals.is_empty());
    // 第一个候选被丢弃后，第二个候选不受冷却与防过度交易约束
    assert_eq!(resolver.requests(), vec![96.0, 96.5]);
}

#[test]
fn test_stale_move_rejected() {
    let candles = double_breakout_session();
    let mut cfg = StrategyConfig::default();
    cfg.fresh_move_window_minutes = 30;
    let orb = opening_range(&candles);
    let ctx = open_context();
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    assert_eq!(
        scanner.evaluate(&candles, 17, &ScanState::new()),
        Err(Rejection::Stale)
    );
}

#[test]
fn test_weak_volume_rejected() {
    let mut candles = double_breakout_session();
    candles[17].volume = 1500.0;
    let cfg = StrategyConfig::default();
    let orb = opening_range(&candles);
    let ctx = open_context();
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    assert_eq!(
        scanner.evaluate(&candles, 17, &ScanState::new()),
        Err(Rejection::NoVolumeSurge)
    );
}

#[test]
fn test_weak_body_rejected() {
    let mut candles = double_breakout_session();
    // 实体 |101 - 97| / 10 = 40%
    candles[17].open = 97.0;
    let cfg = StrategyConfig::default();
    let orb = opening_range(&candles);
    let ctx = open_context();
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    assert_eq!(
        scanner.evaluate(&candles, 17, &ScanState::new()),
        Err(Rejection::WeakBody)
    );
}

#[test]
fn test_previous_day_level_traps() {
    let candles = double_breakout_session();
    let cfg = StrategyConfig::default();
    let orb = opening_range(&candles);

    let mut ctx = open_context();
    ctx.previous_session = Some(PreviousSessionLevels {
        high: 96.5,
        low: 80.0,
        close: 90.0,
        value_area_high: 94.0,
        value_area_low: 82.0,
    });
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    assert_eq!(
        scanner.evaluate(&candles, 17, &ScanState::new()),
        Err(Rejection::NearPriorExtreme)
    );

    ctx.previous_session = Some(PreviousSessionLevels {
        high: 200.0,
        low: 50.0,
        close: 120.0,
        value_area_high: 177.5,
        value_area_low: 72.5,
    });
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    assert_eq!(
        scanner.evaluate(&candles, 17, &ScanState::new()),
        Err(Rejection::InsideValueArea)
    );
}

#[test]
fn test_counter_bias_needs_stronger_candle() {
    let candles = double_breakout_session();
    let mut cfg = StrategyConfig::default();
    let mut orb = opening_range(&candles);
    orb.bias = Some(Direction::Down);
    let ctx = open_context();

    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    assert_eq!(
        scanner.evaluate(&candles, 17, &ScanState::new()),
        Err(Rejection::CounterBias)
    );

    cfg.counter_bias_body_pct = 65.0;
    cfg.counter_bias_volume_ratio = 2.0;
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    let breakout = scanner.evaluate(&candles, 17, &ScanState::new()).unwrap();
    assert_eq!(breakout.direction, Direction::Up);
    assert_eq!(breakout.direction.option_side(), OptionSide::Call);
}

#[test]
fn test_inside_range_is_not_a_breakout() {
    let candles = double_breakout_session();
    let cfg = StrategyConfig::default();
    let orb = opening_range(&candles);
    let ctx = open_context();
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    assert_eq!(
        scanner.evaluate(&candles, 10, &ScanState::new()),
        Err(Rejection::NoBreakout)
    );
}

#[tokio::test]
async fn test_downside_breakout_buys_puts() {
    let candles = breakdown_session();
    let cfg = StrategyConfig::default();
    let orb = opening_range(&candles);
    assert_eq!((orb.high, orb.low), (100.0, 90.0));
    let ctx = open_context();
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();

    let breakout = scanner.evaluate(&candles, 17, &ScanState::new()).unwrap();
    assert_eq!(breakout.direction, Direction::Down);
    // 入场价取前一根收盘价，距离取触发 K 线收盘价
    assert_eq!(breakout.entry_price, 94.0);
    assert_eq!(breakout.distance_from_boundary, 1.0);

    let resolver = FixedResolver::new(false);
    let signals = scanner.scan(&candles, &resolver).await;
    assert_eq!(signals.len(), 1);
    let signal = &signals[0];
    assert_eq!(signal.candle_index, 17);
    assert_eq!(signal.direction, Direction::Down);
    assert_eq!(signal.entry_price, 94.0);
    assert_eq!(signal.quality.distance_from_orb, 1.0);
    assert!(signal.option_symbol.ends_with("PE"));
    assert_eq!(resolver.requests(), vec![94.0]);
}

#[test]
fn test_downside_breakout_near_previous_low_rejected() {
    let candles = breakdown_session();
    let cfg = StrategyConfig::default();
    let orb = opening_range(&candles);
    let mut ctx = open_context();
    // |94 - 95| = 1 < 0.25 * 10
    ctx.previous_session = Some(PreviousSessionLevels {
        high: 120.0,
        low: 95.0,
        close: 110.0,
        value_area_high: 116.25,
        value_area_low: 98.75,
    });
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    assert_eq!(
        scanner.evaluate(&candles, 17, &ScanState::new()),
        Err(Rejection::NearPriorExtreme)
    );
}

#[test]
fn test_missing_volume_is_skipped() {
    let mut candles = double_breakout_session();
    for c in &mut candles {
        c.volume = 0.0;
    }
    let cfg = StrategyConfig::default();
    let orb = opening_range(&candles);
    let ctx = open_context();
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    assert_eq!(
        scanner.evaluate(&candles, 17, &ScanState::new()),
        Err(Rejection::NoVolumeData)
    );
}

#[test]
fn test_small_candle_rejected() {
    let mut candles = breakdown_session();
    // 实体 100%，但振幅 1.5 < 0.35 * 10
    candles[17].open = 90.5;
    candles[17].high = 90.5;
    candles[17].low = 89.0;
    let cfg = StrategyConfig::default();
    let orb = opening_range(&candles);
    let ctx = open_context();
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    assert_eq!(
        scanner.evaluate(&candles, 17, &ScanState::new()),
        Err(Rejection::SmallCandle)
    );
}

#[test]
fn test_contracting_atr_rejected() {
    let mut candles = double_breakout_session();
    // 第 16 根真实波幅 1，小于移出窗口的第 2 根 (6)，ATR 下降
    candles[16].high = 96.5;
    candles[16].low = 95.5;
    let cfg = StrategyConfig::default();
    let orb = opening_range(&candles);
    let ctx = open_context();
    let scanner = BreakoutScanner::new(&cfg, &orb, &ctx).unwrap();
    assert_eq!(
        scanner.evaluate(&candles, 17, &ScanState::new()),
        Err(Rejection::AtrNotExpanding)
    );
}
