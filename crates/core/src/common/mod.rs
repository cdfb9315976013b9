pub mod time;

use serde::{Deserialize, Serialize};

/// # Summary
/// 交易时间周期枚举，定义 K 线的时间跨度。
///
/// # Invariants
/// - 日内扫描只使用分钟级周期，日线仅用于前一交易日关键价位。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeFrame {
    // 1分钟
    Minute1,
    // 5分钟
    Minute5,
    // 15分钟
    Minute15,
    // 1日
    Day1,
}

impl TimeFrame {
    /// 单根 K 线覆盖的分钟数。
    pub fn minutes(&self) -> i64 {
        match self {
            TimeFrame::Minute1 => 1,
            TimeFrame::Minute5 => 5,
            TimeFrame::Minute15 => 15,
            TimeFrame::Day1 => 24 * 60,
        }
    }
}

/// # Summary
/// 突破方向。向上突破对应认购期权 (CE)，向下突破对应认沽期权 (PE)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// 该方向交易所对应的期权类型。
    pub fn option_side(&self) -> OptionSide {
        match self {
            Direction::Up => OptionSide::Call,
            Direction::Down => OptionSide::Put,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

/// # Summary
/// 期权合约类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    /// NSE 合约代码后缀。
    pub fn code(&self) -> &'static str {
        match self {
            OptionSide::Call => "CE",
            OptionSide::Put => "PE",
        }
    }
}
