//! # 开盘区间突破信号引擎
//!
//! 由指标、开盘区间、准入上下文、突破扫描、期权选择和报告组装组成的纯计算流水线。
//! 行情只通过 `MarketDataProvider` 端口读取，墙钟只通过 `TimeProvider` 读取。

pub mod analyzer;
pub mod assembler;
pub mod context;
pub mod indicators;
pub mod opening_range;
pub mod scanner;
pub mod selector;
