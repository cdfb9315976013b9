//! # 行情数据源
//!
//! `MarketDataProvider` 的 Yahoo Finance 实现：日内/日线 K 线、波动率指数与期权链。

pub mod yahoo;
