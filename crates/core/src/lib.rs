//! # ORB 信号引擎核心定义
//!
//! 包含实体、错误枚举、端口 (Trait) 以及配置类型。
//! 具体的行情抓取、扫描算法与持久化实现分别位于 `orb-feed`、`orb-engine` 与 `orb-store`。

pub mod common;
pub mod config;
pub mod engine;
pub mod market;
pub mod report;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
