//! # ORB 信号引擎应用层
//!
//! 负责配置加载、日志初始化与单次运行编排。具体实现通过 `Arc<dyn Trait>` 注入。

pub mod error;
pub mod logging;
pub mod runner;
pub mod settings;
