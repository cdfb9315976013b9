use orb_core::config::ConfigError;
use orb_core::store::error::StoreError;
use thiserror::Error;

/// # Summary
/// 应用层错误：配置加载与产物写出。
///
/// # Invariants
/// - 单个标的的分析失败不会出现在这里，它们已折叠进报告。
#[derive(Error, Debug)]
pub enum AppError {
    // 配置源读取或反序列化失败
    #[error("Config load error: {0}")]
    Load(#[from] config::ConfigError),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
