use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理文件读写与序列化失败。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 文件系统操作失败
    #[error("IO error: {0}")]
    Io(String),
    /// 序列化或反序列化失败
    #[error("Serialize error: {0}")]
    Serialize(String),
    /// 产物尚不存在
    #[error("Not found")]
    NotFound,
}
