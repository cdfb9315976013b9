use super::error::StoreError;
use crate::report::entity::AnalysisArtifact;
use async_trait::async_trait;

/// # Summary
/// 分析产物的持久化接口。
///
/// # Invariants
/// - `save` 必须是原子替换：读者要么看到旧文件，要么看到完整的新文件。
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// # Summary
    /// 写出本次运行的产物，覆盖上一次的结果。
    ///
    /// # Arguments
    /// * `artifact`: 待写出的产物。
    ///
    /// # Returns
    /// 成功返回 Ok，失败返回 `StoreError`。
    async fn save(&self, artifact: &AnalysisArtifact) -> Result<(), StoreError>;

    /// # Summary
    /// 读取最近一次写出的产物。
    ///
    /// # Returns
    /// 文件不存在时返回 `StoreError::NotFound`。
    async fn load(&self) -> Result<AnalysisArtifact, StoreError>;
}
