use async_trait::async_trait;
use orb_core::report::entity::AnalysisArtifact;
use orb_core::store::error::StoreError;
use orb_core::store::port::ArtifactStore;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, warn};

/// # Summary
/// 基于本地 JSON 文件的产物存储。
///
/// # Invariants
/// - 目标文件要么是上一次的完整内容，要么是本次的完整内容，不会出现半写状态。
/// - 临时文件与目标文件位于同一目录，保证重命名在同一文件系统内完成。
pub struct JsonArtifactStore {
    path: PathBuf,
}

impl JsonArtifactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

#[async_trait]
impl ArtifactStore for JsonArtifactStore {
    /// # Summary
    /// 原子写出产物。
    ///
    /// # Logic
    /// 1. 序列化为带缩进的 JSON。
    /// 2. 确保父目录存在。
    /// 3. 写入 `<name>.json.tmp`，再重命名覆盖目标文件。
    /// 4. 任一步失败都删除临时文件，目标文件保持原样。
    async fn save(&self, artifact: &AnalysisArtifact) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(artifact)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(format!("failed to create dir: {e}")))?;
        }

        let tmp = self.tmp_path();
        let written = match fs::write(&tmp, &body).await {
            Ok(()) => fs::rename(&tmp, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp).await
                && cleanup.kind() != ErrorKind::NotFound
            {
                warn!("Failed to remove {}: {}", tmp.display(), cleanup);
            }
            return Err(StoreError::Io(format!("atomic write failed: {e}")));
        }

        debug!("Artifact written to {}", self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<AnalysisArtifact, StoreError> {
        let body = match fs::read(&self.path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        serde_json::from_slice(&body).map_err(|e| StoreError::Serialize(e.to_string()))
    }
}
