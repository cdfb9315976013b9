use orb_core::config::{AppConfig, StrategyConfig};
use orb_core::report::entity::{AnalysisArtifact, ArtifactStatus, ReportStatus};
use orb_core::store::error::StoreError;
use orb_core::store::port::ArtifactStore;
use orb_core::testing::at;
use orb_store::artifact::JsonArtifactStore;
use tempfile::tempdir;

#[tokio::test]
async fn test_save_then_load() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = JsonArtifactStore::new(dir.path().join("out").join("orb.json"));

    let artifact = AnalysisArtifact::from_reports(StrategyConfig::default(), Vec::new(), at(10, 0));
    store.save(&artifact).await?;

    let loaded = store.load().await?;
    assert_eq!(loaded, artifact);
    assert_eq!(loaded.status, ArtifactStatus::Ok);
    assert!(!dir.path().join("out").join("orb.json.tmp").exists());
    Ok(())
}

#[tokio::test]
async fn test_overwrite_replaces_previous_run() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("orb.json");
    let store = JsonArtifactStore::new(&path);
    let config = AppConfig::default();

    let first = AnalysisArtifact::from_reports(config.strategy.clone(), Vec::new(), at(10, 0));
    store.save(&first).await?;
    let second = AnalysisArtifact::fallback(&config.instruments, "feed offline", at(10, 5));
    store.save(&second).await?;

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(raw["status"], "ENGINE_ERROR");
    assert_eq!(raw["live_signals"]["nifty"]["status"], "ERROR");
    assert_eq!(raw["live_signals"]["banknifty"]["signals"], serde_json::json!([]));

    let loaded = store.load().await?;
    assert_eq!(loaded.error.as_deref(), Some("feed offline"));
    assert!(
        loaded
            .live_signals
            .values()
            .all(|r| r.status == ReportStatus::Error)
    );
    Ok(())
}

#[tokio::test]
async fn test_load_missing_artifact() {
    let dir = tempdir().unwrap();
    let store = JsonArtifactStore::new(dir.path().join("absent.json"));
    assert!(matches!(store.load().await, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn test_failed_write_keeps_previous_file() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("orb.json");
    let store = JsonArtifactStore::new(&path);
    let artifact = AnalysisArtifact::from_reports(StrategyConfig::default(), Vec::new(), at(10, 0));
    store.save(&artifact).await?;

    // 以目录占住临时文件路径，使写入失败
    std::fs::create_dir(dir.path().join("orb.json.tmp"))?;
    let next = AnalysisArtifact::from_reports(StrategyConfig::default(), Vec::new(), at(11, 0));
    assert!(matches!(store.save(&next).await, Err(StoreError::Io(_))));

    assert_eq!(store.load().await?, artifact);
    Ok(())
}
