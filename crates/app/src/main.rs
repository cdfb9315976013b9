use orb_app::{logging, runner, settings};
use orb_core::common::time::{RealTimeProvider, TimeProvider};
use orb_core::config::AppConfig;
use orb_feed::yahoo::YahooProvider;
use orb_store::artifact::JsonArtifactStore;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_CONFIG: &str = "orb.toml";

/// 构造数据源并执行一次分析。
async fn analyze(
    config: AppConfig,
    clock: Arc<dyn TimeProvider>,
    store: &JsonArtifactStore,
) -> Result<(), String> {
    let offset = config.session.offset().map_err(|e| e.to_string())?;
    let feed = Arc::new(YahooProvider::new(offset).map_err(|e| e.to_string())?);
    runner::run(config, feed, clock, store)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
///
/// # Logic
/// 1. 加载配置 (失败时以默认配置继续，仅用于写出降级产物)。
/// 2. 初始化全局日志。
/// 3. 实例化基础设施层 (Feed、Store、Clock)。
/// 4. 执行一次分析并写出产物；任何顶层失败都写出降级产物。
#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let loaded = settings::load(&config_path);
    let config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => AppConfig::default(),
    };

    let _guard = logging::init(&config.logging);
    info!("ORB signal engine starting (config: {})", config_path.display());

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("TLS crypto provider already installed");
    }

    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);
    let store = JsonArtifactStore::new(&config.output.path);

    let outcome = match loaded {
        Ok(cfg) => analyze(cfg, clock.clone(), &store).await,
        Err(e) => Err(e.to_string()),
    };

    if let Err(reason) = outcome {
        let now = runner::session_now(clock.as_ref(), &config);
        if let Err(e) = runner::write_fallback(&store, &config.instruments, &reason, now).await {
            error!("Failed to write fallback artifact: {e}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
