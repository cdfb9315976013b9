use crate::error::AppError;
use config::{Config, Environment, File};
use orb_core::config::AppConfig;
use std::path::Path;

/// 环境变量前缀，例如 `ORB__STRATEGY__MAX_VIX=18`。
pub const ENV_PREFIX: &str = "ORB";

/// # Summary
/// 按优先级合并配置源。
///
/// # Logic
/// 1. 以内置默认值为底。
/// 2. 叠加可选的配置文件 (不存在时跳过)。
/// 3. 叠加 `ORB__` 前缀的环境变量，`__` 分隔层级。
/// 4. 反序列化后执行自洽性校验。
///
/// # Arguments
/// * `path`: 配置文件路径，格式由扩展名推断。
///
/// # Returns
/// 任一步失败返回 `AppError`。
pub fn load(path: &Path) -> Result<AppConfig, AppError> {
    let settings = Config::builder()
        .add_source(Config::try_from(&AppConfig::default())?)
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    let app: AppConfig = settings.try_deserialize()?;
    app.validate()?;
    Ok(app)
}
