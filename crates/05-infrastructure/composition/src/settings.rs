//! 容器设置
//!
//! 通过 `config` crate 从可选的 TOML 文件和 `SERVICE_INJECTION_` 前缀的环境变量加载，
//! 嵌套键使用 `__` 分隔，例如 `SERVICE_INJECTION_CONTAINER__MAX_RESOLUTION_DEPTH=32`。

use di_abstractions::ContainerConfig;
use infrastructure_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// 环境变量前缀
pub const SETTINGS_ENV_PREFIX: &str = "SERVICE_INJECTION";

/// 日志设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// 日志级别
    pub level: String,
    /// 是否使用 JSON 格式
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// 上下文配置文件设置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// 上下文配置文件路径
    pub file: Option<String>,
    /// 文件不存在时是否报错
    pub required: bool,
}

/// 容器设置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// 日志
    pub logging: LoggingSettings,
    /// 容器
    pub container: ContainerConfig,
    /// 上下文配置文件
    pub context: ContextSettings,
}

impl ContainerSettings {
    /// 仅从环境变量加载
    pub fn from_env() -> ConfigResult<Self> {
        Self::load(None)
    }

    /// 从可选的配置文件和环境变量加载，环境变量优先
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("加载容器设置文件: {}", path.display());
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(SETTINGS_ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::ParseError {
                path: path
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| SETTINGS_ENV_PREFIX.to_string()),
                source: Box::new(e),
            })?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::TypeConversionError {
                message: e.to_string(),
            })
    }
}
