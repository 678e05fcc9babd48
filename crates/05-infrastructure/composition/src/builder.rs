//! 基础设施构建器

use crate::infrastructure::ServiceInfrastructure;
use crate::settings::{ContainerSettings, LoggingSettings};
use di_abstractions::CodeModule;
use di_impl::{ContainerExtension, DependencyInjection};
use infrastructure_common::{InfrastructureError, InfrastructureResult};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 基础设施构建器
///
/// 使用建造者模式组装容器、根模块和日志
pub struct InfrastructureBuilder {
    /// 根模块
    root: Option<Arc<CodeModule>>,
    /// 容器设置
    settings: ContainerSettings,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
    /// 容器扩展
    extensions: Vec<Arc<dyn ContainerExtension>>,
}

impl InfrastructureBuilder {
    /// 创建新的基础设施构建器
    pub fn new() -> Self {
        Self {
            root: None,
            settings: ContainerSettings::default(),
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: LoggingConfig::default(),
            extensions: Vec::new(),
        }
    }

    /// 设置根模块
    pub fn with_root_module(mut self, root: Arc<CodeModule>) -> Self {
        self.root = Some(root);
        self
    }

    /// 添加容器扩展
    pub fn with_extension(mut self, extension: Arc<dyn ContainerExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// 使用指定的容器设置
    pub fn with_settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 从配置文件和环境变量加载容器设置
    pub fn load_settings<P: AsRef<Path>>(mut self, path: Option<P>) -> InfrastructureResult<Self> {
        let path: Option<&Path> = path.as_ref().map(|p| p.as_ref());
        if let Some(path) = path {
            info!("加载容器设置: {}", path.display());
        }
        self.settings = ContainerSettings::load(path)?;
        Ok(self)
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true; // 启用日志初始化
        self
    }

    /// 按容器设置中的日志部分配置日志
    pub fn with_logging_from_settings(self) -> Self {
        let config = LoggingConfig::from_settings(&self.settings.logging);
        self.with_logging(config)
    }

    /// 容器设置
    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    /// 构建基础设施实例
    pub fn build(self) -> InfrastructureResult<ServiceInfrastructure> {
        // 只有在明确配置了日志时才初始化日志
        // 避免在测试环境中重复初始化
        if self.logging_enabled {
            self.logging_config.try_init()?;
        }

        info!("开始构建基础设施");
        let root = self.root.ok_or_else(|| InfrastructureError::BootstrapFailed {
            message: "未设置根模块".to_string(),
        })?;

        let container =
            DependencyInjection::with_extensions(self.settings.container.clone(), self.extensions);
        let infrastructure = ServiceInfrastructure::new(container, root, self.settings);

        info!("基础设施构建完成");
        Ok(infrastructure)
    }
}

impl Default for InfrastructureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 从日志设置创建，无法识别的级别回退为 INFO
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        let level = tracing::Level::from_str(&settings.level).unwrap_or_else(|_| {
            warn!("无法识别的日志级别: {}, 使用 INFO", settings.level);
            tracing::Level::INFO
        });
        Self {
            level,
            json_format: settings.json,
            ..Self::default()
        }
    }

    /// 初始化全局日志订阅器
    ///
    /// 设置了 `RUST_LOG` 时以其为准。已经初始化过时返回错误。
    pub fn try_init(&self) -> InfrastructureResult<()> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_lowercase()));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_file(self.show_file)
            .with_line_number(self.show_line_number);

        if self.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        }
        .map_err(|e| InfrastructureError::BootstrapFailed {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_root_module() {
        let error = InfrastructureBuilder::new().build().err().unwrap();
        assert!(matches!(error, InfrastructureError::BootstrapFailed { .. }));
    }

    #[test]
    fn test_logging_from_settings() {
        let config = LoggingConfig::from_settings(&LoggingSettings {
            level: "debug".to_string(),
            json: true,
        });
        assert_eq!(config.level, tracing::Level::DEBUG);
        assert!(config.json_format);

        let fallback = LoggingConfig::from_settings(&LoggingSettings {
            level: "chatty".to_string(),
            json: false,
        });
        assert_eq!(fallback.level, tracing::Level::INFO);
    }

    #[test]
    fn test_presets() {
        assert_eq!(LoggingConfig::development().level, tracing::Level::DEBUG);
        assert!(LoggingConfig::production().json_format);
    }
}
