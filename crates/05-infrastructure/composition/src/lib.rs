//! # 基础设施组合层
//!
//! 将服务注入容器组合成一个可运行的应用：引导发现单元、初始化组件、
//! 上下文配置来源、容器设置与日志初始化。
//!
//! ## 主要功能
//!
//! - **引导发现单元**: 按模块清单注册本模块定义的服务
//! - **初始化服务**: 运行阶段解析并执行各模块的初始化组件
//! - **上下文配置来源**: 配置文件与模块属性
//! - **日志服务**: 按请求方命名的日志器
//! - **生命周期管理**: 管理发现、运行、关闭三个阶段
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_abstractions::CodeModule;
//! use infrastructure_composition::{
//!     BootstrapServiceProviderLoader, InfrastructureBuilder, BOOTSTRAP_LOADER,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let root = CodeModule::builder("app")
//!         .with_resource("loaders", BOOTSTRAP_LOADER)
//!         .with_loader(BOOTSTRAP_LOADER, Arc::new(BootstrapServiceProviderLoader))
//!         .build();
//!
//!     let infrastructure = InfrastructureBuilder::new()
//!         .with_root_module(root)
//!         .build()?;
//!
//!     // 模块发现并执行初始化组件
//!     infrastructure.start().await?;
//!
//!     // 按构造顺序的逆序释放
//!     infrastructure.stop().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod builder;
pub mod config_sources;
pub mod infrastructure;
pub mod init;
pub mod logger;
pub mod settings;

#[cfg(test)]
mod tests;

// 重新导出主要类型
pub use bootstrap::{BootstrapServiceProviderLoader, BOOTSTRAP_LOADER};
pub use builder::{InfrastructureBuilder, LoggingConfig};
pub use config_sources::{
    flatten_value, parse_toml_properties, read_properties_file, ConfigFileContextLoader,
    ModulePropertiesLoader, CONTEXT_FILE_ENV, DEFAULT_CONTEXT_FILE,
};
pub use infrastructure::{InfrastructureMetrics, InfrastructureStatus, ServiceInfrastructure};
pub use init::{init_component, init_description, InitComponent, InitComponentDefinition, InitService};
pub use logger::{LoggerServiceProvider, LoggerServiceProviderLoader, ServiceLogger, LOGGER_LOADER};
pub use settings::{ContainerSettings, ContextSettings, LoggingSettings, SETTINGS_ENV_PREFIX};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
