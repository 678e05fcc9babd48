//! # 依赖注入具体实现
//!
//! 提供服务注册表、上下文配置解析器、服务提供者、单例解析引擎、
//! 模块发现循环、容器扩展以及容器门面 [`DependencyInjection`]。

pub mod configuration;
pub mod container;
pub mod context;
pub mod discovery;
pub mod extension;
pub mod locator;
pub mod providers;

pub use configuration::*;
pub use container::*;
pub use context::*;
pub use discovery::*;
pub use extension::*;
pub use locator::*;
pub use providers::*;
