//! # Dependency Injection Abstractions
//!
//! 服务注入抽象层，定义服务注册、依赖解析和模块发现的核心接口。
//!
//! ## 核心接口
//!
//! - [`Configuration`] - 服务注册接口
//! - [`ServiceLocator`] - 服务解析接口
//! - [`ContextLocator`] - 上下文配置解析接口
//! - [`ServiceProvider`] - 服务提供者接口
//! - [`ServiceProviderLoader`] - 发现单元接口
//! - [`Injectable`] - 可注入服务接口

pub mod configuration;
pub mod container;
pub mod injectable;
pub mod loader;
pub mod locator;
pub mod module;
pub mod provider;

pub use configuration::*;
pub use container::*;
pub use injectable::*;
pub use loader::*;
pub use locator::*;
pub use module::*;
pub use provider::*;

// 派生宏生成的代码通过本 crate 引用公共类型
pub use infrastructure_common;
