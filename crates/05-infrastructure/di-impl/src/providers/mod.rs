//! 服务提供者实现
//!
//! - [`ClassServiceProvider`] - 构造 `Injectable` 类型并注入依赖
//! - [`InstanceServiceProvider`] - 包装已构造好的实例

pub mod class;
pub mod instance;

pub use class::*;
pub use instance::*;
