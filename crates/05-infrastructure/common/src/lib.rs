//! # Infrastructure Common
//!
//! 服务注入容器的公共基础类型。
//!
//! ## 核心类型
//!
//! - [`ServiceDescription`] - 服务契约描述（类型 + 可选限定名）
//! - [`ServiceConsumer`] - 请求方身份
//! - [`ModuleId`] - 代码模块标识
//! - [`ServiceLifecycle`] - 构造后 / 销毁前回调
//! - [`read_deployment_descriptor`] - 部署描述清单解析
//!
//! ## 错误分类
//!
//! 所有错误类型集中定义在 [`errors`] 模块中，按关注点拆分：
//! 依赖解析、上下文配置、注入、模块发现、服务释放。

pub mod consumer;
pub mod deployment;
pub mod description;
pub mod errors;
pub mod lifecycle;

pub use consumer::*;
pub use deployment::*;
pub use description::*;
pub use errors::*;
pub use lifecycle::*;
