//! 容器扩展
//!
//! 扩展在容器创建时传入，可以观察每一次服务注册。

use crate::container::DependencyInjection;
use infrastructure_common::ServiceDescription;

/// 容器扩展 trait
///
/// 两个回调默认都是空操作。回调在注册表锁释放之后执行，可以再访问容器。
pub trait ContainerExtension: Send + Sync {
    /// 容器创建完成后调用一次
    fn post_construct(&self, _container: &DependencyInjection) {}

    /// 每注册一个服务提供者调用一次
    fn on_register(&self, _service: &ServiceDescription, _implementation: &'static str) {}
}
