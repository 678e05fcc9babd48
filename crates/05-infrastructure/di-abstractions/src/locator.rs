//! 服务解析抽象接口
//!
//! 提供按服务描述和请求方解析单例实例的能力

use crate::provider::ServiceInstance;
use async_trait::async_trait;
use infrastructure_common::{
    ContextResult, DependencyError, DependencyResult, ServiceConsumer, ServiceDescription,
};
use std::sync::Arc;

/// 服务定位器 trait
///
/// 提供者在构造过程中通过它递归解析依赖。
#[async_trait]
pub trait ServiceLocator: Send + Sync {
    /// 解析服务实例
    async fn resolve(
        &self,
        service: &ServiceDescription,
        consumer: &ServiceConsumer,
    ) -> DependencyResult<ServiceInstance>;

    /// 上下文配置定位器
    fn context(&self) -> &dyn ContextLocator;
}

impl dyn ServiceLocator + '_ {
    /// 解析服务并转换为契约类型
    pub async fn resolve_as<T>(
        &self,
        service: &ServiceDescription,
        consumer: &ServiceConsumer,
    ) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance = self.resolve(service, consumer).await?;
        instance
            .downcast::<T>()
            .ok_or_else(|| DependencyError::TypeMismatch {
                service: service.clone(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// 以容器自身作为请求方解析未限定的服务
    pub async fn get<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolve_as::<T>(&ServiceDescription::of::<T>(), &ServiceConsumer::root())
            .await
    }
}

/// 上下文配置定位器 trait
pub trait ContextLocator: Send + Sync {
    /// 为请求方解析上下文配置值
    fn resolve(&self, key: &str, consumer: &ServiceConsumer) -> ContextResult<String>;
}
