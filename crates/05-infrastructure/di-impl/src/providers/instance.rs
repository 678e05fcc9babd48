//! 实例服务提供者

use async_trait::async_trait;
use di_abstractions::{
    ServiceInstance, ServiceInstantiationDescription, ServiceLocator, ServiceProvider,
};
use infrastructure_common::{DependencyResult, ServiceConsumer, ServiceDescription};
use std::sync::Arc;

/// 实例服务提供者
///
/// 包装一个已经构造好的值，例如模块发现结束后的模块集合。
pub struct InstanceServiceProvider {
    description: ServiceDescription,
    implementation: &'static str,
    instance: ServiceInstance,
}

impl InstanceServiceProvider {
    /// 以值的类型作为契约
    pub fn new<T>(value: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self {
            description: ServiceDescription::of::<T>(),
            implementation: std::any::type_name::<T>(),
            instance: ServiceInstance::new(value),
        }
    }

    /// 附加限定名
    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.description = self.description.qualified(qualifier);
        self
    }
}

#[async_trait]
impl ServiceProvider for InstanceServiceProvider {
    fn description(&self) -> ServiceDescription {
        self.description.clone()
    }

    fn implementation(&self) -> &'static str {
        self.implementation
    }

    fn plan(&self, consumer: &ServiceConsumer) -> DependencyResult<ServiceInstantiationDescription> {
        Ok(ServiceInstantiationDescription::new(
            self.description.clone(),
            self.implementation,
            consumer.clone(),
        ))
    }

    async fn build(
        &self,
        _locator: &dyn ServiceLocator,
        _plan: &ServiceInstantiationDescription,
    ) -> DependencyResult<ServiceInstance> {
        Ok(self.instance.clone())
    }
}
