//! 类服务提供者

use async_trait::async_trait;
use di_abstractions::{
    Injectable, ServiceDefinition, ServiceInstance, ServiceInstantiationDescription,
    ServiceLocator, ServiceProvider,
};
use infrastructure_common::{
    BoxError, DependencyError, DependencyResult, ModuleId, ServiceConsumer, ServiceDescription,
    ServiceLifecycle,
};
use std::sync::Arc;
use tracing::debug;

type ExposeFn<T> = Arc<dyn Fn(Arc<T>) -> ServiceInstance + Send + Sync>;

/// 类服务提供者
///
/// 构造顺序：`T::default()`，写入上下文配置值，递归解析并写入服务引用，
/// 最后执行构造后回调。任一步失败都会中止构造，部分构造的值直接丢弃。
///
/// 上下文配置值按计划中的请求方解析；嵌套服务引用以本服务自身作为请求方。
pub struct ClassServiceProvider<T>
where
    T: Injectable,
{
    description: ServiceDescription,
    module: Option<ModuleId>,
    expose: ExposeFn<T>,
}

impl<T> ClassServiceProvider<T>
where
    T: Injectable,
{
    /// 以实现类型自身作为契约
    pub fn new() -> Self {
        Self {
            description: ServiceDescription::of::<T>(),
            module: None,
            expose: Arc::new(|value: Arc<T>| ServiceInstance::new(value)),
        }
    }

    /// 以契约类型对外提供，通常是 trait object
    pub fn as_contract<C>(cast: fn(Arc<T>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        Self {
            description: ServiceDescription::of::<C>(),
            module: None,
            expose: Arc::new(move |value: Arc<T>| {
                ServiceInstance::new(cast(value.clone())).with_origin(value)
            }),
        }
    }

    /// 附加限定名
    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.description = self.description.qualified(qualifier);
        self
    }

    /// 设置声明模块
    pub fn in_module(mut self, module: ModuleId) -> Self {
        self.module = Some(module);
        self
    }

    /// 本服务作为请求方时的身份
    fn own_consumer(&self) -> ServiceConsumer {
        let consumer = ServiceConsumer::of::<T>();
        match &self.module {
            Some(module) => consumer.in_module(module.clone()),
            None => consumer,
        }
    }

    fn failed(
        &self,
        plan: &ServiceInstantiationDescription,
        source: impl Into<BoxError>,
    ) -> DependencyError {
        DependencyError::construction_failed(plan.service.clone(), plan.consumer.clone(), source)
    }
}

impl<T> Default for ClassServiceProvider<T>
where
    T: Injectable,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ClassServiceProvider<T>
where
    T: Injectable,
{
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            module: self.module.clone(),
            expose: self.expose.clone(),
        }
    }
}

impl<T> ServiceDefinition for ClassServiceProvider<T>
where
    T: Injectable,
{
    fn provider(&self, module: &ModuleId) -> Arc<dyn ServiceProvider> {
        Arc::new(self.clone().in_module(module.clone()))
    }
}

#[async_trait]
impl<T> ServiceProvider for ClassServiceProvider<T>
where
    T: Injectable,
{
    fn description(&self) -> ServiceDescription {
        self.description.clone()
    }

    fn implementation(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn plan(&self, consumer: &ServiceConsumer) -> DependencyResult<ServiceInstantiationDescription> {
        Ok(ServiceInstantiationDescription::new(
            self.description.clone(),
            self.implementation(),
            consumer.clone(),
        )
        .with_dependencies(T::dependencies()))
    }

    async fn build(
        &self,
        locator: &dyn ServiceLocator,
        plan: &ServiceInstantiationDescription,
    ) -> DependencyResult<ServiceInstance> {
        let mut value = T::default();

        for key in &plan.dependencies.context_keys {
            let text = locator
                .context()
                .resolve(key, &plan.consumer)
                .map_err(|error| self.failed(plan, error))?;
            value
                .inject_context(key, text)
                .map_err(|error| self.failed(plan, error))?;
        }

        let own = self.own_consumer();
        for reference in &plan.dependencies.references {
            // 嵌套解析的错误原样向上传播
            let instance = locator.resolve(reference, &own).await?;
            value
                .inject_reference(reference, &instance)
                .map_err(|error| self.failed(plan, error))?;
        }

        value
            .post_construct()
            .await
            .map_err(|error| self.failed(plan, error))?;

        debug!("服务构造完成: {} ({})", plan.service, plan.implementation);
        Ok((self.expose)(Arc::new(value)))
    }

    async fn pre_destroy(
        &self,
        instance: &ServiceInstance,
        _plan: &ServiceInstantiationDescription,
    ) -> Result<(), BoxError> {
        match instance.origin::<T>() {
            Some(value) => ServiceLifecycle::pre_destroy(value.as_ref()).await,
            None => Ok(()),
        }
    }
}
