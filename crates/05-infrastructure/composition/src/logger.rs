//! 按请求方命名的日志服务
//!
//! [`LoggerServiceProviderLoader`] 把 [`ServiceLogger`] 注册到容器。
//! 提供者根据请求方制定计划，构造出的日志器带有一个以请求方命名的 span。
//! 日志器是单例，名称取自触发构造的请求方。

use async_trait::async_trait;
use di_abstractions::{
    CodeModule, Configuration, ServiceInstance, ServiceInstantiationDescription,
    ServiceLocator, ServiceProvider, ServiceProviderLoader,
};
use infrastructure_common::{
    DependencyResult, LoaderError, ServiceConsumer, ServiceDescription,
};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Span};

/// 日志服务提供者的常用发现单元名称
pub const LOGGER_LOADER: &str = "logger";

/// 带请求方上下文的日志器
#[derive(Debug, Clone)]
pub struct ServiceLogger {
    consumer: ServiceConsumer,
    span: Span,
}

impl ServiceLogger {
    /// 为请求方创建日志器
    pub fn for_consumer(consumer: ServiceConsumer) -> Self {
        let module = consumer
            .module()
            .map(|module| module.as_str().to_string())
            .unwrap_or_default();
        let span = info_span!("service", consumer = consumer.type_name(), module = %module);
        Self { consumer, span }
    }

    /// 日志器所属的请求方
    pub fn consumer(&self) -> &ServiceConsumer {
        &self.consumer
    }

    /// 日志器的 span
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// 在日志器的 span 内输出
    pub fn info(&self, message: &str) {
        self.span.in_scope(|| info!("{}", message));
    }

    pub fn debug(&self, message: &str) {
        self.span.in_scope(|| debug!("{}", message));
    }

    pub fn warn(&self, message: &str) {
        self.span.in_scope(|| warn!("{}", message));
    }
}

/// 日志服务提供者
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerServiceProvider;

#[async_trait]
impl ServiceProvider for LoggerServiceProvider {
    fn description(&self) -> ServiceDescription {
        ServiceDescription::of::<ServiceLogger>()
    }

    fn implementation(&self) -> &'static str {
        std::any::type_name::<ServiceLogger>()
    }

    fn plan(&self, consumer: &ServiceConsumer) -> DependencyResult<ServiceInstantiationDescription> {
        Ok(ServiceInstantiationDescription::new(
            self.description(),
            self.implementation(),
            consumer.clone(),
        ))
    }

    async fn build(
        &self,
        _locator: &dyn ServiceLocator,
        plan: &ServiceInstantiationDescription,
    ) -> DependencyResult<ServiceInstance> {
        let logger = ServiceLogger::for_consumer(plan.consumer.clone());
        debug!("创建日志器, 请求方: {}", plan.consumer);
        Ok(ServiceInstance::new(Arc::new(logger)))
    }
}

/// 注册日志服务提供者的发现单元
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerServiceProviderLoader;

impl LoggerServiceProviderLoader {
    /// 创建发现单元
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServiceProviderLoader for LoggerServiceProviderLoader {
    async fn load(
        &self,
        configuration: &dyn Configuration,
        module: &Arc<CodeModule>,
    ) -> Result<Vec<Arc<CodeModule>>, LoaderError> {
        configuration.register(Arc::new(LoggerServiceProvider))?;
        debug!("模块 {} 注册日志服务", module.id());
        Ok(Vec::new())
    }
}
