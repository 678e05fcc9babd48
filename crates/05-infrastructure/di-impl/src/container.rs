//! 服务注入容器门面
//!
//! 一个显式的容器值，串联模块发现、服务解析和有序关闭三个阶段。
//! 服务注册表和服务定位器本身也注册为服务，可以像其他依赖一样被注入。

use crate::configuration::ConfigurationImpl;
use crate::discovery::{DiscoveryReport, ModuleDiscovery};
use crate::extension::ContainerExtension;
use crate::locator::{ServiceLocatorImpl, ShutdownReport};
use async_trait::async_trait;
use di_abstractions::{
    CodeModule, Configuration, ContainerConfig, ModuleSet, ServiceInstance,
    ServiceInstantiationDescription, ServiceLocator, ServiceProvider,
};
use infrastructure_common::{
    DependencyError, DependencyResult, DiscoveryResult, ServiceConsumer, ServiceDescription,
};
use std::sync::{Arc, Weak};
use tracing::debug;

/// 服务注入容器
pub struct DependencyInjection {
    configuration: Arc<ConfigurationImpl>,
    locator: Arc<ServiceLocatorImpl>,
}

impl DependencyInjection {
    /// 使用默认配置创建容器
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// 使用指定配置创建容器
    pub fn with_config(config: ContainerConfig) -> Self {
        Self::with_extensions(config, Vec::new())
    }

    /// 使用指定配置和扩展创建容器
    ///
    /// 内置服务注册完成后，按传入顺序调用每个扩展的 `post_construct`。
    pub fn with_extensions(
        config: ContainerConfig,
        extensions: Vec<Arc<dyn ContainerExtension>>,
    ) -> Self {
        let configuration = Arc::new(ConfigurationImpl::with_extensions(extensions));
        let locator = Arc::new(ServiceLocatorImpl::with_config(configuration.clone(), config));

        // 弱引用避免注册表与定位器之间的引用环
        let weak_configuration = Arc::downgrade(&configuration);
        configuration.register_builtin(Arc::new(ContainerServiceProvider::new(
            ServiceDescription::of::<dyn Configuration>(),
            std::any::type_name::<ConfigurationImpl>(),
            move || {
                weak_configuration.upgrade().map(|configuration| {
                    let configuration: Arc<dyn Configuration> = configuration;
                    ServiceInstance::new(configuration)
                })
            },
        )));
        let weak_locator: Weak<ServiceLocatorImpl> = Arc::downgrade(&locator);
        configuration.register_builtin(Arc::new(ContainerServiceProvider::new(
            ServiceDescription::of::<dyn ServiceLocator>(),
            std::any::type_name::<ServiceLocatorImpl>(),
            move || {
                weak_locator.upgrade().map(|locator| {
                    let locator: Arc<dyn ServiceLocator> = locator;
                    ServiceInstance::new(locator)
                })
            },
        )));

        let container = Self {
            configuration,
            locator,
        };
        for extension in container.configuration.extensions() {
            extension.post_construct(&container);
        }
        container
    }

    /// 服务注册表
    pub fn configuration(&self) -> &Arc<ConfigurationImpl> {
        &self.configuration
    }

    /// 服务定位器
    pub fn locator(&self) -> &Arc<ServiceLocatorImpl> {
        &self.locator
    }

    /// 从根模块开始发现并注册服务
    pub async fn load_services(&self, root: Arc<CodeModule>) -> DiscoveryResult<DiscoveryReport> {
        ModuleDiscovery::new(self.configuration.clone())
            .run(root)
            .await
    }

    /// 解析服务
    pub async fn resolve(
        &self,
        service: &ServiceDescription,
        consumer: &ServiceConsumer,
    ) -> DependencyResult<ServiceInstance> {
        self.locator.resolve(service, consumer).await
    }

    /// 以容器自身作为请求方解析未限定的服务
    pub async fn get<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.locator.get::<T>().await
    }

    /// 已发现的全部模块
    pub async fn modules(&self) -> DependencyResult<Arc<ModuleSet>> {
        self.get::<ModuleSet>().await
    }

    /// 按构造顺序的逆序释放全部服务
    pub async fn shutdown(&self) -> ShutdownReport {
        self.locator.shutdown_all().await
    }
}

impl Default for DependencyInjection {
    fn default() -> Self {
        Self::new()
    }
}

type UpgradeFn = Box<dyn Fn() -> Option<ServiceInstance> + Send + Sync>;

/// 提供容器自身组件的服务提供者
struct ContainerServiceProvider {
    description: ServiceDescription,
    implementation: &'static str,
    upgrade: UpgradeFn,
}

impl ContainerServiceProvider {
    fn new<F>(description: ServiceDescription, implementation: &'static str, upgrade: F) -> Self
    where
        F: Fn() -> Option<ServiceInstance> + Send + Sync + 'static,
    {
        Self {
            description,
            implementation,
            upgrade: Box::new(upgrade),
        }
    }
}

#[async_trait]
impl ServiceProvider for ContainerServiceProvider {
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
        plan: &ServiceInstantiationDescription,
    ) -> DependencyResult<ServiceInstance> {
        debug!("提供容器组件: {}, 请求方: {}", plan.service, plan.consumer);
        (self.upgrade)().ok_or_else(|| {
            DependencyError::construction_failed(
                plan.service.clone(),
                plan.consumer.clone(),
                "容器已释放",
            )
        })
    }
}
