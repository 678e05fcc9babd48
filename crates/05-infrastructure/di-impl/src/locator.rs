//! 单例解析引擎与关闭协调
//!
//! 每个服务描述对应一个单例条目，状态流转：
//! 未知 -> 构造中 -> 就绪 -> 已释放。构造失败时条目被移除，下次解析会重试。
//! 循环依赖通过显式的依赖链检测，不依赖调用栈深度。

use crate::configuration::ConfigurationImpl;
use crate::context::ContextLocatorImpl;
use async_trait::async_trait;
use di_abstractions::{
    ContainerConfig, ContextLocator, ServiceInstance, ServiceInstantiationDescription,
    ServiceLocator, ServiceProvider,
};
use infrastructure_common::{
    DependencyChain, DependencyError, DependencyResult, DisposalError, EntryState,
    ServiceConsumer, ServiceDescription,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

enum Slot {
    Constructing,
    Ready {
        instance: ServiceInstance,
        plan: ServiceInstantiationDescription,
    },
    Disposed,
}

struct SingletonEntry {
    provider: Arc<dyn ServiceProvider>,
    slot: Slot,
}

impl SingletonEntry {
    fn state(&self) -> EntryState {
        match self.slot {
            Slot::Constructing => EntryState::Constructing,
            Slot::Ready { .. } => EntryState::Ready,
            Slot::Disposed => EntryState::Disposed,
        }
    }
}

#[derive(Default)]
struct EntryTable {
    entries: HashMap<ServiceDescription, SingletonEntry>,
    creation_order: Vec<ServiceDescription>,
}

/// 关闭报告
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// 按释放顺序排列的服务
    pub disposed: Vec<ServiceDescription>,
    /// 释放过程中收集到的错误
    pub failures: Vec<DisposalError>,
}

impl ShutdownReport {
    /// 是否没有任何错误
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 服务定位器实现
pub struct ServiceLocatorImpl {
    configuration: Arc<ConfigurationImpl>,
    context: ContextLocatorImpl,
    config: ContainerConfig,
    table: Mutex<EntryTable>,
}

impl ServiceLocatorImpl {
    /// 使用默认配置创建
    pub fn new(configuration: Arc<ConfigurationImpl>) -> Self {
        Self::with_config(configuration, ContainerConfig::default())
    }

    /// 使用指定配置创建
    pub fn with_config(configuration: Arc<ConfigurationImpl>, config: ContainerConfig) -> Self {
        Self {
            context: ContextLocatorImpl::new(configuration.clone()),
            configuration,
            config,
            table: Mutex::new(EntryTable::default()),
        }
    }

    /// 服务注册表
    pub fn configuration(&self) -> &Arc<ConfigurationImpl> {
        &self.configuration
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 解析服务并转换为契约类型
    pub async fn resolve_as<T>(
        &self,
        service: &ServiceDescription,
        consumer: &ServiceConsumer,
    ) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let locator: &dyn ServiceLocator = self;
        locator.resolve_as::<T>(service, consumer).await
    }

    /// 以容器自身作为请求方解析未限定的服务
    pub async fn get<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let locator: &dyn ServiceLocator = self;
        locator.get::<T>().await
    }

    /// 单例条目当前状态
    pub fn state(&self, service: &ServiceDescription) -> Option<EntryState> {
        self.table.lock().entries.get(service).map(SingletonEntry::state)
    }

    /// 构造完成顺序
    pub fn creation_order(&self) -> Vec<ServiceDescription> {
        self.table.lock().creation_order.clone()
    }

    async fn resolve_in(
        &self,
        chain: &DependencyChain,
        service: &ServiceDescription,
        consumer: &ServiceConsumer,
    ) -> DependencyResult<ServiceInstance> {
        let provider = {
            let mut table = self.table.lock();
            match table.entries.get(service).map(|entry| &entry.slot) {
                Some(Slot::Ready { instance, .. }) => return Ok(instance.clone()),
                Some(Slot::Constructing) => {
                    return Err(DependencyError::CircularDependency {
                        chain: chain.with(service.clone()),
                    });
                }
                Some(Slot::Disposed) => {
                    return Err(DependencyError::ServiceDisposed {
                        service: service.clone(),
                    });
                }
                None => {}
            }

            if chain.len() >= self.config.max_resolution_depth {
                return Err(DependencyError::ResolutionDepthExceeded {
                    limit: self.config.max_resolution_depth,
                    chain: chain.with(service.clone()),
                });
            }

            let provider = self.configuration.provider(service).ok_or_else(|| {
                DependencyError::ServiceNotFound {
                    service: service.clone(),
                    consumer: consumer.clone(),
                }
            })?;

            table.entries.insert(
                service.clone(),
                SingletonEntry {
                    provider: provider.clone(),
                    slot: Slot::Constructing,
                },
            );
            provider
        };

        debug!("开始构造服务: {}, 请求方: {}", service, consumer);
        let scope = ResolutionScope {
            locator: self,
            chain: chain.with(service.clone()),
        };
        let outcome = match provider.plan(consumer) {
            Ok(plan) => provider
                .build(&scope, &plan)
                .await
                .map(|instance| (instance, plan)),
            Err(error) => Err(error),
        };

        let mut table = self.table.lock();
        match outcome {
            Ok((instance, plan)) => {
                if let Some(entry) = table.entries.get_mut(service) {
                    entry.slot = Slot::Ready {
                        instance: instance.clone(),
                        plan,
                    };
                }
                table.creation_order.push(service.clone());
                info!("服务已就绪: {}", service);
                Ok(instance)
            }
            Err(error) => {
                table.entries.remove(service);
                debug!("服务构造失败: {}, 原因: {}", service, error);
                Err(error)
            }
        }
    }

    /// 按构造顺序的逆序释放全部就绪的服务
    ///
    /// 每个服务先执行销毁前回调再释放资源，任一步失败都只记录并继续。
    /// 重复调用不会再次释放。
    pub async fn shutdown_all(&self) -> ShutdownReport {
        let order = std::mem::take(&mut self.table.lock().creation_order);
        info!("开始关闭服务, 共 {} 个", order.len());

        let mut report = ShutdownReport::default();
        for service in order.into_iter().rev() {
            let ready = {
                let mut table = self.table.lock();
                table.entries.get_mut(&service).and_then(|entry| {
                    match std::mem::replace(&mut entry.slot, Slot::Disposed) {
                        Slot::Ready { instance, plan } => {
                            Some((entry.provider.clone(), instance, plan))
                        }
                        other => {
                            entry.slot = other;
                            None
                        }
                    }
                })
            };
            let Some((provider, instance, plan)) = ready else {
                continue;
            };

            if let Err(source) = provider.pre_destroy(&instance, &plan).await {
                error!("销毁前回调失败: {}, 原因: {}", service, source);
                report.failures.push(DisposalError::PreDestroyFailed {
                    service: service.clone(),
                    source,
                });
            }
            if let Err(source) = provider.dispose(instance, &plan).await {
                error!("服务释放失败: {}, 原因: {}", service, source);
                report.failures.push(DisposalError::DisposeFailed {
                    service: service.clone(),
                    source,
                });
            }
            debug!("服务已释放: {}", service);
            report.disposed.push(service);
        }

        info!(
            "服务关闭完成, 释放 {} 个, 失败 {} 次",
            report.disposed.len(),
            report.failures.len()
        );
        report
    }
}

#[async_trait]
impl ServiceLocator for ServiceLocatorImpl {
    async fn resolve(
        &self,
        service: &ServiceDescription,
        consumer: &ServiceConsumer,
    ) -> DependencyResult<ServiceInstance> {
        self.resolve_in(&DependencyChain::new(), service, consumer)
            .await
    }

    fn context(&self) -> &dyn ContextLocator {
        &self.context
    }
}

/// 一次解析调用树内的定位器，携带正在构造的依赖链
struct ResolutionScope<'a> {
    locator: &'a ServiceLocatorImpl,
    chain: DependencyChain,
}

#[async_trait]
impl ServiceLocator for ResolutionScope<'_> {
    async fn resolve(
        &self,
        service: &ServiceDescription,
        consumer: &ServiceConsumer,
    ) -> DependencyResult<ServiceInstance> {
        self.locator
            .resolve_in(&self.chain, service, consumer)
            .await
    }

    fn context(&self) -> &dyn ContextLocator {
        &self.locator.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ConfigurationExt;
    use crate::providers::InstanceServiceProvider;
    use di_abstractions::{Configuration, Injectable, Reference, ServiceDependencies};
    use infrastructure_common::{InjectionResult, ServiceLifecycle};

    #[derive(Debug, Default)]
    struct Leaf;

    impl ServiceLifecycle for Leaf {}
    impl Injectable for Leaf {}

    #[derive(Debug, Default)]
    struct Branch {
        leaf: Reference<Leaf>,
    }

    impl ServiceLifecycle for Branch {}

    impl Injectable for Branch {
        fn dependencies() -> ServiceDependencies {
            ServiceDependencies::new().with_reference(Reference::<Leaf>::describe())
        }

        fn inject_reference(
            &mut self,
            service: &ServiceDescription,
            instance: &ServiceInstance,
        ) -> InjectionResult<()> {
            self.leaf.inject(service, instance)
        }
    }

    /// 依赖自身的服务
    #[derive(Debug, Default)]
    struct Ouroboros;

    impl ServiceLifecycle for Ouroboros {}

    impl Injectable for Ouroboros {
        fn dependencies() -> ServiceDependencies {
            ServiceDependencies::new().with_reference(ServiceDescription::of::<Ouroboros>())
        }
    }

    fn locator() -> ServiceLocatorImpl {
        ServiceLocatorImpl::new(Arc::new(ConfigurationImpl::new()))
    }

    #[tokio::test]
    async fn test_dependencies_are_ready_before_dependents() {
        let locator = locator();
        locator.configuration().register_service::<Leaf>().unwrap();
        locator.configuration().register_service::<Branch>().unwrap();

        let branch = locator.get::<Branch>().await.unwrap();
        let leaf = locator.get::<Leaf>().await.unwrap();
        assert!(Arc::ptr_eq(branch.leaf.get().unwrap(), &leaf));
        assert_eq!(
            locator.creation_order(),
            vec![
                ServiceDescription::of::<Leaf>(),
                ServiceDescription::of::<Branch>()
            ]
        );
    }

    #[tokio::test]
    async fn test_self_reference_is_circular() {
        let locator = locator();
        locator.configuration().register_service::<Ouroboros>().unwrap();

        let error = locator.get::<Ouroboros>().await.unwrap_err();
        match error {
            DependencyError::CircularDependency { chain } => assert_eq!(chain.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(locator.state(&ServiceDescription::of::<Ouroboros>()), None);
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let configuration = Arc::new(ConfigurationImpl::new());
        configuration.register_service::<Leaf>().unwrap();
        configuration.register_service::<Branch>().unwrap();
        let locator = ServiceLocatorImpl::with_config(
            configuration,
            ContainerConfig::default().with_max_resolution_depth(1),
        );

        let error = locator.get::<Branch>().await.unwrap_err();
        assert!(matches!(
            error,
            DependencyError::ResolutionDepthExceeded { limit: 1, .. }
        ));
        // 深度允许时叶子服务仍可直接解析
        assert!(locator.get::<Leaf>().await.is_ok());
    }

    #[tokio::test]
    async fn test_type_mismatch_on_typed_access() {
        let locator = locator();
        locator
            .configuration()
            .register(Arc::new(
                InstanceServiceProvider::new(Arc::new(7_u32)).qualified("answer"),
            ))
            .unwrap();

        let error = locator
            .resolve_as::<String>(
                &ServiceDescription::of::<u32>().qualified("answer"),
                &ServiceConsumer::root(),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, DependencyError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn test_resolve_after_shutdown_is_rejected() {
        let locator = locator();
        locator.configuration().register_service::<Leaf>().unwrap();
        locator.get::<Leaf>().await.unwrap();

        let report = locator.shutdown_all().await;
        assert!(report.is_clean());
        assert_eq!(report.disposed.len(), 1);
        assert_eq!(
            locator.state(&ServiceDescription::of::<Leaf>()),
            Some(EntryState::Disposed)
        );

        let error = locator.get::<Leaf>().await.unwrap_err();
        assert!(matches!(error, DependencyError::ServiceDisposed { .. }));
    }
}
