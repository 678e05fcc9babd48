//! 服务注册表实现

use crate::extension::ContainerExtension;
use crate::providers::ClassServiceProvider;
use di_abstractions::{Configuration, ContextProviderFn, Injectable, ServiceProvider};
use infrastructure_common::{DependencyError, DependencyResult, ServiceDescription};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// 服务注册表
///
/// 每个服务描述至多一个提供者；上下文配置键后注册的覆盖先注册的。
/// 每次成功注册后依次通知容器扩展。
#[derive(Default)]
pub struct ConfigurationImpl {
    providers: RwLock<HashMap<ServiceDescription, Arc<dyn ServiceProvider>>>,
    context_providers: RwLock<HashMap<String, ContextProviderFn>>,
    extensions: Vec<Arc<dyn ContainerExtension>>,
}

impl ConfigurationImpl {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带扩展的注册表
    pub fn with_extensions(extensions: Vec<Arc<dyn ContainerExtension>>) -> Self {
        Self {
            extensions,
            ..Self::default()
        }
    }

    /// 容器扩展
    pub fn extensions(&self) -> &[Arc<dyn ContainerExtension>] {
        &self.extensions
    }

    /// 注册容器自身提供的服务，不通知扩展
    pub(crate) fn register_builtin(&self, provider: Arc<dyn ServiceProvider>) {
        let service = provider.description();
        debug!("注册内置服务: {}", service);
        self.providers.write().insert(service, provider);
    }

    /// 查找服务提供者
    pub fn provider(&self, service: &ServiceDescription) -> Option<Arc<dyn ServiceProvider>> {
        self.providers.read().get(service).cloned()
    }

    /// 查找上下文配置提供函数
    pub fn context_provider(&self, key: &str) -> Option<ContextProviderFn> {
        self.context_providers.read().get(key).cloned()
    }

    /// 已注册的全部服务描述
    pub fn registered_services(&self) -> Vec<ServiceDescription> {
        let mut services: Vec<ServiceDescription> =
            self.providers.read().keys().cloned().collect();
        services.sort_by(|a, b| {
            a.type_name()
                .cmp(b.type_name())
                .then_with(|| a.qualifier().cmp(&b.qualifier()))
        });
        services
    }

    /// 已注册的上下文配置键
    pub fn context_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.context_providers.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Configuration for ConfigurationImpl {
    fn register(&self, provider: Arc<dyn ServiceProvider>) -> DependencyResult<()> {
        let service = provider.description();
        let implementation = provider.implementation();
        {
            let mut providers = self.providers.write();
            if providers.contains_key(&service) {
                return Err(DependencyError::DuplicateService { service });
            }
            info!("注册服务: {} ({})", service, implementation);
            providers.insert(service.clone(), provider);
        }

        for extension in &self.extensions {
            extension.on_register(&service, implementation);
        }
        Ok(())
    }

    fn register_context_provider(&self, key: &str, provider: ContextProviderFn) {
        let previous = self
            .context_providers
            .write()
            .insert(key.to_string(), provider);
        if previous.is_some() {
            debug!("上下文配置被覆盖: {}", key);
        } else {
            debug!("注册上下文配置: {}", key);
        }
    }

    fn is_registered(&self, service: &ServiceDescription) -> bool {
        self.providers.read().contains_key(service)
    }
}

/// 注册表便捷扩展
pub trait ConfigurationExt {
    /// 以实现类型自身作为契约注册类服务
    fn register_service<T: Injectable>(&self) -> DependencyResult<()>;

    /// 以契约类型注册类服务
    fn register_service_as<T, C>(&self, cast: fn(Arc<T>) -> Arc<C>) -> DependencyResult<()>
    where
        T: Injectable,
        C: ?Sized + Send + Sync + 'static;
}

impl<R> ConfigurationExt for R
where
    R: Configuration + ?Sized,
{
    fn register_service<T: Injectable>(&self) -> DependencyResult<()> {
        self.register(Arc::new(ClassServiceProvider::<T>::new()))
    }

    fn register_service_as<T, C>(&self, cast: fn(Arc<T>) -> Arc<C>) -> DependencyResult<()>
    where
        T: Injectable,
        C: ?Sized + Send + Sync + 'static,
    {
        self.register(Arc::new(ClassServiceProvider::<T>::as_contract(cast)))
    }
}
