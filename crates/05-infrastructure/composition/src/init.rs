//! 初始化组件与初始化服务
//!
//! 初始化组件是运行阶段的入口：模块在 `init` 清单中列出它们，
//! 引导发现单元负责注册，[`InitService`] 负责解析并调用 `init`。

use async_trait::async_trait;
use di_abstractions::{
    Injectable, ModuleSet, ServiceDefinition, ServiceLocator, ServiceProvider,
};
use di_impl::ClassServiceProvider;
use infrastructure_common::{
    BoxError, DiscoveryError, InfrastructureError, InfrastructureResult, ModuleId,
    ServiceConsumer, ServiceDescription, INIT_DESCRIPTOR,
};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::info;

/// 初始化组件 trait
#[async_trait]
pub trait InitComponent: Send + Sync {
    /// 运行阶段开始时调用一次
    async fn init(&self) -> Result<(), BoxError>;
}

/// 初始化组件在容器中的服务描述
///
/// 以 `模块/名称` 作为限定名，不同模块可以使用相同的组件名称。
pub fn init_description(module: &ModuleId, name: &str) -> ServiceDescription {
    ServiceDescription::of::<dyn InitComponent>().qualified(init_qualifier(module, name))
}

fn init_qualifier(module: &ModuleId, name: &str) -> String {
    format!("{}/{}", module, name)
}

fn as_init_component<T: InitComponent + 'static>(component: Arc<T>) -> Arc<dyn InitComponent> {
    component
}

/// 初始化组件定义
pub struct InitComponentDefinition<T> {
    name: String,
    _component: PhantomData<fn() -> T>,
}

impl<T> ServiceDefinition for InitComponentDefinition<T>
where
    T: Injectable + InitComponent,
{
    fn provider(&self, module: &ModuleId) -> Arc<dyn ServiceProvider> {
        Arc::new(
            ClassServiceProvider::<T>::as_contract(as_init_component::<T>)
                .qualified(init_qualifier(module, &self.name))
                .in_module(module.clone()),
        )
    }
}

/// 以名称定义初始化组件，名称需与模块 `init` 清单中的条目一致
pub fn init_component<T>(name: impl Into<String>) -> Arc<dyn ServiceDefinition>
where
    T: Injectable + InitComponent,
{
    Arc::new(InitComponentDefinition::<T> {
        name: name.into(),
        _component: PhantomData,
    })
}

/// 初始化服务
pub struct InitService {
    locator: Arc<dyn ServiceLocator>,
}

impl InitService {
    /// 创建初始化服务
    pub fn new(locator: Arc<dyn ServiceLocator>) -> Self {
        Self { locator }
    }

    /// 按模块发现顺序解析并执行全部初始化组件
    ///
    /// 返回已执行的组件（`模块/名称`）。
    pub async fn run(&self) -> InfrastructureResult<Vec<String>> {
        let locator: &dyn ServiceLocator = self.locator.as_ref();
        let modules = locator.get::<ModuleSet>().await?;

        let mut executed = Vec::new();
        for module in modules.modules() {
            let names = module
                .local_descriptor_entries(INIT_DESCRIPTOR)
                .map_err(DiscoveryError::from)?;
            for name in names {
                let component_name = init_qualifier(module.id(), &name);
                let consumer = ServiceConsumer::of::<InitService>().in_module(module.id().clone());
                let component = locator
                    .resolve_as::<dyn InitComponent>(&init_description(module.id(), &name), &consumer)
                    .await?;

                info!("执行初始化组件: {}", component_name);
                component
                    .init()
                    .await
                    .map_err(|source| InfrastructureError::InitFailed {
                        component: component_name.clone(),
                        source,
                    })?;
                executed.push(component_name);
            }
        }
        Ok(executed)
    }
}
