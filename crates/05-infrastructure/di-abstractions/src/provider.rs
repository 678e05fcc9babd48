//! 服务提供者抽象接口
//!
//! 提供者负责为一个服务描述制定实例化计划、构造实例以及在关闭时释放实例。

use crate::locator::ServiceLocator;
use async_trait::async_trait;
use infrastructure_common::{
    BoxError, DependencyResult, ModuleId, ServiceConsumer, ServiceDescription,
};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 服务实例
///
/// 共享句柄，克隆句柄不会克隆服务本身。内部保存契约类型的 `Arc<C>`
/// （`C` 可以是 trait object）以及实现类型的 `Arc<T>`。
#[derive(Clone)]
pub struct ServiceInstance {
    value: Arc<dyn Any + Send + Sync>,
    origin: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ServiceInstance {
    /// 以契约类型包装实例
    pub fn new<T>(value: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let erased: Arc<dyn Any + Send + Sync> = Arc::new(value);
        Self {
            value: erased.clone(),
            origin: erased,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// 记录实现类型的实例，供销毁回调使用
    pub fn with_origin<T>(mut self, origin: Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.origin = Arc::new(origin);
        self
    }

    /// 按契约类型取出实例
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    /// 按实现类型取出实例
    pub fn origin<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.origin.downcast_ref::<Arc<T>>().cloned()
    }

    /// 是否指向同一个服务
    pub fn ptr_eq(&self, other: &ServiceInstance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// 契约类型名称
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// 服务依赖声明
///
/// 构造一个服务前需要解析的嵌套服务和上下文配置键。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDependencies {
    /// 需要注入的服务引用
    pub references: Vec<ServiceDescription>,
    /// 需要注入的上下文配置键
    pub context_keys: Vec<String>,
}

impl ServiceDependencies {
    /// 创建空的依赖声明
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加服务引用
    pub fn with_reference(mut self, service: ServiceDescription) -> Self {
        self.references.push(service);
        self
    }

    /// 添加上下文配置键
    pub fn with_context(mut self, key: impl Into<String>) -> Self {
        self.context_keys.push(key.into());
        self
    }

    /// 是否没有任何依赖
    pub fn is_empty(&self) -> bool {
        self.references.is_empty() && self.context_keys.is_empty()
    }
}

/// 服务实例化计划
///
/// 每次解析都会为当前请求方重新计算。
#[derive(Debug, Clone)]
pub struct ServiceInstantiationDescription {
    /// 服务描述
    pub service: ServiceDescription,
    /// 实现类型名称
    pub implementation: &'static str,
    /// 请求方
    pub consumer: ServiceConsumer,
    /// 依赖声明
    pub dependencies: ServiceDependencies,
}

impl ServiceInstantiationDescription {
    /// 创建无依赖的实例化计划
    pub fn new(
        service: ServiceDescription,
        implementation: &'static str,
        consumer: ServiceConsumer,
    ) -> Self {
        Self {
            service,
            implementation,
            consumer,
            dependencies: ServiceDependencies::default(),
        }
    }

    /// 设置依赖声明
    pub fn with_dependencies(mut self, dependencies: ServiceDependencies) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// 服务提供者 trait
///
/// `build` 可以通过传入的定位器递归解析其他服务。
/// `dispose` 对每个构造成功的实例恰好调用一次，构造失败的实例永远不会被释放。
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    /// 提供的服务描述
    fn description(&self) -> ServiceDescription;

    /// 实现类型名称，用于注册通知和日志
    fn implementation(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// 为请求方制定实例化计划，不得有副作用
    fn plan(&self, consumer: &ServiceConsumer) -> DependencyResult<ServiceInstantiationDescription>;

    /// 按计划构造实例
    async fn build(
        &self,
        locator: &dyn ServiceLocator,
        plan: &ServiceInstantiationDescription,
    ) -> DependencyResult<ServiceInstance>;

    /// 销毁前回调
    async fn pre_destroy(
        &self,
        _instance: &ServiceInstance,
        _plan: &ServiceInstantiationDescription,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// 释放实例持有的资源
    async fn dispose(
        &self,
        _instance: ServiceInstance,
        _plan: &ServiceInstantiationDescription,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}

/// 服务定义
///
/// 代码模块按名称导出的服务。引导发现单元会为定义所在的模块创建提供者。
pub trait ServiceDefinition: Send + Sync {
    /// 为声明模块创建提供者
    fn provider(&self, module: &ModuleId) -> Arc<dyn ServiceProvider>;
}
