//! 可注入服务
//!
//! 类服务提供者先以 `Default` 创建原始值，再按 [`Injectable::dependencies`]
//! 声明的顺序写入上下文配置值和服务引用，最后调用构造后回调。
//! 通常由 `#[derive(Injectable)]` 生成实现。

use crate::provider::{ServiceDependencies, ServiceInstance};
use infrastructure_common::{InjectionError, InjectionResult, ServiceDescription, ServiceLifecycle};
use std::fmt;
use std::sync::Arc;

/// 可注入服务 trait
pub trait Injectable: Default + ServiceLifecycle + Send + Sync + 'static {
    /// 构造所需的依赖
    fn dependencies() -> ServiceDependencies {
        ServiceDependencies::default()
    }

    /// 写入上下文配置值
    fn inject_context(&mut self, key: &str, _value: String) -> InjectionResult<()> {
        Err(InjectionError::UnknownContextKey {
            key: key.to_string(),
        })
    }

    /// 写入服务引用
    fn inject_reference(
        &mut self,
        service: &ServiceDescription,
        _instance: &ServiceInstance,
    ) -> InjectionResult<()> {
        Err(InjectionError::UnknownReference {
            service: service.clone(),
        })
    }
}

/// 服务引用字段
///
/// 构造完成前为空，由提供者在构造过程中注入。
pub struct Reference<T: ?Sized> {
    instance: Option<Arc<T>>,
}

impl<T: ?Sized> Default for Reference<T> {
    fn default() -> Self {
        Self { instance: None }
    }
}

impl<T: ?Sized> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("type_name", &std::any::type_name::<T>())
            .field("injected", &self.instance.is_some())
            .finish()
    }
}

impl<T> Reference<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    /// 引用的服务描述
    pub fn describe() -> ServiceDescription {
        ServiceDescription::of::<T>()
    }

    /// 写入解析到的实例
    pub fn inject(
        &mut self,
        service: &ServiceDescription,
        instance: &ServiceInstance,
    ) -> InjectionResult<()> {
        let typed = instance
            .downcast::<T>()
            .ok_or_else(|| InjectionError::ReferenceTypeMismatch {
                service: service.clone(),
                expected: std::any::type_name::<T>(),
            })?;
        self.instance = Some(typed);
        Ok(())
    }

    /// 已注入的实例
    pub fn get(&self) -> Option<&Arc<T>> {
        self.instance.as_ref()
    }

    /// 已注入的实例，未注入时返回错误
    pub fn require(&self) -> InjectionResult<&Arc<T>> {
        self.instance.as_ref().ok_or(InjectionError::NotInjected {
            type_name: std::any::type_name::<T>(),
        })
    }

    /// 是否已注入
    pub fn is_injected(&self) -> bool {
        self.instance.is_some()
    }
}
