//! 服务描述
//!
//! 标识一个被请求的服务契约。相等性只由类型 ID 和限定名决定，
//! 类型名称仅用于诊断输出。

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 服务描述
///
/// 注册表和单例缓存都以它为键。契约既可以是具体类型，也可以是 trait object：
///
/// ```rust
/// use infrastructure_common::ServiceDescription;
///
/// trait Calculator: Send + Sync {}
///
/// let plain = ServiceDescription::of::<dyn Calculator>();
/// let named = ServiceDescription::of::<dyn Calculator>().qualified("remote");
/// assert_ne!(plain, named);
/// ```
#[derive(Clone)]
pub struct ServiceDescription {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<String>,
}

impl ServiceDescription {
    /// 创建指定契约类型的服务描述
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            qualifier: None,
        }
    }

    /// 附加限定名
    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// 契约类型 ID
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// 契约类型名称
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 限定名
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// 是否描述同一个契约类型（忽略限定名）
    pub fn is_type<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for ServiceDescription {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.qualifier == other.qualifier
    }
}

impl Eq for ServiceDescription {}

impl Hash for ServiceDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.qualifier.hash(state);
    }
}

impl fmt::Display for ServiceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}[{}]", self.type_name, qualifier),
            None => f.write_str(self.type_name),
        }
    }
}

impl fmt::Debug for ServiceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceDescription({})", self)
    }
}

/// 依赖链
///
/// 一次解析调用树中正在构造的服务，按进入顺序排列。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyChain {
    services: Vec<ServiceDescription>,
}

impl DependencyChain {
    /// 创建空的依赖链
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回追加了一个服务的新链
    pub fn with(&self, service: ServiceDescription) -> Self {
        let mut services = self.services.clone();
        services.push(service);
        Self { services }
    }

    /// 链中是否包含指定服务
    pub fn contains(&self, service: &ServiceDescription) -> bool {
        self.services.contains(service)
    }

    /// 链长度
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// 链中的服务
    pub fn services(&self) -> &[ServiceDescription] {
        &self.services
    }
}

impl fmt::Display for DependencyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain = self
            .services
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        f.write_str(&chain)
    }
}
