//! 请求方身份

use std::any::TypeId;
use std::fmt;

/// 代码模块标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    /// 创建模块标识
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 字符串形式
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModuleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// 容器自身作为请求方时使用的标记类型
struct ContainerRoot;

/// 请求方身份
///
/// 标识发起解析的组件（声明类型），以及声明它的模块。
/// 上下文配置可以根据请求方给出不同的值。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceConsumer {
    type_id: TypeId,
    type_name: &'static str,
    module: Option<ModuleId>,
}

impl ServiceConsumer {
    /// 以指定类型作为请求方
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            module: None,
        }
    }

    /// 容器自身
    pub fn root() -> Self {
        Self::of::<ContainerRoot>()
    }

    /// 设置声明模块
    pub fn in_module(mut self, module: ModuleId) -> Self {
        self.module = Some(module);
        self
    }

    /// 请求方类型 ID
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// 请求方类型名称
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 声明模块
    pub fn module(&self) -> Option<&ModuleId> {
        self.module.as_ref()
    }

    /// 是否为容器自身
    pub fn is_root(&self) -> bool {
        self.type_id == TypeId::of::<ContainerRoot>()
    }
}

impl fmt::Display for ServiceConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("<container>")?;
        } else {
            f.write_str(self.type_name)?;
        }
        if let Some(module) = &self.module {
            write!(f, "@{}", module)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Consumer;

    #[test]
    fn test_module_is_part_of_identity() {
        let plain = ServiceConsumer::of::<Consumer>();
        let scoped = ServiceConsumer::of::<Consumer>().in_module(ModuleId::new("plugin"));
        assert_ne!(plain, scoped);
        assert_eq!(scoped.module().map(ModuleId::as_str), Some("plugin"));
        assert!(scoped.to_string().ends_with("@plugin"));
    }

    #[test]
    fn test_root_consumer() {
        let root = ServiceConsumer::root();
        assert!(root.is_root());
        assert_eq!(root.to_string(), "<container>");
        assert!(!ServiceConsumer::of::<Consumer>().is_root());
    }
}
