//! 发现单元抽象接口

use crate::configuration::Configuration;
use crate::module::CodeModule;
use async_trait::async_trait;
use infrastructure_common::{LoaderError, ModuleId};
use std::fmt;
use std::sync::Arc;

/// 发现单元 trait
///
/// 针对一个代码模块执行，可以向注册表写入服务和上下文配置，
/// 返回执行过程中新发现的代码模块。
#[async_trait]
pub trait ServiceProviderLoader: Send + Sync {
    /// 在指定模块上执行
    async fn load(
        &self,
        configuration: &dyn Configuration,
        module: &Arc<CodeModule>,
    ) -> Result<Vec<Arc<CodeModule>>, LoaderError>;
}

/// 发现单元标识：定义模块 + 名称
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoaderKey {
    /// 定义发现单元的模块
    pub module: ModuleId,
    /// 发现单元名称
    pub name: String,
}

impl LoaderKey {
    /// 创建发现单元标识
    pub fn new(module: ModuleId, name: impl Into<String>) -> Self {
        Self {
            module,
            name: name.into(),
        }
    }
}

impl fmt::Display for LoaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.module)
    }
}
