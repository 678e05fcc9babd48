//! 服务注册抽象接口
//!
//! 模块发现阶段由发现单元写入，运行阶段只读。

use crate::provider::ServiceProvider;
use infrastructure_common::{DependencyResult, ServiceConsumer, ServiceDescription};
use std::sync::Arc;

/// 上下文配置提供函数
///
/// 返回 `None` 表示该请求方没有可用的值。
pub type ContextProviderFn = Arc<dyn Fn(&ServiceConsumer) -> Option<String> + Send + Sync>;

/// 服务注册 trait
pub trait Configuration: Send + Sync {
    /// 注册服务提供者，同一服务描述只能注册一次
    fn register(&self, provider: Arc<dyn ServiceProvider>) -> DependencyResult<()>;

    /// 注册上下文配置提供函数，后注册的覆盖先注册的
    fn register_context_provider(&self, key: &str, provider: ContextProviderFn);

    /// 检查是否已注册指定服务
    fn is_registered(&self, service: &ServiceDescription) -> bool;
}

impl dyn Configuration + '_ {
    /// 注册固定的上下文配置值
    pub fn register_context_value(&self, key: &str, value: impl Into<String>) {
        let value = value.into();
        self.register_context_provider(key, Arc::new(move |_| Some(value.clone())));
    }

    /// 注册依赖请求方的上下文配置提供函数
    pub fn register_context_fn<F>(&self, key: &str, provider: F)
    where
        F: Fn(&ServiceConsumer) -> Option<String> + Send + Sync + 'static,
    {
        self.register_context_provider(key, Arc::new(provider));
    }
}
