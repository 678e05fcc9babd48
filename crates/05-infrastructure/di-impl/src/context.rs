//! 上下文配置解析器

use crate::configuration::ConfigurationImpl;
use di_abstractions::ContextLocator;
use infrastructure_common::{ContextError, ContextResult, ServiceConsumer};
use std::sync::Arc;
use tracing::debug;

/// 上下文配置解析器
///
/// 查找键对应的提供函数并以请求方调用。未注册的键或提供函数返回 `None`
/// 都视为不存在，不提供默认值。
pub struct ContextLocatorImpl {
    configuration: Arc<ConfigurationImpl>,
}

impl ContextLocatorImpl {
    /// 创建解析器
    pub fn new(configuration: Arc<ConfigurationImpl>) -> Self {
        Self { configuration }
    }
}

impl ContextLocator for ContextLocatorImpl {
    fn resolve(&self, key: &str, consumer: &ServiceConsumer) -> ContextResult<String> {
        let value = self
            .configuration
            .context_provider(key)
            .and_then(|provider| provider(consumer));

        match value {
            Some(value) => {
                debug!("解析上下文配置: {} -> {}", key, consumer);
                Ok(value)
            }
            None => Err(ContextError::NotFound {
                key: key.to_string(),
                consumer: consumer.clone(),
            }),
        }
    }
}
