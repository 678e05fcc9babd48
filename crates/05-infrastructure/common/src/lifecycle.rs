//! 服务生命周期管理

use crate::errors::BoxError;
use async_trait::async_trait;

/// 服务生命周期回调
///
/// `post_construct` 在所有注入完成后、任何调用方拿到实例之前执行；
/// `pre_destroy` 在关闭时、释放资源之前执行。两个回调默认都是空操作。
#[async_trait]
pub trait ServiceLifecycle: Send + Sync {
    /// 构造后回调
    async fn post_construct(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    /// 销毁前回调
    async fn pre_destroy(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// 单例条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// 正在构造，再次请求即为循环依赖
    Constructing,
    /// 已构造完成，可共享
    Ready,
    /// 已在关闭流程中释放
    Disposed,
}

impl EntryState {
    /// 是否可以返回给调用方
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}
