//! 错误类型定义

use crate::consumer::{ModuleId, ServiceConsumer};
use crate::description::{DependencyChain, ServiceDescription};
use thiserror::Error;

/// 装箱的动态错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 依赖解析错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("服务重复注册: {service}")]
    DuplicateService { service: ServiceDescription },

    #[error("服务未注册: {service}, 请求方: {consumer}")]
    ServiceNotFound {
        service: ServiceDescription,
        consumer: ServiceConsumer,
    },

    #[error("循环依赖检测到: {chain}")]
    CircularDependency { chain: DependencyChain },

    #[error("服务构造失败: {service}, 请求方: {consumer}, 原因: {source}")]
    ConstructionFailed {
        service: ServiceDescription,
        consumer: ServiceConsumer,
        source: BoxError,
    },

    #[error("解析深度超过上限 {limit}: {chain}")]
    ResolutionDepthExceeded {
        limit: usize,
        chain: DependencyChain,
    },

    #[error("服务类型不匹配: {service}, 期望类型: {expected}")]
    TypeMismatch {
        service: ServiceDescription,
        expected: &'static str,
    },

    #[error("服务已释放: {service}")]
    ServiceDisposed { service: ServiceDescription },
}

impl DependencyError {
    /// 创建构造失败错误
    pub fn construction_failed(
        service: ServiceDescription,
        consumer: ServiceConsumer,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::ConstructionFailed {
            service,
            consumer,
            source: source.into(),
        }
    }

    /// 是否为循环依赖
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}

/// 上下文配置错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("上下文配置不存在: {key}, 请求方: {consumer}")]
    NotFound {
        key: String,
        consumer: ServiceConsumer,
    },
}

/// 注入错误类型
///
/// 由 `Injectable` 实现在写入字段时返回。
#[derive(Error, Debug)]
pub enum InjectionError {
    #[error("未声明的上下文配置: {key}")]
    UnknownContextKey { key: String },

    #[error("未声明的服务引用: {service}")]
    UnknownReference { service: ServiceDescription },

    #[error("服务引用类型不匹配: {service}, 期望类型: {expected}")]
    ReferenceTypeMismatch {
        service: ServiceDescription,
        expected: &'static str,
    },

    #[error("上下文配置值无效: {key}, 值: {value}, 原因: {reason}")]
    InvalidContextValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("服务引用尚未注入: {type_name}")]
    NotInjected { type_name: &'static str },
}

/// 部署描述清单错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("部署描述条目无效: {descriptor} 第 {line} 行: {entry}")]
    InvalidEntry {
        descriptor: String,
        line: usize,
        entry: String,
    },
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {path}, 原因: {source}")]
    ParseError { path: String, source: BoxError },

    #[error("配置格式不支持: {path}")]
    UnsupportedFormat { path: String },

    #[error("配置类型转换失败: {message}")]
    TypeConversionError { message: String },
}

/// 发现单元执行错误类型
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error(transparent)]
    Registration(#[from] DependencyError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("模块 {module} 中未定义服务: {name}")]
    UnknownService { module: ModuleId, name: String },

    #[error("发现单元执行失败: {message}")]
    Failed { message: String },
}

impl LoaderError {
    /// 创建执行失败错误
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// 模块发现错误类型
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("模块 {module} 的发现单元清单中存在未定义的发现单元: {loader}")]
    UnknownLoader { module: ModuleId, loader: String },

    #[error("发现单元 {loader} 在模块 {module} 上执行失败: {source}")]
    LoaderFailed {
        loader: String,
        module: ModuleId,
        source: LoaderError,
    },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Registration(#[from] DependencyError),
}

/// 服务释放错误类型
///
/// 只会被记录和收集，不会中断关闭流程。
#[derive(Error, Debug)]
pub enum DisposalError {
    #[error("销毁前回调失败: {service}, 原因: {source}")]
    PreDestroyFailed {
        service: ServiceDescription,
        source: BoxError,
    },

    #[error("服务释放失败: {service}, 原因: {source}")]
    DisposeFailed {
        service: ServiceDescription,
        source: BoxError,
    },
}

impl DisposalError {
    /// 出错的服务
    pub fn service(&self) -> &ServiceDescription {
        match self {
            Self::PreDestroyFailed { service, .. } | Self::DisposeFailed { service, .. } => service,
        }
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("初始化组件执行失败: {component}, 原因: {source}")]
    InitFailed { component: String, source: BoxError },

    #[error("启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 依赖解析结果类型
pub type DependencyResult<T> = Result<T, DependencyError>;

/// 上下文配置结果类型
pub type ContextResult<T> = Result<T, ContextError>;

/// 注入结果类型
pub type InjectionResult<T> = Result<T, InjectionError>;

/// 模块发现结果类型
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// 配置结果类型
pub type ConfigResult<T> = Result<T, ConfigError>;

/// 基础设施结果类型
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
