//! 基础设施主入口

use crate::builder::InfrastructureBuilder;
use crate::init::InitService;
use crate::settings::ContainerSettings;
use di_abstractions::{CodeModule, ServiceLocator};
use di_impl::{DependencyInjection, DiscoveryReport, ShutdownReport};
use infrastructure_common::{InfrastructureError, InfrastructureResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// 服务基础设施
///
/// 一次模块发现、一次运行、一次有序关闭。
pub struct ServiceInfrastructure {
    /// 服务注入容器
    container: DependencyInjection,
    /// 根模块
    root: Arc<CodeModule>,
    /// 容器设置
    settings: ContainerSettings,
    /// 运行状态
    status: RwLock<InfrastructureStatus>,
    /// 统计信息
    metrics: RwLock<InfrastructureMetrics>,
}

impl ServiceInfrastructure {
    /// 创建基础设施构建器
    pub fn builder() -> InfrastructureBuilder {
        InfrastructureBuilder::new()
    }

    /// 内部构造函数
    pub(crate) fn new(
        container: DependencyInjection,
        root: Arc<CodeModule>,
        settings: ContainerSettings,
    ) -> Self {
        Self {
            container,
            root,
            settings,
            status: RwLock::new(InfrastructureStatus::Initialized),
            metrics: RwLock::new(InfrastructureMetrics::default()),
        }
    }

    /// 启动：模块发现，然后执行全部初始化组件
    pub async fn start(&self) -> InfrastructureResult<DiscoveryReport> {
        info!("启动基础设施");
        self.set_status(InfrastructureStatus::Starting);
        self.metrics.write().start_time = Some(chrono::Utc::now());

        let report = match self.container.load_services(self.root.clone()).await {
            Ok(report) => report,
            Err(e) => {
                error!("模块发现失败: {}", e);
                self.set_status(InfrastructureStatus::Failed);
                return Err(e.into());
            }
        };

        // 初始化服务通过容器解析服务定位器
        let executed = match self.run_init_components().await {
            Ok(executed) => executed,
            Err(e) => {
                error!("初始化组件执行失败: {}", e);
                self.set_status(InfrastructureStatus::Failed);
                return Err(e);
            }
        };

        {
            let mut metrics = self.metrics.write();
            metrics.discovered_modules_count = report.modules.len();
            metrics.discovery_passes = report.passes;
            metrics.registered_services_count =
                self.container.configuration().registered_services().len();
            metrics.init_components_count = executed.len();
        }

        self.set_status(InfrastructureStatus::Running);
        info!("基础设施启动完成");
        Ok(report)
    }

    async fn run_init_components(&self) -> InfrastructureResult<Vec<String>> {
        let locator = self.container.get::<dyn ServiceLocator>().await?;
        InitService::new(locator).run().await
    }

    /// 停止：按构造顺序的逆序释放全部服务
    pub async fn stop(&self) -> InfrastructureResult<ShutdownReport> {
        if self.status() == InfrastructureStatus::Stopped {
            return Err(InfrastructureError::BootstrapFailed {
                message: "基础设施已停止".to_string(),
            });
        }

        info!("停止基础设施");
        self.set_status(InfrastructureStatus::Stopping);

        let report = self.container.shutdown().await;

        {
            let mut metrics = self.metrics.write();
            metrics.stop_time = Some(chrono::Utc::now());
            metrics.disposed_services_count = report.disposed.len();
            metrics.disposal_failures_count = report.failures.len();
        }
        self.set_status(InfrastructureStatus::Stopped);

        info!("基础设施停止完成");
        Ok(report)
    }

    /// 以容器自身作为请求方解析未限定的服务
    pub async fn get<T>(&self) -> InfrastructureResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Ok(self.container.get::<T>().await?)
    }

    /// 获取运行状态
    pub fn status(&self) -> InfrastructureStatus {
        *self.status.read()
    }

    /// 获取统计信息
    pub fn metrics(&self) -> InfrastructureMetrics {
        self.metrics.read().clone()
    }

    /// 服务注入容器
    pub fn container(&self) -> &DependencyInjection {
        &self.container
    }

    /// 容器设置
    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    fn set_status(&self, status: InfrastructureStatus) {
        *self.status.write() = status;
    }
}

/// 基础设施运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfrastructureStatus {
    /// 已初始化
    Initialized,
    /// 启动中
    Starting,
    /// 运行中
    Running,
    /// 停止中
    Stopping,
    /// 已停止
    Stopped,
    /// 失败
    Failed,
}

/// 基础设施统计信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfrastructureMetrics {
    /// 启动时间
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// 停止时间
    pub stop_time: Option<chrono::DateTime<chrono::Utc>>,
    /// 已发现的模块数量
    pub discovered_modules_count: usize,
    /// 模块发现轮数
    pub discovery_passes: usize,
    /// 已注册的服务数量
    pub registered_services_count: usize,
    /// 已执行的初始化组件数量
    pub init_components_count: usize,
    /// 已释放的服务数量
    pub disposed_services_count: usize,
    /// 释放失败次数
    pub disposal_failures_count: usize,
}

impl InfrastructureMetrics {
    /// 计算运行时间
    pub fn uptime(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.stop_time) {
            (Some(start), Some(stop)) => Some(stop - start),
            (Some(start), None) => Some(chrono::Utc::now() - start),
            _ => None,
        }
    }
}
