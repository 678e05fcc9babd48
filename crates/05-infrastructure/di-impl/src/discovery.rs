//! 模块发现循环
//!
//! 从根模块出发，反复在已知模块上执行其本地定义的发现单元，
//! 直到没有尚未执行的（发现单元, 模块）组合为止。
//! 发现单元可能返回新的代码模块，新模块在下一轮参与扫描。

use crate::configuration::ConfigurationImpl;
use crate::providers::InstanceServiceProvider;
use chrono::{DateTime, Utc};
use di_abstractions::{CodeModule, Configuration, LoaderKey, ModuleSet, ServiceProviderLoader};
use infrastructure_common::{DiscoveryError, DiscoveryResult, ModuleId, LOADERS_DESCRIPTOR};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

type LocalLoaders = Vec<(LoaderKey, Arc<dyn ServiceProviderLoader>)>;

/// 模块发现报告
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    /// 执行轮数
    pub passes: usize,
    /// 按执行顺序排列的（发现单元, 模块）组合
    pub executed: Vec<(LoaderKey, ModuleId)>,
    /// 按发现顺序排列的模块
    pub modules: Vec<ModuleId>,
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 结束时间
    pub finished_at: DateTime<Utc>,
}

impl DiscoveryReport {
    /// 耗时（毫秒）
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// 模块发现
pub struct ModuleDiscovery {
    configuration: Arc<ConfigurationImpl>,
}

impl ModuleDiscovery {
    /// 创建模块发现
    pub fn new(configuration: Arc<ConfigurationImpl>) -> Self {
        Self { configuration }
    }

    /// 执行发现直到不动点
    ///
    /// 任何发现单元失败都会中止整个发现过程。结束后以
    /// [`ModuleSet`] 注册全部已知模块。
    pub async fn run(&self, root: Arc<CodeModule>) -> DiscoveryResult<DiscoveryReport> {
        let started_at = Utc::now();
        info!("开始模块发现, 根模块: {}", root.id());

        let mut known: HashSet<ModuleId> = HashSet::from([root.id().clone()]);
        let mut frontier: Vec<Arc<CodeModule>> = vec![root];
        let mut local: HashMap<ModuleId, LocalLoaders> = HashMap::new();
        let mut done: HashSet<(LoaderKey, ModuleId)> = HashSet::new();
        let mut executed: Vec<(LoaderKey, ModuleId)> = Vec::new();
        let mut passes = 0;

        loop {
            for module in &frontier {
                if !local.contains_key(module.id()) {
                    local.insert(module.id().clone(), Self::local_loaders(module)?);
                }
            }

            let mut pending: Vec<(LoaderKey, Arc<dyn ServiceProviderLoader>, Arc<CodeModule>)> =
                Vec::new();
            for module in &frontier {
                let Some(loaders) = local.get(module.id()) else {
                    continue;
                };
                for (key, loader) in loaders {
                    if !done.contains(&(key.clone(), module.id().clone())) {
                        pending.push((key.clone(), loader.clone(), module.clone()));
                    }
                }
            }

            if pending.is_empty() {
                break;
            }
            passes += 1;
            info!("模块发现第 {} 轮, 待执行 {} 项", passes, pending.len());

            for (key, loader, module) in pending {
                debug!("执行发现单元 {} 于模块 {}", key, module.id());
                let configuration: &dyn Configuration = self.configuration.as_ref();
                let discovered = loader.load(configuration, &module).await.map_err(|source| {
                    DiscoveryError::LoaderFailed {
                        loader: key.name.clone(),
                        module: module.id().clone(),
                        source,
                    }
                })?;

                done.insert((key.clone(), module.id().clone()));
                executed.push((key, module.id().clone()));

                for found in discovered {
                    if known.insert(found.id().clone()) {
                        info!("发现新模块: {}", found.id());
                        frontier.push(found);
                    } else {
                        warn!("模块已存在, 忽略重复发现: {}", found.id());
                    }
                }
            }
        }

        let modules: Vec<ModuleId> = frontier.iter().map(|module| module.id().clone()).collect();
        self.configuration
            .register(Arc::new(InstanceServiceProvider::new(Arc::new(
                ModuleSet::new(frontier),
            ))))?;

        let report = DiscoveryReport {
            passes,
            executed,
            modules,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "模块发现完成: {} 个模块, {} 轮, 执行 {} 次, 耗时 {}ms",
            report.modules.len(),
            report.passes,
            report.executed.len(),
            report.elapsed_ms()
        );
        Ok(report)
    }

    /// 模块清单中可见、且定义在该模块本身的发现单元
    fn local_loaders(module: &CodeModule) -> DiscoveryResult<LocalLoaders> {
        let mut loaders = Vec::new();
        for name in module.descriptor_entries(LOADERS_DESCRIPTOR)? {
            let (defining, loader) =
                module
                    .defining_loader(&name)
                    .ok_or_else(|| DiscoveryError::UnknownLoader {
                        module: module.id().clone(),
                        loader: name.clone(),
                    })?;
            if defining.id() == module.id() {
                loaders.push((LoaderKey::new(defining.id().clone(), name), loader));
            } else {
                debug!(
                    "发现单元 {} 定义在祖先模块 {}, 模块 {} 不再执行",
                    name,
                    defining.id(),
                    module.id()
                );
            }
        }
        Ok(loaders)
    }
}
