//! 引导发现单元
//!
//! 读取模块的 `services` 和 `init` 清单，把定义在该模块中的服务注册到容器。

use async_trait::async_trait;
use di_abstractions::{CodeModule, Configuration, ServiceProviderLoader};
use infrastructure_common::{LoaderError, INIT_DESCRIPTOR, SERVICES_DESCRIPTOR};
use std::sync::Arc;
use tracing::{debug, info};

/// 引导发现单元的常用名称
pub const BOOTSTRAP_LOADER: &str = "bootstrap";

/// 引导发现单元
///
/// `services` 清单中的名称按父优先顺序查找定义：定义在当前模块的服务被注册，
/// 定义在祖先模块的服务跳过（由祖先模块自己的引导单元负责），
/// 任何模块都没有定义的名称返回 [`LoaderError::UnknownService`]。
///
/// `init` 清单只读取模块自身的条目，与 [`InitService`](crate::init::InitService)
/// 一致，条目必须定义在当前模块中。
#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapServiceProviderLoader;

impl BootstrapServiceProviderLoader {
    /// 创建引导发现单元
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServiceProviderLoader for BootstrapServiceProviderLoader {
    async fn load(
        &self,
        configuration: &dyn Configuration,
        module: &Arc<CodeModule>,
    ) -> Result<Vec<Arc<CodeModule>>, LoaderError> {
        let services = module.descriptor_entries(SERVICES_DESCRIPTOR)?;
        let init = module.local_descriptor_entries(INIT_DESCRIPTOR)?;

        let mut registered: Vec<&String> = Vec::new();
        for name in &services {
            let (defining, definition) = module
                .defining_service(name)
                .ok_or_else(|| unknown_service(module, name))?;
            if defining.id() != module.id() {
                debug!("服务 {} 定义在祖先模块 {}, 跳过", name, defining.id());
                continue;
            }
            configuration.register(definition.provider(module.id()))?;
            registered.push(name);
        }

        for name in &init {
            if registered.contains(&name) {
                continue;
            }
            let definition = module
                .local_service(name)
                .ok_or_else(|| unknown_service(module, name))?;
            configuration.register(definition.provider(module.id()))?;
            registered.push(name);
        }

        info!("模块 {} 引导注册 {} 个服务", module.id(), registered.len());
        Ok(Vec::new())
    }
}

fn unknown_service(module: &CodeModule, name: &str) -> LoaderError {
    LoaderError::UnknownService {
        module: module.id().clone(),
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::Injectable;
    use di_impl::{ClassServiceProvider, ConfigurationImpl};
    use infrastructure_common::{ServiceDescription, ServiceLifecycle};

    #[derive(Default)]
    struct Audit;

    impl ServiceLifecycle for Audit {}
    impl Injectable for Audit {}

    #[derive(Default)]
    struct Cache;

    impl ServiceLifecycle for Cache {}
    impl Injectable for Cache {}

    #[tokio::test]
    async fn test_registers_only_locally_defined_services() {
        let root = CodeModule::builder("root")
            .with_resource(SERVICES_DESCRIPTOR, "audit")
            .with_service("audit", Arc::new(ClassServiceProvider::<Audit>::new()))
            .build();
        let plugin = CodeModule::builder("plugin")
            .with_parent(root.clone())
            .with_resource(SERVICES_DESCRIPTOR, "cache # 本地缓存")
            .with_service("cache", Arc::new(ClassServiceProvider::<Cache>::new()))
            .build();

        let configuration = ConfigurationImpl::new();
        let loader = BootstrapServiceProviderLoader::new();
        loader.load(&configuration, &root).await.unwrap();
        loader.load(&configuration, &plugin).await.unwrap();

        assert!(configuration.is_registered(&ServiceDescription::of::<Audit>()));
        assert!(configuration.is_registered(&ServiceDescription::of::<Cache>()));
        assert_eq!(configuration.registered_services().len(), 2);
    }

    #[tokio::test]
    async fn test_init_entry_must_be_defined_locally() {
        let root = CodeModule::builder("root")
            .with_resource(INIT_DESCRIPTOR, "audit")
            .with_service("audit", Arc::new(ClassServiceProvider::<Audit>::new()))
            .build();
        let plugin = CodeModule::builder("plugin")
            .with_parent(root.clone())
            .with_resource(INIT_DESCRIPTOR, "audit")
            .build();

        let configuration = ConfigurationImpl::new();
        let loader = BootstrapServiceProviderLoader::new();
        loader.load(&configuration, &root).await.unwrap();
        assert_eq!(configuration.registered_services().len(), 1);

        // 祖先的 init 条目不会被子模块继承，子模块自己列出的条目必须本地定义
        let error = loader.load(&configuration, &plugin).await.unwrap_err();
        assert!(matches!(
            error,
            LoaderError::UnknownService { ref module, ref name }
                if module.as_str() == "plugin" && name == "audit"
        ));
    }

    #[tokio::test]
    async fn test_unknown_service_name() {
        let root = CodeModule::builder("root")
            .with_resource(SERVICES_DESCRIPTOR, "ghost")
            .build();

        let error = BootstrapServiceProviderLoader
            .load(&ConfigurationImpl::new(), &root)
            .await
            .unwrap_err();
        assert!(matches!(error, LoaderError::UnknownService { ref name, .. } if name == "ghost"));
    }
}
