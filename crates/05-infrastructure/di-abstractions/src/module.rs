//! 代码模块
//!
//! 代码模块是隔离的代码单元：拥有标识、可选的父模块、按名称索引的文本资源
//! （部署描述清单），以及本模块定义的发现单元和服务。
//! 名称查找采用父优先的委托顺序，与资源可见性一致。

use crate::loader::ServiceProviderLoader;
use crate::provider::ServiceDefinition;
use infrastructure_common::{
    read_deployment_descriptor, DescriptorError, ModuleId, ServiceDescription,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// 代码模块
pub struct CodeModule {
    id: ModuleId,
    parent: Option<Arc<CodeModule>>,
    resources: HashMap<String, String>,
    loaders: BTreeMap<String, Arc<dyn ServiceProviderLoader>>,
    services: BTreeMap<String, Arc<dyn ServiceDefinition>>,
}

impl CodeModule {
    /// 创建模块构建器
    pub fn builder(id: impl Into<ModuleId>) -> CodeModuleBuilder {
        CodeModuleBuilder::new(id)
    }

    /// 模块标识
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// 父模块
    pub fn parent(&self) -> Option<&Arc<CodeModule>> {
        self.parent.as_ref()
    }

    /// 本模块携带的资源
    pub fn resource(&self, name: &str) -> Option<&str> {
        self.resources.get(name).map(String::as_str)
    }

    /// 从根模块到本模块的模块链
    pub fn lineage(&self) -> Vec<&CodeModule> {
        let mut lineage = vec![self];
        let mut current = self.parent.as_deref();
        while let Some(module) = current {
            lineage.push(module);
            current = module.parent.as_deref();
        }
        lineage.reverse();
        lineage
    }

    /// 是否为指定模块本身或其祖先
    pub fn is_ancestor_or_self(&self, id: &ModuleId) -> bool {
        self.lineage().iter().any(|module| &module.id == id)
    }

    /// 本模块可见的清单条目（祖先的资源在前，本模块在后）
    pub fn descriptor_entries(&self, descriptor: &str) -> Result<Vec<String>, DescriptorError> {
        let mut entries: Vec<String> = Vec::new();
        for module in self.lineage() {
            for entry in module.local_descriptor_entries(descriptor)? {
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
            }
        }
        Ok(entries)
    }

    /// 仅本模块资源中的清单条目
    pub fn local_descriptor_entries(
        &self,
        descriptor: &str,
    ) -> Result<Vec<String>, DescriptorError> {
        match self.resource(descriptor) {
            Some(text) => read_deployment_descriptor(descriptor, text),
            None => Ok(Vec::new()),
        }
    }

    /// 按父优先顺序查找定义发现单元的模块
    pub fn defining_loader(
        &self,
        name: &str,
    ) -> Option<(&CodeModule, Arc<dyn ServiceProviderLoader>)> {
        self.lineage()
            .into_iter()
            .find_map(|module| module.loaders.get(name).map(|loader| (module, loader.clone())))
    }

    /// 按父优先顺序查找定义服务的模块
    pub fn defining_service(
        &self,
        name: &str,
    ) -> Option<(&CodeModule, Arc<dyn ServiceDefinition>)> {
        self.lineage()
            .into_iter()
            .find_map(|module| module.services.get(name).map(|service| (module, service.clone())))
    }

    /// 本模块定义的服务
    pub fn local_service(&self, name: &str) -> Option<Arc<dyn ServiceDefinition>> {
        self.services.get(name).cloned()
    }

    /// 本模块定义的发现单元名称
    pub fn loader_names(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    /// 本模块定义的服务名称
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

impl fmt::Debug for CodeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut resources: Vec<&String> = self.resources.keys().collect();
        resources.sort();
        f.debug_struct("CodeModule")
            .field("id", &self.id)
            .field("parent", &self.parent.as_ref().map(|parent| &parent.id))
            .field("resources", &resources)
            .field("loaders", &self.loaders.keys().collect::<Vec<_>>())
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// 代码模块构建器
pub struct CodeModuleBuilder {
    id: ModuleId,
    parent: Option<Arc<CodeModule>>,
    resources: HashMap<String, String>,
    loaders: BTreeMap<String, Arc<dyn ServiceProviderLoader>>,
    services: BTreeMap<String, Arc<dyn ServiceDefinition>>,
}

impl CodeModuleBuilder {
    /// 创建新的构建器
    pub fn new(id: impl Into<ModuleId>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            resources: HashMap::new(),
            loaders: BTreeMap::new(),
            services: BTreeMap::new(),
        }
    }

    /// 设置父模块
    pub fn with_parent(mut self, parent: Arc<CodeModule>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// 添加文本资源
    pub fn with_resource(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.resources.insert(name.into(), text.into());
        self
    }

    /// 定义发现单元
    pub fn with_loader(
        mut self,
        name: impl Into<String>,
        loader: Arc<dyn ServiceProviderLoader>,
    ) -> Self {
        self.loaders.insert(name.into(), loader);
        self
    }

    /// 定义服务
    pub fn with_service(
        mut self,
        name: impl Into<String>,
        service: Arc<dyn ServiceDefinition>,
    ) -> Self {
        self.services.insert(name.into(), service);
        self
    }

    /// 构建代码模块
    pub fn build(self) -> Arc<CodeModule> {
        Arc::new(CodeModule {
            id: self.id,
            parent: self.parent,
            resources: self.resources,
            loaders: self.loaders,
            services: self.services,
        })
    }
}

/// 已发现的全部代码模块
///
/// 模块发现结束后作为固定服务注册，描述为 `ServiceDescription::of::<ModuleSet>()`。
#[derive(Debug, Clone, Default)]
pub struct ModuleSet {
    modules: Vec<Arc<CodeModule>>,
}

impl ModuleSet {
    /// 按发现顺序创建模块集合
    pub fn new(modules: Vec<Arc<CodeModule>>) -> Self {
        Self { modules }
    }

    /// 模块集合的服务描述
    pub fn description() -> ServiceDescription {
        ServiceDescription::of::<ModuleSet>()
    }

    /// 全部模块
    pub fn modules(&self) -> &[Arc<CodeModule>] {
        &self.modules
    }

    /// 按标识查找模块
    pub fn get(&self, id: &ModuleId) -> Option<&Arc<CodeModule>> {
        self.modules.iter().find(|module| module.id() == id)
    }

    /// 全部模块标识
    pub fn ids(&self) -> Vec<ModuleId> {
        self.modules.iter().map(|module| module.id().clone()).collect()
    }

    /// 模块数量
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Configuration;
    use async_trait::async_trait;
    use infrastructure_common::{LoaderError, LOADERS_DESCRIPTOR};

    struct NoopLoader;

    #[async_trait]
    impl ServiceProviderLoader for NoopLoader {
        async fn load(
            &self,
            _configuration: &dyn Configuration,
            _module: &Arc<CodeModule>,
        ) -> Result<Vec<Arc<CodeModule>>, LoaderError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_lineage_is_root_first() {
        let root = CodeModule::builder("root").build();
        let middle = CodeModule::builder("middle").with_parent(root).build();
        let leaf = CodeModule::builder("leaf").with_parent(middle).build();

        let ids: Vec<&str> = leaf.lineage().iter().map(|m| m.id().as_str()).collect();
        assert_eq!(ids, vec!["root", "middle", "leaf"]);
        assert!(leaf.is_ancestor_or_self(&ModuleId::new("root")));
        assert!(!leaf.is_ancestor_or_self(&ModuleId::new("other")));
    }

    #[test]
    fn test_descriptor_entries_include_ancestors() {
        let root = CodeModule::builder("root")
            .with_resource(LOADERS_DESCRIPTOR, "bootstrap\n")
            .build();
        let child = CodeModule::builder("child")
            .with_parent(root)
            .with_resource(LOADERS_DESCRIPTOR, "plugin # 插件\nbootstrap\n")
            .build();

        assert_eq!(
            child.descriptor_entries(LOADERS_DESCRIPTOR).unwrap(),
            vec!["bootstrap", "plugin"]
        );
        assert_eq!(
            child.local_descriptor_entries(LOADERS_DESCRIPTOR).unwrap(),
            vec!["plugin", "bootstrap"]
        );
    }

    #[test]
    fn test_defining_loader_is_parent_first() {
        let root = CodeModule::builder("root")
            .with_loader("shared", Arc::new(NoopLoader))
            .build();
        let child = CodeModule::builder("child")
            .with_parent(root)
            .with_loader("shared", Arc::new(NoopLoader))
            .with_loader("own", Arc::new(NoopLoader))
            .build();

        let (defining, _) = child.defining_loader("shared").unwrap();
        assert_eq!(defining.id().as_str(), "root");
        let (defining, _) = child.defining_loader("own").unwrap();
        assert_eq!(defining.id().as_str(), "child");
        assert!(child.defining_loader("missing").is_none());
    }

    #[test]
    fn test_module_set_lookup() {
        let root = CodeModule::builder("root").build();
        let plugin = CodeModule::builder("plugin").with_parent(root.clone()).build();
        let set = ModuleSet::new(vec![root, plugin]);

        assert_eq!(set.len(), 2);
        assert!(set.get(&ModuleId::new("plugin")).is_some());
        assert_eq!(set.ids(), vec![ModuleId::new("root"), ModuleId::new("plugin")]);
    }
}
