//! di-impl 集成测试：解析、循环依赖、模块发现与有序关闭

use async_trait::async_trait;
use di_abstractions::{
    CodeModule, Configuration, Reference, ServiceInstance, ServiceInstantiationDescription,
    ServiceLocator, ServiceProvider, ServiceProviderLoader,
};
use di_impl::{
    ClassServiceProvider, ConfigurationExt, ConfigurationImpl, DependencyInjection,
    ModuleDiscovery,
};
use infrastructure_common::{
    BoxError, DependencyError, DependencyResult, DisposalError, LoaderError, ModuleId,
    ServiceConsumer, ServiceDescription, ServiceLifecycle, LOADERS_DESCRIPTOR,
};
use service_macros::Injectable;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// 单例与未注册服务
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Injectable)]
#[injectable(default_lifecycle)]
struct Counter;

#[tokio::test]
async fn test_singleton_resolves_identical_instance() -> anyhow::Result<()> {
    let container = DependencyInjection::new();
    container.configuration().register_service::<Counter>()?;

    let first = container.get::<Counter>().await?;
    let second = container.get::<Counter>().await?;
    assert!(Arc::ptr_eq(&first, &second));
    Ok(())
}

#[tokio::test]
async fn test_unregistered_service_is_not_found() {
    let container = DependencyInjection::new();

    for _ in 0..2 {
        let error = container.get::<Counter>().await.unwrap_err();
        match error {
            DependencyError::ServiceNotFound { service, consumer } => {
                assert_eq!(service, ServiceDescription::of::<Counter>());
                assert!(consumer.is_root());
            }
            other => panic!("意外的错误: {}", other),
        }
    }
}

// ---------------------------------------------------------------------------
// 循环依赖
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Injectable)]
#[injectable(default_lifecycle)]
struct Alpha {
    #[reference]
    beta: Reference<Beta>,
}

#[derive(Default, Injectable)]
#[injectable(default_lifecycle)]
struct Beta {
    #[reference]
    alpha: Reference<Alpha>,
}

#[tokio::test]
async fn test_mutual_dependency_reports_cycle() {
    let container = DependencyInjection::new();
    container.configuration().register_service::<Alpha>().unwrap();
    container.configuration().register_service::<Beta>().unwrap();

    let error = container.get::<Alpha>().await.unwrap_err();
    let DependencyError::CircularDependency { chain } = error else {
        panic!("期望循环依赖错误");
    };
    assert!(chain.contains(&ServiceDescription::of::<Alpha>()));
    assert!(chain.contains(&ServiceDescription::of::<Beta>()));
    assert_eq!(chain.len(), 3);

    // 失败的构造不会留下任何条目
    let locator = container.locator();
    assert!(locator.state(&ServiceDescription::of::<Alpha>()).is_none());
    assert!(locator.state(&ServiceDescription::of::<Beta>()).is_none());
}

// ---------------------------------------------------------------------------
// 上下文配置按请求方解析
// ---------------------------------------------------------------------------

#[derive(Default, Injectable)]
#[injectable(default_lifecycle)]
struct Client {
    #[context("host")]
    host: String,
}

#[derive(Default, Injectable)]
#[injectable(default_lifecycle)]
struct Gateway {
    #[reference]
    client: Reference<Client>,
}

struct Requester;

fn host_container() -> DependencyInjection {
    let container = DependencyInjection::new();
    container.configuration().register_service::<Client>().unwrap();
    container.configuration().register_service::<Gateway>().unwrap();

    let dynamic: &dyn Configuration = container.configuration().as_ref();
    dynamic.register_context_fn("host", |consumer| {
        Some(format!("{}.internal", consumer.type_name()))
    });
    container
}

#[tokio::test]
async fn test_context_values_follow_requesting_consumer() {
    let container = host_container();
    let instance = container
        .resolve(
            &ServiceDescription::of::<Client>(),
            &ServiceConsumer::of::<Requester>(),
        )
        .await
        .unwrap();
    let client = instance.downcast::<Client>().unwrap();
    assert!(client.host.ends_with("Requester.internal"));
}

#[tokio::test]
async fn test_nested_reference_requests_as_dependent() {
    let container = host_container();
    let gateway = container.get::<Gateway>().await.unwrap();

    // 嵌套解析时请求方是正在构造的服务
    let client = gateway.client.require().unwrap();
    assert!(client.host.ends_with("Gateway.internal"));
}

// ---------------------------------------------------------------------------
// 模块发现
// ---------------------------------------------------------------------------

#[derive(Default, Injectable)]
#[injectable(default_lifecycle)]
struct Plugin;

/// 注册一个服务，不返回新模块
struct Registering;

#[async_trait]
impl ServiceProviderLoader for Registering {
    async fn load(
        &self,
        configuration: &dyn Configuration,
        _module: &Arc<CodeModule>,
    ) -> Result<Vec<Arc<CodeModule>>, LoaderError> {
        configuration.register(Arc::new(ClassServiceProvider::<Plugin>::new()))?;
        Ok(Vec::new())
    }
}

/// 每次执行都返回同一个子模块
///
/// 子模块以本单元所在模块为父模块，构建完成后再写入。
#[derive(Default)]
struct Spawning {
    child: Mutex<Option<Arc<CodeModule>>>,
    runs: AtomicUsize,
}

impl Spawning {
    fn set_child(&self, child: Arc<CodeModule>) {
        *self.child.lock().unwrap() = Some(child);
    }
}

#[async_trait]
impl ServiceProviderLoader for Spawning {
    async fn load(
        &self,
        _configuration: &dyn Configuration,
        _module: &Arc<CodeModule>,
    ) -> Result<Vec<Arc<CodeModule>>, LoaderError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let child = self
            .child
            .lock()
            .map_err(|e| LoaderError::failed(e.to_string()))?
            .clone();
        Ok(child.into_iter().collect())
    }
}

/// 什么都不做，只记录执行次数
#[derive(Default)]
struct Noop {
    runs: AtomicUsize,
}

#[async_trait]
impl ServiceProviderLoader for Noop {
    async fn load(
        &self,
        _configuration: &dyn Configuration,
        _module: &Arc<CodeModule>,
    ) -> Result<Vec<Arc<CodeModule>>, LoaderError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

fn static_graph() -> Arc<CodeModule> {
    CodeModule::builder("m0")
        .with_resource(LOADERS_DESCRIPTOR, "register")
        .with_loader("register", Arc::new(Registering))
        .build()
}

#[tokio::test]
async fn test_discovery_is_idempotent_over_static_graph() {
    let root = static_graph();

    let mut registered = Vec::new();
    for _ in 0..2 {
        let configuration = Arc::new(ConfigurationImpl::new());
        let report = ModuleDiscovery::new(configuration.clone())
            .run(root.clone())
            .await
            .unwrap();
        assert_eq!(report.passes, 1);
        assert_eq!(report.executed.len(), 1);
        registered.push(configuration.registered_services());
    }
    assert_eq!(registered[0], registered[1]);
    assert!(registered[0].contains(&ServiceDescription::of::<Plugin>()));
}

#[tokio::test]
async fn test_descendant_does_not_rerun_ancestor_loader() {
    let spawn = Arc::new(Spawning::default());
    let root = CodeModule::builder("m0")
        .with_resource(LOADERS_DESCRIPTOR, "register\nspawn")
        .with_loader("register", Arc::new(Registering))
        .with_loader("spawn", spawn.clone())
        .build();
    spawn.set_child(CodeModule::builder("m1").with_parent(root.clone()).build());

    // 子模块继承了 register 清单条目，但不再执行
    let configuration = Arc::new(ConfigurationImpl::new());
    let report = ModuleDiscovery::new(configuration.clone())
        .run(root)
        .await
        .unwrap();
    assert_eq!(report.modules.len(), 2);
    assert_eq!(report.executed.len(), 2);
    assert!(report
        .executed
        .iter()
        .all(|(_, module)| module == &ModuleId::new("m0")));
    assert_eq!(spawn.runs.load(Ordering::SeqCst), 1);

    // Plugin 与模块集合
    assert_eq!(configuration.registered_services().len(), 2);
}

#[tokio::test]
async fn test_loader_defined_in_discovered_module_runs() {
    let u1 = Arc::new(Spawning::default());
    let u2 = Arc::new(Noop::default());
    let m0 = CodeModule::builder("m0")
        .with_resource(LOADERS_DESCRIPTOR, "u1")
        .with_loader("u1", u1.clone())
        .build();
    let m1 = CodeModule::builder("m1")
        .with_parent(m0.clone())
        .with_resource(LOADERS_DESCRIPTOR, "u2")
        .with_loader("u2", u2.clone())
        .build();
    u1.set_child(m1);

    let configuration = Arc::new(ConfigurationImpl::new());
    let report = ModuleDiscovery::new(configuration)
        .run(m0)
        .await
        .unwrap();

    assert_eq!(report.passes, 2);
    assert_eq!(report.modules, vec![ModuleId::new("m0"), ModuleId::new("m1")]);
    let executed: Vec<(String, String)> = report
        .executed
        .iter()
        .map(|(key, module)| (key.name.clone(), module.as_str().to_string()))
        .collect();
    assert_eq!(
        executed,
        vec![
            ("u1".to_string(), "m0".to_string()),
            ("u2".to_string(), "m1".to_string()),
        ]
    );
    assert_eq!(u1.runs.load(Ordering::SeqCst), 1);
    assert_eq!(u2.runs.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// 有序关闭
// ---------------------------------------------------------------------------

static DESTROYED: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

fn destroyed(name: &'static str) -> Result<(), BoxError> {
    DESTROYED.lock().map_err(|e| e.to_string())?.push(name);
    Ok(())
}

#[derive(Default, Injectable)]
struct X;

#[async_trait]
impl ServiceLifecycle for X {
    async fn pre_destroy(&self) -> Result<(), BoxError> {
        destroyed("X")
    }
}

#[derive(Default, Injectable)]
struct Y {
    #[reference]
    x: Reference<X>,
}

#[async_trait]
impl ServiceLifecycle for Y {
    async fn pre_destroy(&self) -> Result<(), BoxError> {
        destroyed("Y")
    }
}

#[derive(Default, Injectable)]
struct Z {
    #[reference]
    y: Reference<Y>,
}

#[async_trait]
impl ServiceLifecycle for Z {
    async fn pre_destroy(&self) -> Result<(), BoxError> {
        destroyed("Z")
    }
}

#[tokio::test]
async fn test_shutdown_runs_in_reverse_creation_order() {
    let container = DependencyInjection::new();
    let configuration = container.configuration();
    configuration.register_service::<Z>().unwrap();
    configuration.register_service::<Y>().unwrap();
    configuration.register_service::<X>().unwrap();

    let z = container.get::<Z>().await.unwrap();
    assert!(z.y.require().unwrap().x.is_injected());
    assert_eq!(
        container.locator().creation_order(),
        vec![
            ServiceDescription::of::<X>(),
            ServiceDescription::of::<Y>(),
            ServiceDescription::of::<Z>(),
        ]
    );

    let report = container.shutdown().await;
    assert!(report.is_clean());
    assert_eq!(*DESTROYED.lock().unwrap(), vec!["Z", "Y", "X"]);

    // 再次关闭不会重复执行销毁回调
    let again = container.shutdown().await;
    assert!(again.disposed.is_empty());
    assert_eq!(DESTROYED.lock().unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// 关闭时的失败不会中断其余服务
// ---------------------------------------------------------------------------

static TEARDOWN: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn teardown(event: String) -> Result<(), BoxError> {
    TEARDOWN.lock().map_err(|e| e.to_string())?.push(event);
    Ok(())
}

#[derive(Default, Injectable)]
struct Source;

#[async_trait]
impl ServiceLifecycle for Source {
    async fn pre_destroy(&self) -> Result<(), BoxError> {
        teardown("pre_destroy:source".to_string())
    }
}

#[derive(Default, Injectable)]
struct Faulty {
    #[reference]
    source: Reference<Source>,
}

#[async_trait]
impl ServiceLifecycle for Faulty {
    async fn pre_destroy(&self) -> Result<(), BoxError> {
        teardown("pre_destroy:faulty".to_string())?;
        Err("连接未关闭".into())
    }
}

#[derive(Default, Injectable)]
struct Sink {
    #[reference]
    faulty: Reference<Faulty>,
}

#[async_trait]
impl ServiceLifecycle for Sink {
    async fn pre_destroy(&self) -> Result<(), BoxError> {
        teardown("pre_destroy:sink".to_string())
    }
}

/// 记录 dispose 调用的提供者包装
struct Tracked {
    name: &'static str,
    inner: Arc<dyn ServiceProvider>,
}

impl Tracked {
    fn wrap<T: di_abstractions::Injectable>(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            inner: Arc::new(ClassServiceProvider::<T>::new()),
        })
    }
}

#[async_trait]
impl ServiceProvider for Tracked {
    fn description(&self) -> ServiceDescription {
        self.inner.description()
    }

    fn plan(&self, consumer: &ServiceConsumer) -> DependencyResult<ServiceInstantiationDescription> {
        self.inner.plan(consumer)
    }

    async fn build(
        &self,
        locator: &dyn ServiceLocator,
        plan: &ServiceInstantiationDescription,
    ) -> DependencyResult<ServiceInstance> {
        self.inner.build(locator, plan).await
    }

    async fn pre_destroy(
        &self,
        instance: &ServiceInstance,
        plan: &ServiceInstantiationDescription,
    ) -> Result<(), BoxError> {
        self.inner.pre_destroy(instance, plan).await
    }

    async fn dispose(
        &self,
        instance: ServiceInstance,
        plan: &ServiceInstantiationDescription,
    ) -> Result<(), BoxError> {
        teardown(format!("dispose:{}", self.name))?;
        self.inner.dispose(instance, plan).await
    }
}

#[tokio::test]
async fn test_shutdown_continues_after_failed_pre_destroy() {
    let container = DependencyInjection::new();
    let configuration = container.configuration();
    configuration.register(Tracked::wrap::<Source>("source")).unwrap();
    configuration.register(Tracked::wrap::<Faulty>("faulty")).unwrap();
    configuration.register(Tracked::wrap::<Sink>("sink")).unwrap();

    container.get::<Sink>().await.unwrap();

    let report = container.shutdown().await;
    assert!(!report.is_clean());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].service(), &ServiceDescription::of::<Faulty>());
    assert!(matches!(
        report.failures[0],
        DisposalError::PreDestroyFailed { .. }
    ));
    assert_eq!(
        report.disposed,
        vec![
            ServiceDescription::of::<Sink>(),
            ServiceDescription::of::<Faulty>(),
            ServiceDescription::of::<Source>(),
        ]
    );

    // 销毁前回调失败后仍然释放资源，其余服务照常关闭
    assert_eq!(
        *TEARDOWN.lock().unwrap(),
        vec![
            "pre_destroy:sink",
            "dispose:sink",
            "pre_destroy:faulty",
            "dispose:faulty",
            "pre_destroy:source",
            "dispose:source",
        ]
    );
}

// ---------------------------------------------------------------------------
// 依赖构造失败
// ---------------------------------------------------------------------------

static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

#[derive(Default, Injectable)]
#[injectable(default_lifecycle)]
struct Database {
    #[context("database.url")]
    url: String,
}

#[derive(Debug, Default, Injectable)]
struct Repository {
    #[reference]
    database: Reference<Database>,
}

#[async_trait]
impl ServiceLifecycle for Repository {
    async fn post_construct(&mut self) -> Result<(), BoxError> {
        CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_missing_context_value_aborts_dependents() {
    let container = DependencyInjection::new();
    let configuration = container.configuration();
    configuration.register_service::<Repository>().unwrap();
    configuration.register_service::<Database>().unwrap();

    let error = container.get::<Repository>().await.unwrap_err();
    match &error {
        DependencyError::ConstructionFailed {
            service, consumer, ..
        } => {
            assert_eq!(service, &ServiceDescription::of::<Database>());
            assert_eq!(consumer, &ServiceConsumer::of::<Repository>());
        }
        other => panic!("意外的错误: {}", other),
    }
    assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 0);

    let locator = container.locator();
    assert!(locator.state(&ServiceDescription::of::<Repository>()).is_none());
    assert!(locator.state(&ServiceDescription::of::<Database>()).is_none());

    // 补充配置后重试成功
    let dynamic: &dyn Configuration = configuration.as_ref();
    dynamic.register_context_value("database.url", "postgres://localhost/app");

    let repository = container.get::<Repository>().await.unwrap();
    assert_eq!(
        repository.database.require().unwrap().url,
        "postgres://localhost/app"
    );
    assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
}
