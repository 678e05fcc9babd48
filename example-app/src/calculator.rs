//! 计算器插件模块
//!
//! 根模块中的仓库发现单元"下载"本模块，模块自带引导和属性两个发现单元。

use async_trait::async_trait;
use di_abstractions::{CodeModule, Configuration, Reference, ServiceProviderLoader};
use di_impl::ClassServiceProvider;
use infrastructure_common::{
    BoxError, LoaderError, ServiceLifecycle, INIT_DESCRIPTOR, LOADERS_DESCRIPTOR,
    PROPERTIES_RESOURCE, SERVICES_DESCRIPTOR,
};
use infrastructure_composition::{
    init_component, BootstrapServiceProviderLoader, InitComponent, ModulePropertiesLoader,
};
use service_macros::Injectable;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::console::Console;

/// 二元运算
pub trait Operation: Send + Sync {
    /// 运算符号
    fn symbol(&self) -> &'static str;
    /// 执行运算
    fn apply(&self, left: f64, right: f64) -> f64;
}

#[derive(Default, Injectable)]
#[injectable(default_lifecycle)]
pub struct Adder;

impl Operation for Adder {
    fn symbol(&self) -> &'static str {
        "+"
    }

    fn apply(&self, left: f64, right: f64) -> f64 {
        left + right
    }
}

#[derive(Default, Injectable)]
#[injectable(default_lifecycle)]
pub struct Multiplier;

impl Operation for Multiplier {
    fn symbol(&self) -> &'static str {
        "*"
    }

    fn apply(&self, left: f64, right: f64) -> f64 {
        left * right
    }
}

fn as_operation<T: Operation + 'static>(value: Arc<T>) -> Arc<dyn Operation> {
    value
}

/// 启动时输出计算结果的初始化组件
#[derive(Default, Injectable)]
pub struct Report {
    #[reference(qualifier = "add")]
    add: Reference<dyn Operation>,
    #[reference(qualifier = "mul")]
    mul: Reference<dyn Operation>,
    #[reference]
    console: Reference<Console>,
    #[context("calculator.left")]
    left: f64,
    #[context("calculator.right")]
    right: f64,
    #[context("calculator.precision")]
    precision: usize,
}

#[async_trait]
impl ServiceLifecycle for Report {
    async fn post_construct(&mut self) -> Result<(), BoxError> {
        info!("计算器报告就绪, 精度: {}", self.precision);
        Ok(())
    }

    async fn pre_destroy(&self) -> Result<(), BoxError> {
        info!("计算器报告销毁");
        Ok(())
    }
}

#[async_trait]
impl InitComponent for Report {
    async fn init(&self) -> Result<(), BoxError> {
        let console = self.console.require()?;
        for operation in [self.add.require()?, self.mul.require()?] {
            let result = operation.apply(self.left, self.right);
            console.print(&format!(
                "{} {} {} = {:.*}",
                self.left,
                operation.symbol(),
                self.right,
                self.precision,
                result
            ));
        }
        Ok(())
    }
}

/// 计算器模块的属性资源
const CALCULATOR_PROPERTIES: &str = r#"
[calculator]
precision = 2
"#;

/// 构建计算器模块
pub fn calculator_module(parent: Arc<CodeModule>) -> Arc<CodeModule> {
    // 同一契约以不同限定名注册
    let adder = ClassServiceProvider::<Adder>::as_contract(as_operation::<Adder>).qualified("add");
    let multiplier =
        ClassServiceProvider::<Multiplier>::as_contract(as_operation::<Multiplier>).qualified("mul");

    CodeModule::builder("calculator")
        .with_parent(parent)
        .with_resource(LOADERS_DESCRIPTOR, "calculator-bootstrap\nproperties")
        .with_resource(SERVICES_DESCRIPTOR, "adder\nmultiplier")
        .with_resource(INIT_DESCRIPTOR, "report")
        .with_resource(PROPERTIES_RESOURCE, CALCULATOR_PROPERTIES)
        .with_loader(
            "calculator-bootstrap",
            Arc::new(BootstrapServiceProviderLoader::new()),
        )
        .with_loader("properties", Arc::new(ModulePropertiesLoader::new()))
        .with_service("adder", Arc::new(adder))
        .with_service("multiplier", Arc::new(multiplier))
        .with_service("report", init_component::<Report>("report"))
        .build()
}

/// 模拟从仓库下载计算器模块的发现单元
///
/// 只在第一次执行时返回模块。
#[derive(Default)]
pub struct RepositoryLoader {
    downloaded: AtomicBool,
}

#[async_trait]
impl ServiceProviderLoader for RepositoryLoader {
    async fn load(
        &self,
        _configuration: &dyn Configuration,
        module: &Arc<CodeModule>,
    ) -> Result<Vec<Arc<CodeModule>>, LoaderError> {
        if self.downloaded.swap(true, Ordering::SeqCst) {
            return Ok(Vec::new());
        }

        info!("从仓库下载计算器模块");
        Ok(vec![calculator_module(module.clone())])
    }
}
