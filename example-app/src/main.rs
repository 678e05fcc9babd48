//! # 计算器示例应用
//!
//! 根模块声明引导、上下文配置、日志和仓库四个发现单元。仓库发现单元"下载"
//! 计算器模块，计算器模块的初始化组件在启动时输出计算结果，
//! 退出时按构造顺序的逆序释放全部服务。

use anyhow::Context;
use clap::Parser;
use di_abstractions::{CodeModule, Configuration};
use di_impl::{ClassServiceProvider, ContainerExtension};
use infrastructure_common::{ServiceDescription, LOADERS_DESCRIPTOR, SERVICES_DESCRIPTOR};
use infrastructure_composition::{
    BootstrapServiceProviderLoader, ConfigFileContextLoader, ContainerSettings,
    InfrastructureBuilder, LoggerServiceProviderLoader, BOOTSTRAP_LOADER, LOGGER_LOADER,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

mod calculator;
mod console;

use calculator::RepositoryLoader;
use console::Console;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "calculator-demo")]
#[command(about = "模块发现与服务注入示例")]
struct Args {
    /// 容器设置文件路径
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// 上下文配置文件路径，指定后文件必须存在
    #[arg(long)]
    context_file: Option<PathBuf>,

    /// 日志级别，覆盖容器设置
    #[arg(long)]
    log_level: Option<String>,

    /// 左操作数
    #[arg(long, default_value_t = 6.0)]
    left: f64,

    /// 右操作数
    #[arg(long, default_value_t = 7.0)]
    right: f64,

    /// 输出前缀
    #[arg(long, default_value = "> ")]
    prefix: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings =
        ContainerSettings::load(args.settings.as_deref()).context("加载容器设置失败")?;
    if let Some(level) = &args.log_level {
        settings.logging.level = level.clone();
    }

    let context_loader = match &args.context_file {
        Some(path) => ConfigFileContextLoader::new(path).required(true),
        None => ConfigFileContextLoader::from_settings(&settings.context),
    };

    let registrations = Arc::new(RegistrationCounter::default());
    let infrastructure = InfrastructureBuilder::new()
        .with_settings(settings)
        .with_logging_from_settings()
        .with_extension(registrations.clone())
        .with_root_module(root_module(context_loader))
        .build()?;

    info!("启动计算器示例应用");

    // 命令行参数作为固定的上下文配置值
    let configuration: &dyn Configuration = infrastructure.container().configuration().as_ref();
    configuration.register_context_value("console.prefix", args.prefix.clone());
    configuration.register_context_value("calculator.left", args.left.to_string());
    configuration.register_context_value("calculator.right", args.right.to_string());

    let report = infrastructure.start().await?;
    info!(
        "发现 {} 个模块, {} 轮, 注册 {} 个服务, 耗时 {}ms",
        report.modules.len(),
        report.passes,
        registrations.count.load(Ordering::Relaxed),
        report.elapsed_ms()
    );

    let shutdown = infrastructure.stop().await?;
    info!(
        "已释放 {} 个服务, 失败 {} 个",
        shutdown.disposed.len(),
        shutdown.failures.len()
    );
    if !shutdown.is_clean() {
        anyhow::bail!("部分服务释放失败");
    }

    info!("应用已关闭");
    Ok(())
}

/// 统计服务注册次数的容器扩展
#[derive(Default)]
struct RegistrationCounter {
    count: AtomicUsize,
}

impl ContainerExtension for RegistrationCounter {
    fn on_register(&self, service: &ServiceDescription, implementation: &'static str) {
        self.count.fetch_add(1, Ordering::Relaxed);
        debug!("已注册: {} -> {}", service, implementation);
    }
}

/// 构建根模块
fn root_module(context_loader: ConfigFileContextLoader) -> Arc<CodeModule> {
    CodeModule::builder("app")
        .with_resource(
            LOADERS_DESCRIPTOR,
            format!(
                "{}\ncontext\n{}\nrepository",
                BOOTSTRAP_LOADER, LOGGER_LOADER
            ),
        )
        .with_resource(SERVICES_DESCRIPTOR, "console")
        .with_loader(BOOTSTRAP_LOADER, Arc::new(BootstrapServiceProviderLoader::new()))
        .with_loader("context", Arc::new(context_loader))
        .with_loader(LOGGER_LOADER, Arc::new(LoggerServiceProviderLoader::new()))
        .with_loader("repository", Arc::new(RepositoryLoader::default()))
        .with_service("console", Arc::new(ClassServiceProvider::<Console>::new()))
        .build()
}
