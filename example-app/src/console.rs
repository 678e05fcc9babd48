//! 根模块中的控制台服务

use async_trait::async_trait;
use di_abstractions::Reference;
use infrastructure_common::{BoxError, ServiceLifecycle};
use infrastructure_composition::ServiceLogger;
use service_macros::Injectable;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 带前缀的标准输出
#[derive(Default, Injectable)]
pub struct Console {
    #[context("console.prefix")]
    prefix: String,
    #[reference]
    logger: Reference<ServiceLogger>,
    lines: AtomicUsize,
}

impl Console {
    /// 输出一行
    pub fn print(&self, line: &str) {
        self.lines.fetch_add(1, Ordering::Relaxed);
        println!("{}{}", self.prefix, line);
    }
}

#[async_trait]
impl ServiceLifecycle for Console {
    async fn pre_destroy(&self) -> Result<(), BoxError> {
        self.logger.require()?.info(&format!(
            "控制台关闭, 共输出 {} 行",
            self.lines.load(Ordering::Relaxed)
        ));
        Ok(())
    }
}
