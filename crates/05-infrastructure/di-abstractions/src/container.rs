//! 容器配置

use serde::{Deserialize, Serialize};

/// 容器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 最大解析深度
    pub max_resolution_depth: usize,
}

impl ContainerConfig {
    /// 设置最大解析深度
    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: 100,
        }
    }
}
