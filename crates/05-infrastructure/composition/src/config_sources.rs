//! 上下文配置来源
//!
//! 将配置文件展开为点分隔的键，并以上下文配置提供函数的形式注册到容器：
//!
//! - [`ConfigFileContextLoader`] - 从 TOML / JSON 文件注册固定值
//! - [`ModulePropertiesLoader`] - 从模块携带的属性资源注册与请求方模块相关的值

use crate::settings::ContextSettings;
use async_trait::async_trait;
use di_abstractions::{CodeModule, Configuration, ServiceProviderLoader};
use infrastructure_common::{
    ConfigError, ConfigResult, LoaderError, ModuleId, ServiceConsumer, PROPERTIES_RESOURCE,
};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 上下文配置文件路径的环境变量
pub const CONTEXT_FILE_ENV: &str = "SERVICE_INJECTION_CONTEXT_FILE";

/// 默认的上下文配置文件
pub const DEFAULT_CONTEXT_FILE: &str = "service-injection.toml";

/// 将 TOML 值转换为 JSON 值
fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Number(serde_json::Number::from(*i)),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Array(arr) => Value::Array(arr.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
    }
}

fn collect_keys(value: &Value, prefix: String, values: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let full_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                collect_keys(nested, full_key, values);
            }
        }
        Value::Null => {}
        Value::String(s) => {
            values.insert(prefix, s.clone());
        }
        other => {
            values.insert(prefix, other.to_string());
        }
    }
}

/// 将嵌套配置展开为点分隔键
///
/// 字符串原样保留，数字和布尔值转为文本，数组保留 JSON 文本形式，空值忽略。
pub fn flatten_value(value: &Value) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    collect_keys(value, String::new(), &mut values);
    values
}

/// 解析 TOML 文本并展开
pub fn parse_toml_properties(origin: &str, text: &str) -> ConfigResult<BTreeMap<String, String>> {
    let table: toml::Value = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: origin.to_string(),
        source: Box::new(e),
    })?;
    Ok(flatten_value(&toml_to_json(&table)))
}

/// 读取 TOML 或 JSON 配置文件并展开
pub async fn read_properties_file(path: &Path) -> ConfigResult<BTreeMap<String, String>> {
    let display = path.display().to_string();
    let content = tokio::fs::read_to_string(path).await?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => parse_toml_properties(&display, &content),
        Some("json") => {
            let value: Value =
                serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                    path: display.clone(),
                    source: Box::new(e),
                })?;
            Ok(flatten_value(&value))
        }
        _ => Err(ConfigError::UnsupportedFormat { path: display }),
    }
}

/// 配置文件上下文发现单元
///
/// 针对定义它的模块执行一次，把配置文件中的每个键注册为固定的上下文配置值。
/// 不返回新的模块。
#[derive(Debug, Clone)]
pub struct ConfigFileContextLoader {
    path: PathBuf,
    required: bool,
}

impl ConfigFileContextLoader {
    /// 使用指定文件
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: false,
        }
    }

    /// 从环境变量读取文件路径，未设置时使用默认文件
    pub fn from_env() -> Self {
        let path = std::env::var(CONTEXT_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONTEXT_FILE.to_string());
        Self::new(path)
    }

    /// 按容器设置创建，未配置文件时回退到环境变量和默认文件
    pub fn from_settings(settings: &ContextSettings) -> Self {
        let loader = match &settings.file {
            Some(file) => Self::new(file),
            None => Self::from_env(),
        };
        loader.required(settings.required)
    }

    /// 文件不存在时是否报错
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// 配置文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ServiceProviderLoader for ConfigFileContextLoader {
    async fn load(
        &self,
        configuration: &dyn Configuration,
        module: &Arc<CodeModule>,
    ) -> Result<Vec<Arc<CodeModule>>, LoaderError> {
        if !self.path.exists() {
            if self.required {
                return Err(ConfigError::FileNotFound {
                    path: self.path.display().to_string(),
                }
                .into());
            }
            warn!("上下文配置文件不存在, 跳过: {}", self.path.display());
            return Ok(Vec::new());
        }

        let values = read_properties_file(&self.path).await?;
        info!(
            "加载上下文配置文件: {} ({} 项), 模块: {}",
            self.path.display(),
            values.len(),
            module.id()
        );
        for (key, value) in values {
            configuration.register_context_value(&key, value);
        }
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct PropertyTable {
    values: HashMap<ModuleId, BTreeMap<String, String>>,
    parents: HashMap<ModuleId, Option<ModuleId>>,
}

impl PropertyTable {
    fn lookup(&self, module: &ModuleId, key: &str) -> Option<String> {
        let mut current = Some(module.clone());
        while let Some(id) = current {
            if let Some(value) = self.values.get(&id).and_then(|values| values.get(key)) {
                return Some(value.clone());
            }
            current = self.parents.get(&id).cloned().flatten();
        }
        None
    }
}

/// 模块属性发现单元
///
/// 读取模块的 `properties` 资源（TOML）。请求方所在模块定义了该键时使用其值，
/// 否则沿祖先链取最近的定义。请求方没有模块时视为不存在。
/// 类服务构造时的请求方是发起解析的一方，而不是被构造的服务。
/// 同一实例可以被多个模块定义，共享同一张属性表。
#[derive(Clone, Default)]
pub struct ModulePropertiesLoader {
    table: Arc<RwLock<PropertyTable>>,
}

impl ModulePropertiesLoader {
    /// 创建发现单元
    pub fn new() -> Self {
        Self::default()
    }

    /// 查询指定模块可见的属性值
    pub fn lookup(&self, module: &ModuleId, key: &str) -> Option<String> {
        self.table.read().lookup(module, key)
    }
}

#[async_trait]
impl ServiceProviderLoader for ModulePropertiesLoader {
    async fn load(
        &self,
        configuration: &dyn Configuration,
        module: &Arc<CodeModule>,
    ) -> Result<Vec<Arc<CodeModule>>, LoaderError> {
        let values = match module.resource(PROPERTIES_RESOURCE) {
            Some(text) => {
                let origin = format!("{}:{}", module.id(), PROPERTIES_RESOURCE);
                parse_toml_properties(&origin, text)?
            }
            None => BTreeMap::new(),
        };
        let keys: Vec<String> = values.keys().cloned().collect();

        {
            let mut table = self.table.write();
            for ancestor in module.lineage() {
                table.parents.insert(
                    ancestor.id().clone(),
                    ancestor.parent().map(|parent| parent.id().clone()),
                );
            }
            table.values.insert(module.id().clone(), values);
        }

        debug!("模块 {} 的属性: {:?}", module.id(), keys);
        for key in keys {
            let table = self.table.clone();
            let lookup_key = key.clone();
            configuration.register_context_fn(&key, move |consumer: &ServiceConsumer| {
                consumer
                    .module()
                    .and_then(|module| table.read().lookup(module, &lookup_key))
            });
        }
        Ok(Vec::new())
    }
}
