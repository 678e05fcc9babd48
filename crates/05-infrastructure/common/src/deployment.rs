//! 部署描述清单
//!
//! 每个代码模块可以携带若干文本资源，按名称区分用途。
//! 清单格式：每行一个条目，`#` 之后为注释，空行忽略，首尾空白去除。

use crate::errors::DescriptorError;

/// 发现单元清单
pub const LOADERS_DESCRIPTOR: &str = "loaders";

/// 服务清单
pub const SERVICES_DESCRIPTOR: &str = "services";

/// 初始化组件清单
pub const INIT_DESCRIPTOR: &str = "init";

/// 模块属性资源（TOML）
pub const PROPERTIES_RESOURCE: &str = "properties";

/// 解析部署描述清单
///
/// 返回按首次出现顺序排列、去重后的条目。条目内部不允许出现空白。
///
/// ```rust
/// use infrastructure_common::read_deployment_descriptor;
///
/// let entries = read_deployment_descriptor(
///     "loaders",
///     "# 插件\nbootstrap\n\nremote # 远程模块\nbootstrap\n",
/// )
/// .unwrap();
/// assert_eq!(entries, vec!["bootstrap", "remote"]);
/// ```
pub fn read_deployment_descriptor(
    descriptor: &str,
    text: &str,
) -> Result<Vec<String>, DescriptorError> {
    let mut entries: Vec<String> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = match raw.find('#') {
            Some(position) => &raw[..position],
            None => raw,
        };
        let entry = line.trim();
        if entry.is_empty() {
            continue;
        }
        if entry.contains(char::is_whitespace) {
            return Err(DescriptorError::InvalidEntry {
                descriptor: descriptor.to_string(),
                line: index + 1,
                entry: entry.to_string(),
            });
        }
        if !entries.iter().any(|existing| existing == entry) {
            entries.push(entry.to_string());
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_and_blank_lines() {
        let text = "\n# header\n  alpha  \n\tbeta#trailing\n#gamma\n\n";
        let entries = read_deployment_descriptor(LOADERS_DESCRIPTOR, text).unwrap();
        assert_eq!(entries, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_duplicates_collapse_in_first_seen_order() {
        let text = "b\na\nb\nc\na";
        let entries = read_deployment_descriptor(SERVICES_DESCRIPTOR, text).unwrap();
        assert_eq!(entries, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_empty_descriptor() {
        assert!(read_deployment_descriptor(INIT_DESCRIPTOR, "").unwrap().is_empty());
        assert!(read_deployment_descriptor(INIT_DESCRIPTOR, "# only comments\n   \n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_entry_with_inner_whitespace_is_rejected() {
        let error = read_deployment_descriptor(LOADERS_DESCRIPTOR, "ok\nnot ok\n").unwrap_err();
        assert_eq!(
            error,
            DescriptorError::InvalidEntry {
                descriptor: "loaders".to_string(),
                line: 2,
                entry: "not ok".to_string(),
            }
        );
    }
}
