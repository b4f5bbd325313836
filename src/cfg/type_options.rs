// TypeOptions 以及配置文本的多格式解析

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

/// 配置文本格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON（按 JSON5 解析，支持注释、尾随逗号、未引用的键）
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// 根据文件扩展名推断格式
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "json" | "json5" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            _ => Err(anyhow!(
                "unsupported config file extension: {}",
                path.display()
            )),
        }
    }

    /// 按当前格式反序列化
    pub fn parse<T: DeserializeOwned>(&self, content: &str) -> Result<T> {
        match self {
            ConfigFormat::Json => Ok(json5::from_str(content)?),
            ConfigFormat::Yaml => Ok(serde_yaml::from_str(content)?),
            ConfigFormat::Toml => Ok(toml::from_str(content)?),
        }
    }
}

/// 类型选项结构
///
/// 通过 `type` 选择注册表中的实现，`options` 是该实现的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeOptions {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "empty_options")]
    pub options: JsonValue,
}

fn empty_options() -> JsonValue {
    JsonValue::Object(Default::default())
}

impl TypeOptions {
    /// 只指定类型名，使用空配置
    pub fn of(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            options: empty_options(),
        }
    }

    /// 从 JSON 字符串创建 TypeOptions（支持 JSON5 格式）
    pub fn from_json(json_str: &str) -> Result<Self> {
        ConfigFormat::Json.parse(json_str)
    }

    /// 从 YAML 字符串创建 TypeOptions
    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        ConfigFormat::Yaml.parse(yaml_str)
    }

    /// 从 TOML 字符串创建 TypeOptions
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        ConfigFormat::Toml.parse(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json5_support() -> Result<()> {
        let opts = TypeOptions::from_json(
            r#"
            {
                // 注释
                type: "DefaultFormatter",
                options: {
                    target_padding: 12,
                },
            }
            "#,
        )?;

        assert_eq!(opts.type_name, "DefaultFormatter");
        assert_eq!(opts.options["target_padding"], 12);
        Ok(())
    }

    #[test]
    fn test_yaml_and_toml_agree() -> Result<()> {
        let yaml = TypeOptions::from_yaml(
            r#"
type: FileAppender
options:
  file_path: /tmp/app.log
"#,
        )?;
        let toml = TypeOptions::from_toml(
            r#"
type = "FileAppender"

[options]
file_path = "/tmp/app.log"
"#,
        )?;

        assert_eq!(yaml, toml);
        Ok(())
    }

    #[test]
    fn test_missing_options_defaults_to_empty_object() -> Result<()> {
        let opts = TypeOptions::from_json(r#"{ "type": "JsonFormatter" }"#)?;
        assert_eq!(opts, TypeOptions::of("JsonFormatter"));
        assert!(opts.options.is_object());
        Ok(())
    }

    #[test]
    fn test_invalid_json_error() {
        assert!(TypeOptions::from_json("{ type: ").is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("a/b.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("conf.JSON5")).unwrap(),
            ConfigFormat::Json
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("x.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert!(ConfigFormat::from_path(Path::new("x.ini")).is_err());
    }
}
