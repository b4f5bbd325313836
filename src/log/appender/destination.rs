use crate::cfg::TypeOptions;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// 输出目标：整数是文件描述符，字符串是文件路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Destination {
    Fd(i32),
    Path(String),
}

impl Destination {
    /// 解析命令行参数，纯数字视为文件描述符
    pub fn parse(arg: &str) -> Self {
        match arg.parse::<i32>() {
            Ok(fd) => Destination::Fd(fd),
            Err(_) => Destination::Path(arg.to_string()),
        }
    }

    /// 对应的 Appender 配置，交给注册表创建
    pub fn type_options(&self) -> TypeOptions {
        match self {
            Destination::Fd(1) => TypeOptions::of("ConsoleAppender"),
            Destination::Fd(2) => TypeOptions {
                type_name: "ConsoleAppender".to_string(),
                options: json!({ "target": "stderr" }),
            },
            Destination::Fd(fd) => TypeOptions {
                type_name: "FdAppender".to_string(),
                options: json!({ "fd": fd }),
            },
            Destination::Path(path) => TypeOptions {
                type_name: "FileAppender".to_string(),
                options: json!({ "file_path": path }),
            },
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Fd(fd) => write!(f, "fd {}", fd),
            Destination::Path(path) => f.write_str(path),
        }
    }
}
