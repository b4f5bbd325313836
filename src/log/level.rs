use crate::log::style::Painter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::str::FromStr;

/// 日志级别宽度，标签左对齐补齐到这个宽度
pub const LEVEL_WIDTH: usize = 5;

/// 日志级别（数值与上游记录中的 `level` 字段一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Severity {
    /// 最详细的日志
    Trace = 10,
    /// 调试信息
    Debug = 20,
    /// 一般信息
    Info = 30,
    /// 警告信息
    Warn = 40,
    /// 错误信息
    Error = 50,
    /// 致命错误
    Fatal = 60,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Fatal,
    ];

    /// 从记录中的整数级别解析，未知数值返回 None
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            10 => Some(Severity::Trace),
            20 => Some(Severity::Debug),
            30 => Some(Severity::Info),
            40 => Some(Severity::Warn),
            50 => Some(Severity::Error),
            60 => Some(Severity::Fatal),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// 小写标签，JSON 输出中的 `log.level`
    pub fn label(self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }

    fn color(self) -> (u8, u8, u8) {
        match self {
            Severity::Trace | Severity::Debug => (163, 182, 138),
            Severity::Info => (178, 157, 243),
            Severity::Warn => (234, 234, 208),
            Severity::Error => (153, 75, 104),
            Severity::Fatal => (166, 76, 76),
        }
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.code()
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, String> {
        Severity::from_code(code as i64).ok_or_else(|| format!("invalid log level: {}", code))
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            _ => Err(format!("invalid log level: {}", s)),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label().to_uppercase())
    }
}

/// 级别到展示字符串的映射（6 项），构造后不可变
///
/// 每一项都已补齐宽度并按需着色
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelPalette {
    entries: BTreeMap<u8, String>,
}

impl LevelPalette {
    /// `labels` 可覆盖默认标签（大写级别名），未覆盖的级别保持默认
    pub fn new(painter: Painter, labels: &BTreeMap<u8, String>) -> Self {
        let entries = Severity::ALL
            .iter()
            .map(|severity| {
                let label = labels
                    .get(&severity.code())
                    .cloned()
                    .unwrap_or_else(|| severity.to_string());
                let padded = format!("{:<width$}", label, width = LEVEL_WIDTH);
                let display = painter.rgb(severity.color(), &padded).into_owned();
                (severity.code(), display)
            })
            .collect();

        Self { entries }
    }

    /// 未知级别退化为不带颜色的数字
    pub fn display(&self, level: i64) -> Cow<'_, str> {
        Severity::from_code(level)
            .and_then(|severity| self.entries.get(&severity.code()))
            .map(|display| Cow::Borrowed(display.as_str()))
            .unwrap_or_else(|| Cow::Owned(format!("{:<width$}", level, width = LEVEL_WIDTH)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_code() {
        assert_eq!(Severity::from_code(10), Some(Severity::Trace));
        assert_eq!(Severity::from_code(30), Some(Severity::Info));
        assert_eq!(Severity::from_code(60), Some(Severity::Fatal));
        assert_eq!(Severity::from_code(35), None);
        assert_eq!(Severity::from_code(-1), None);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!(Severity::from_str("trace").unwrap(), Severity::Trace);
        assert_eq!(Severity::from_str("WARN").unwrap(), Severity::Warn);
        assert_eq!(Severity::from_str("Fatal").unwrap(), Severity::Fatal);
        assert!(Severity::from_str("invalid").is_err());
    }

    #[test]
    fn test_severity_display_and_label() {
        assert_eq!(Severity::Info.to_string(), "INFO");
        assert_eq!(Severity::Info.label(), "info");
        assert_eq!(Severity::Error.code(), 50);
    }

    #[test]
    fn test_severity_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Severity::Warn).unwrap(), "40");
        let parsed: Severity = serde_json::from_str("20").unwrap();
        assert_eq!(parsed, Severity::Debug);
        assert!(serde_json::from_str::<Severity>("25").is_err());
    }

    #[test]
    fn test_severity_try_from_u8() {
        assert_eq!(Severity::try_from(30u8), Ok(Severity::Info));
        assert_eq!(Severity::try_from(50u8), Ok(Severity::Error));
        assert_eq!(
            Severity::try_from(35u8),
            Err("invalid log level: 35".to_string())
        );
    }

    #[test]
    fn test_palette_plain() {
        let palette = LevelPalette::new(Painter::new(false), &BTreeMap::new());
        assert_eq!(palette.display(30), "INFO ");
        assert_eq!(palette.display(60), "FATAL");
    }

    #[test]
    fn test_palette_colored() {
        let palette = LevelPalette::new(Painter::new(true), &BTreeMap::new());
        assert_eq!(palette.display(40), "\x1b[38;2;234;234;208mWARN \x1b[0m");
    }

    #[test]
    fn test_palette_unknown_level_is_undecorated() {
        let palette = LevelPalette::new(Painter::new(true), &BTreeMap::new());
        assert_eq!(palette.display(35), "35   ");
    }

    #[test]
    fn test_palette_label_override() {
        let labels = BTreeMap::from([(30u8, "NOTE".to_string())]);
        let palette = LevelPalette::new(Painter::new(false), &labels);
        assert_eq!(palette.display(30), "NOTE ");
        assert_eq!(palette.display(20), "DEBUG");
    }
}
