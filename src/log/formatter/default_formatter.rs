use crate::log::formatter::{LogFormatter, LINE_ENDING};
use crate::log::host::HostContext;
use crate::log::level::{LevelPalette, LEVEL_WIDTH};
use crate::log::log_record::{
    LogRecord, ERROR_KEYS, REQUEST_ID_KEY, REQUEST_KEYS, RESPONSE_KEYS, RESPONSE_TIME_KEY,
};
use crate::log::style::Painter;
use crate::log::timestamp::{TimestampConfig, TimestampRenderer};
use crate::serializers::{reason_phrase, SerializedError, SerializedRequest, SerializedResponse};
use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use smart_default::SmartDefault;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

const TARGET_COLOR: (u8, u8, u8) = (120, 231, 255);
const PID_COLOR: (u8, u8, u8) = (169, 147, 227);

/// DefaultFormatter 配置
#[derive(Debug, Clone, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct DefaultFormatterConfig {
    /// 来源名称列宽
    #[default = 30]
    #[serde(alias = "targetPadding")]
    pub target_padding: usize,

    /// 覆盖级别标签，如 `{ 30: "NOTE" }`
    pub levels: BTreeMap<u8, String>,

    /// 时间戳渲染
    pub timestamp: TimestampConfig,

    /// 是否着色，不设置时探测终端能力
    pub colored: Option<bool>,
}

/// 彩色文本格式化器
///
/// 输出形如：
/// ```text
/// [14 Nov 2023, 22:13:20 UTC] INFO  [svc          | alice@h1 (42)] user=bob started
/// ```
/// 带错误时在后面追加错误名、消息和调用栈，每帧一行
pub struct DefaultFormatter {
    config: DefaultFormatterConfig,
    host: Arc<HostContext>,
    painter: Painter,
    levels: LevelPalette,
    timestamp: TimestampRenderer,
}

impl DefaultFormatter {
    /// 使用进程共享的 HostContext；时间戳配置无效时退回默认渲染并记录警告
    pub fn new(config: DefaultFormatterConfig) -> Self {
        match Self::try_new(config.clone(), HostContext::shared()) {
            Ok(formatter) => formatter,
            Err(err) => {
                tracing::warn!(error = %err, "invalid timestamp config, using default");
                let config = DefaultFormatterConfig {
                    timestamp: TimestampConfig::default(),
                    ..config
                };
                Self::build(config, HostContext::shared(), TimestampRenderer::default())
            }
        }
    }

    pub fn try_new(config: DefaultFormatterConfig, host: Arc<HostContext>) -> Result<Self> {
        let timestamp = TimestampRenderer::new(config.timestamp.clone())?;
        Ok(Self::build(config, host, timestamp))
    }

    fn build(
        config: DefaultFormatterConfig,
        host: Arc<HostContext>,
        timestamp: TimestampRenderer,
    ) -> Self {
        let painter = Painter::new(config.colored.unwrap_or_else(|| host.color_supported()));
        let levels = LevelPalette::new(painter, &config.levels);

        Self {
            config,
            host,
            painter,
            levels,
            timestamp,
        }
    }

    pub fn config(&self) -> &DefaultFormatterConfig {
        &self.config
    }

    fn write_header(&self, buf: &mut String, record: &LogRecord) {
        let p = &self.painter;

        buf.push_str(&p.gray(&format!("[{}]", self.timestamp.render(record.time))));
        buf.push(' ');

        match record.level {
            Some(code) => buf.push_str(&self.levels.display(code)),
            None => {
                let _ = write!(buf, "{:<width$}", "?", width = LEVEL_WIDTH);
            }
        }
        buf.push(' ');

        let target = format!(
            "{:<width$}",
            record.target(),
            width = self.config.target_padding
        );
        let owner = format!("{}@{}", self.host.username(), record.hostname);

        buf.push_str(&p.gray("["));
        buf.push_str(&p.rgb(TARGET_COLOR, &target));
        buf.push(' ');
        buf.push_str(&p.gray("|"));
        buf.push(' ');
        buf.push_str(&p.magenta(&owner));
        if let Some(pid) = record.pid {
            buf.push(' ');
            buf.push_str(&p.gray("("));
            buf.push_str(&p.rgb(PID_COLOR, &pid.to_string()));
            buf.push_str(&p.gray(")"));
        }
        buf.push_str(&p.gray("]"));
    }

    fn request_line(&self, req: &SerializedRequest, explicit_id: Option<&str>) -> String {
        let mut line = format!("{} {}", req.method.to_uppercase(), req.url)
            .trim()
            .to_string();
        if let Some(id) = explicit_id.or(req.id.as_deref()) {
            let _ = write!(line, " [{}]", id);
        }
        line
    }

    fn write_error(&self, buf: &mut String, err: &SerializedError) {
        let p = &self.painter;

        buf.push_str(LINE_ENDING);
        buf.push_str(&p.bold(&p.red(&err.name)));
        buf.push_str(": ");
        buf.push_str(&err.message);
        buf.push_str(LINE_ENDING);

        let mut seen: HashSet<&str> = HashSet::new();
        for frame in err.stack.iter().flatten() {
            let location = format!("{}:{}:{}", frame.file, frame.line, frame.col);
            if seen.insert(frame.file.as_str()) {
                let basename = Path::new(&frame.file)
                    .file_name()
                    .map(|name| name.to_string_lossy())
                    .unwrap_or(Cow::Borrowed(frame.file.as_str()));
                buf.push_str("   • ");
                buf.push_str(&p.dim(&format!(
                    "in {}:{}:{}",
                    basename, frame.line, frame.col
                )));
                if frame.native {
                    buf.push_str(" (native method)");
                }
            } else {
                buf.push_str("       ");
                buf.push_str(&p.dim("~"));
                buf.push(' ');
                buf.push_str(&p.bold(&p.dim(&location)));
            }
            buf.push_str(LINE_ENDING);
        }
    }
}

/// 记录中可识别的错误、请求和响应
///
/// 只有识别成功的分组会消费对应字段，无法识别的值按普通字段输出
struct Groups {
    error: Option<SerializedError>,
    request: Option<SerializedRequest>,
    response: Option<SerializedResponse>,
}

impl Groups {
    fn of(record: &LogRecord) -> Self {
        Self {
            error: record.error(),
            request: record.request(),
            response: record.response(),
        }
    }

    fn is_consumed(&self, key: &str) -> bool {
        (self.error.is_some() && ERROR_KEYS.contains(&key))
            || (self.request.is_some() && REQUEST_KEYS.contains(&key))
            || (self.response.is_some() && RESPONSE_KEYS.contains(&key))
            || key == REQUEST_ID_KEY
            || key == RESPONSE_TIME_KEY
    }
}

fn render_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

impl LogFormatter for DefaultFormatter {
    fn transform(&self, record: &LogRecord) -> String {
        let p = &self.painter;
        let mut buf = String::with_capacity(160 + record.msg.as_ref().map_or(0, String::len));

        self.write_header(&mut buf, record);

        let groups = Groups::of(record);
        for (key, value) in record.fields.iter().filter(|(k, _)| !groups.is_consumed(k)) {
            buf.push(' ');
            buf.push_str(&p.gray(&format!("{}={}", key, render_value(value))));
        }

        if let Some(msg) = &record.msg {
            buf.push(' ');
            buf.push_str(msg);
        }

        let explicit_id = record.request_id();
        if let Some(res) = &groups.response {
            let message = if res.status_message.is_empty() {
                reason_phrase(res.status)
            } else {
                res.status_message.as_str()
            };
            let mut line = self.request_line(&res.request, explicit_id.as_deref());
            let _ = write!(line, " -> {} {}", res.status, message);
            if let Some(elapsed) = record.response_time() {
                let _ = write!(line, " {:.2}ms", (elapsed * 100.0).round() / 100.0);
            }
            buf.push(' ');
            buf.push_str(&p.gray(&line));
        } else if let Some(req) = &groups.request {
            buf.push(' ');
            buf.push_str(&p.gray(&self.request_line(req, explicit_id.as_deref())));
        }

        if let Some(err) = &groups.error {
            self.write_error(&mut buf, err);
        }

        let mut line = buf.trim_end().to_string();
        line.push_str(LINE_ENDING);
        line
    }
}

crate::impl_from!(DefaultFormatterConfig => DefaultFormatter);
crate::impl_box_from!(DefaultFormatter => dyn LogFormatter);
