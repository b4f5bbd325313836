use crate::log::formatter::{LogFormatter, LINE_ENDING};
use crate::log::host::HostContext;
use crate::log::log_record::LogRecord;
use crate::log::timestamp::iso8601;
use serde::Deserialize;
use serde_json::{Map, Value};
use smart_default::SmartDefault;
use std::sync::Arc;

/// 固定输出的键，记录中同名字段不会覆盖它们
pub const FIXED_KEYS: [&str; 5] = ["@timestamp", "log.level", "log.name", "hostname", "message"];

/// JsonFormatter 配置（保留扩展性）
#[derive(Debug, Clone, Deserialize, PartialEq, SmartDefault)]
#[serde(default)]
pub struct JsonFormatterConfig {}

/// JSON 格式化器
///
/// 每条记录输出一个 JSON 对象，固定键在前，其余字段按输入顺序追加。
/// 错误的调用栈作为嵌套数据原样输出
pub struct JsonFormatter {
    host: Arc<HostContext>,
}

impl JsonFormatter {
    pub fn new(_: JsonFormatterConfig) -> Self {
        Self::with_host(HostContext::shared())
    }

    pub fn with_host(host: Arc<HostContext>) -> Self {
        Self { host }
    }

    fn to_object(&self, record: &LogRecord) -> Map<String, Value> {
        let mut object = Map::with_capacity(FIXED_KEYS.len() + 1 + record.fields.len());

        object.insert("@timestamp".to_string(), Value::String(iso8601(record.time)));
        object.insert(
            "log.level".to_string(),
            record
                .severity()
                .map_or(Value::Null, |s| Value::String(s.label().to_string())),
        );
        object.insert(
            "log.name".to_string(),
            Value::String(record.target().to_string()),
        );
        object.insert(
            "hostname".to_string(),
            Value::String(format!("{}@{}", self.host.username(), record.hostname)),
        );
        object.insert(
            "message".to_string(),
            record.msg.clone().map_or(Value::Null, Value::String),
        );

        if let Some(pid) = record.pid {
            object.insert("pid".to_string(), Value::from(pid));
        }
        for (key, value) in &record.fields {
            if !object.contains_key(key) {
                object.insert(key.clone(), value.clone());
            }
        }

        object
    }
}

impl LogFormatter for JsonFormatter {
    fn transform(&self, record: &LogRecord) -> String {
        // Map<String, Value> 的序列化不会失败
        let mut line = Value::Object(self.to_object(record)).to_string();
        line.push_str(LINE_ENDING);
        line
    }
}

crate::impl_from!(JsonFormatterConfig => JsonFormatter);
crate::impl_box_from!(JsonFormatter => dyn LogFormatter);
