use crate::log::level::Severity;
use crate::log::timestamp::now_millis;
use crate::serializers::request::value_to_string;
use crate::serializers::{SerializedError, SerializedRequest, SerializedResponse};
use chrono::DateTime;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// 记录的固定字段，其余字段都进入 `fields`
pub const CORE_KEYS: [&str; 6] = ["time", "level", "name", "hostname", "pid", "msg"];

/// 错误字段，`err` 优先
pub const ERROR_KEYS: [&str; 2] = ["err", "error"];
/// 请求字段，`req` 优先
pub const REQUEST_KEYS: [&str; 2] = ["req", "request"];
/// 响应字段，`res` 优先
pub const RESPONSE_KEYS: [&str; 2] = ["res", "response"];
/// 显式的请求 ID
pub const REQUEST_ID_KEY: &str = "reqId";
/// 响应耗时（毫秒）
pub const RESPONSE_TIME_KEY: &str = "responseTime";

/// 解析时发现的必填字段问题，格式化时用占位值继续
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDefect {
    /// 缺少或无法识别 `time`，使用解析时刻
    MissingTime,
    /// 缺少 `hostname`，使用空字符串
    MissingHostname,
    /// 缺少 `level`
    MissingLevel,
    /// `level` 不在已知的 6 个级别中
    UnknownLevel(i64),
    /// 错误、请求或响应字段存在但无法识别，按普通字段输出
    MalformedField(&'static str),
}

/// 日志记录
///
/// 每一行输入解析出一条，格式化期间不可变
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// 时间戳（毫秒）
    pub time: i64,
    /// 整数级别，缺失时为 None
    pub level: Option<i64>,
    /// 来源名称
    pub name: Option<String>,
    pub hostname: String,
    pub pid: Option<i64>,
    /// 日志消息
    pub msg: Option<String>,
    /// 其余字段，保持输入中的顺序
    pub fields: Map<String, Value>,
    defects: Vec<RecordDefect>,
}

impl LogRecord {
    /// 创建新的日志记录（上游生产日志时使用）
    pub fn new(severity: Severity, msg: impl Into<String>) -> Self {
        Self {
            time: now_millis(),
            level: Some(severity.code() as i64),
            name: None,
            hostname: std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()),
            pid: Some(std::process::id() as i64),
            msg: Some(msg.into()),
            fields: Map::new(),
            defects: Vec::new(),
        }
    }

    pub fn with_time(mut self, millis: i64) -> Self {
        self.time = millis;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_pid(mut self, pid: i64) -> Self {
        self.pid = Some(pid);
        self
    }

    /// 添加字段；固定字段名会被忽略，序列化失败的值记为 null
    pub fn with_field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let key = key.into();
        if !CORE_KEYS.contains(&key.as_str()) {
            self.fields
                .insert(key, serde_json::to_value(value).unwrap_or(Value::Null));
        }
        self
    }

    /// 从一行 JSON 解析出的值构造记录，非对象返回 None
    ///
    /// 必填字段缺失时填入占位值并记录到 [`LogRecord::defects`]
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };
        let mut defects = Vec::new();

        let time = fields.shift_remove("time").as_ref().and_then(parse_time);
        let time = time.unwrap_or_else(|| {
            defects.push(RecordDefect::MissingTime);
            now_millis()
        });

        let level = fields.shift_remove("level").as_ref().and_then(parse_level);
        match level {
            None => defects.push(RecordDefect::MissingLevel),
            Some(code) if Severity::from_code(code).is_none() => {
                defects.push(RecordDefect::UnknownLevel(code))
            }
            Some(_) => {}
        }

        let hostname = fields.shift_remove("hostname").as_ref().and_then(value_to_string);
        let hostname = hostname.unwrap_or_else(|| {
            defects.push(RecordDefect::MissingHostname);
            String::new()
        });

        let mut record = Self {
            time,
            level,
            name: fields.shift_remove("name").as_ref().and_then(value_to_string),
            hostname,
            pid: fields.shift_remove("pid").and_then(|v| v.as_i64()),
            msg: fields.shift_remove("msg").as_ref().and_then(value_to_string),
            fields,
            defects,
        };

        if record.has_field(&ERROR_KEYS) && record.error().is_none() {
            record.defects.push(RecordDefect::MalformedField("err"));
        }
        if record.has_field(&REQUEST_KEYS) && record.request().is_none() {
            record.defects.push(RecordDefect::MalformedField("req"));
        }
        if record.has_field(&RESPONSE_KEYS) && record.response().is_none() {
            record.defects.push(RecordDefect::MalformedField("res"));
        }

        Some(record)
    }

    fn has_field(&self, keys: &[&str]) -> bool {
        self.first_field(keys).is_some()
    }

    /// 解析时发现的问题；通过构造器创建的记录总是为空
    pub fn defects(&self) -> &[RecordDefect] {
        &self.defects
    }

    pub fn severity(&self) -> Option<Severity> {
        self.level.and_then(Severity::from_code)
    }

    /// 记录来源名称，缺省为 `root`
    pub fn target(&self) -> &str {
        self.name.as_deref().unwrap_or("root")
    }

    fn first_field(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|key| self.fields.get(*key))
    }

    pub fn error(&self) -> Option<SerializedError> {
        self.first_field(&ERROR_KEYS)
            .and_then(SerializedError::from_value)
    }

    pub fn request(&self) -> Option<SerializedRequest> {
        self.first_field(&REQUEST_KEYS)
            .and_then(SerializedRequest::from_value)
    }

    pub fn response(&self) -> Option<SerializedResponse> {
        self.first_field(&RESPONSE_KEYS)
            .and_then(SerializedResponse::from_value)
    }

    pub fn request_id(&self) -> Option<String> {
        self.fields.get(REQUEST_ID_KEY).and_then(value_to_string)
    }

    pub fn response_time(&self) -> Option<f64> {
        self.fields.get(RESPONSE_TIME_KEY).and_then(Value::as_f64)
    }

    /// 序列化为一行 JSON（不含换行）
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn parse_time(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.timestamp_millis()),
        _ => None,
    }
}

fn parse_level(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| s.parse::<Severity>().ok().map(|sev| sev.code() as i64)),
        _ => None,
    }
}

impl Serialize for LogRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("time", &self.time)?;
        if let Some(level) = self.level {
            map.serialize_entry("level", &level)?;
        }
        if let Some(name) = &self.name {
            map.serialize_entry("name", name)?;
        }
        map.serialize_entry("hostname", &self.hostname)?;
        if let Some(pid) = self.pid {
            map.serialize_entry("pid", &pid)?;
        }
        if let Some(msg) = &self.msg {
            map.serialize_entry("msg", msg)?;
        }
        for (key, value) in &self.fields {
            if !CORE_KEYS.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}
