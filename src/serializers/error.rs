use crate::cfg::short_type_name;
use crate::serializers::request::lenient_string;
use crate::serializers::stack::{capture_frames, BacktraceCallStack, CallStack, StackFrame};
use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use smart_default::SmartDefault;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 原始错误对象
pub type OriginalError = Arc<dyn Error + Send + Sync + 'static>;

/// SerializedError 到原始错误的关联键，不参与序列化和比较
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorId(u64);

static NEXT_ERROR_ID: AtomicU64 = AtomicU64::new(1);

impl ErrorId {
    fn next() -> Self {
        ErrorId(NEXT_ERROR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// 可移植的错误表示
///
/// `stack` 为 None 表示没有请求捕获调用栈，空数组表示请求了但没有拿到
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializedError {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_stack"
    )]
    pub stack: Option<Vec<StackFrame>>,
    #[serde(skip)]
    origin: Option<ErrorId>,
}

impl SerializedError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
            origin: None,
        }
    }

    pub fn with_stack(mut self, stack: Vec<StackFrame>) -> Self {
        self.stack = Some(stack);
        self
    }

    /// 与原始错误的关联键
    pub fn origin(&self) -> Option<ErrorId> {
        self.origin
    }

    /// 从记录中的字段值宽松解析
    ///
    /// 对象按字段读取，缺少 name 时记为 `Error`；纯字符串视为只有 message 的 `Error`
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(_) => {
                let mut err: Self = serde_json::from_value(value.clone()).ok()?;
                if err.name.is_empty() {
                    err.name = "Error".to_string();
                }
                Some(err)
            }
            Value::String(message) => Some(Self::new("Error", message.as_str())),
            _ => None,
        }
    }
}

/// 只接受帧数组，逐帧解析并跳过无法识别的帧；文本形式的调用栈等其他值视为没有调用栈
fn lenient_stack<'de, D>(deserializer: D) -> Result<Option<Vec<StackFrame>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::Array(frames)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        frames
            .into_iter()
            .filter_map(|frame| serde_json::from_value(frame).ok())
            .collect(),
    ))
}

impl PartialEq for SerializedError {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.message == other.message && self.stack == other.stack
    }
}

impl fmt::Debug for SerializedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializedError")
            .field("name", &self.name)
            .field("message", &self.message)
            .field("stack", &self.stack)
            .finish()
    }
}

/// ErrorSerializer 配置
#[derive(Debug, Clone, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct ErrorSerializerConfig {
    /// 是否启用错误序列化
    #[default = true]
    pub enabled: bool,

    /// 是否捕获调用栈
    #[default = false]
    pub callsites: bool,

    /// 是否保留原始错误以便 [`ErrorSerializer::original`] 取回
    ///
    /// 保留的错误在 [`ErrorSerializer::release`] 之前一直占用内存
    #[default = false]
    pub retain_originals: bool,

    /// 最多保留的原始错误数量，超出时淘汰最早的
    #[default = 1024]
    pub max_retained: usize,
}

/// 错误序列化器
pub struct ErrorSerializer {
    capture_stack: bool,
    retain_originals: bool,
    max_retained: usize,
    call_stack: Arc<dyn CallStack>,
    originals: DashMap<ErrorId, OriginalError>,
}

impl ErrorSerializer {
    pub fn new(config: ErrorSerializerConfig) -> Self {
        Self {
            capture_stack: config.callsites,
            retain_originals: config.retain_originals && config.max_retained > 0,
            max_retained: config.max_retained,
            call_stack: Arc::new(BacktraceCallStack),
            originals: DashMap::new(),
        }
    }

    /// 替换调用栈捕获实现
    pub fn with_call_stack(mut self, call_stack: Arc<dyn CallStack>) -> Self {
        self.call_stack = call_stack;
        self
    }

    pub fn captures_stack(&self) -> bool {
        self.capture_stack
    }

    /// 序列化错误，`name` 取错误类型的短名称
    pub fn serialize<E>(&self, err: E) -> SerializedError
    where
        E: Error + Send + Sync + 'static,
    {
        let name = short_type_name::<E>();
        self.serialize_named(name, Arc::new(err))
    }

    /// 以指定名称序列化已经共享的错误
    pub fn serialize_named(&self, name: impl Into<String>, err: OriginalError) -> SerializedError {
        let mut serialized = SerializedError::new(name, err.to_string());

        if self.capture_stack {
            serialized.stack = Some(capture_frames(self.call_stack.as_ref()));
        }

        if self.retain_originals {
            while self.originals.len() >= self.max_retained {
                let Some(oldest) = self.originals.iter().map(|entry| *entry.key()).min() else {
                    break;
                };
                self.originals.remove(&oldest);
            }
            let id = ErrorId::next();
            self.originals.insert(id, err);
            serialized.origin = Some(id);
        }

        serialized
    }

    /// 取回原始错误
    pub fn original(&self, serialized: &SerializedError) -> Option<OriginalError> {
        let id = serialized.origin?;
        self.originals.get(&id).map(|entry| entry.value().clone())
    }

    /// 释放原始错误，返回被释放的对象
    pub fn release(&self, serialized: &SerializedError) -> Option<OriginalError> {
        let id = serialized.origin?;
        self.originals.remove(&id).map(|(_, err)| err)
    }

    /// 当前保留的原始错误数量
    pub fn retained(&self) -> usize {
        self.originals.len()
    }
}

impl Default for ErrorSerializer {
    fn default() -> Self {
        Self::new(ErrorSerializerConfig::default())
    }
}

crate::impl_from!(ErrorSerializerConfig => ErrorSerializer);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializers::stack::RawFrame;

    #[derive(Debug)]
    struct ConnectionRefused {
        port: u16,
    }

    impl fmt::Display for ConnectionRefused {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "connection refused on port {}", self.port)
        }
    }

    impl Error for ConnectionRefused {}

    struct FixedCallStack;

    impl CallStack for FixedCallStack {
        fn capture(&self) -> Option<Vec<RawFrame>> {
            Some(vec![RawFrame {
                symbol: Some("app::db::connect".to_string()),
                file: Some("/app/src/db.rs".to_string()),
                line: Some(7),
                col: Some(9),
            }])
        }
    }

    fn serializer(callsites: bool) -> ErrorSerializer {
        ErrorSerializer::new(ErrorSerializerConfig {
            callsites,
            retain_originals: true,
            ..Default::default()
        })
        .with_call_stack(Arc::new(FixedCallStack))
    }

    #[test]
    fn test_serialize_without_stack_omits_key() {
        let err = serializer(false).serialize(ConnectionRefused { port: 5432 });

        assert_eq!(err.name, "ConnectionRefused");
        assert_eq!(err.message, "connection refused on port 5432");
        assert!(err.stack.is_none());

        let value = serde_json::to_value(&err).unwrap();
        assert!(value.get("stack").is_none());
        assert_eq!(value.as_object().map(|o| o.len()), Some(2));
    }

    #[test]
    fn test_serialize_with_stack_includes_key() {
        let err = serializer(true).serialize(ConnectionRefused { port: 1 });
        let stack = err.stack.as_ref().unwrap();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack[0].file, "/app/src/db.rs");
        assert!(stack[0].toplevel);

        let value = serde_json::to_value(&err).unwrap();
        assert!(value["stack"].is_array());
    }

    #[test]
    fn test_serialize_with_failed_capture_is_empty_stack() {
        struct Nothing;
        impl CallStack for Nothing {
            fn capture(&self) -> Option<Vec<RawFrame>> {
                None
            }
        }

        let err = serializer(true)
            .with_call_stack(Arc::new(Nothing))
            .serialize(ConnectionRefused { port: 1 });
        assert_eq!(err.stack, Some(Vec::new()));
        assert_eq!(serde_json::to_value(&err).unwrap()["stack"], serde_json::json!([]));
    }

    #[test]
    fn test_serialize_is_repeatable() {
        let s = serializer(true);
        let a = s.serialize(ConnectionRefused { port: 80 });
        let b = s.serialize(ConnectionRefused { port: 80 });
        assert_eq!(a, b);
        assert_ne!(a.origin(), b.origin());
    }

    #[test]
    fn test_original_side_channel() {
        let s = serializer(false);
        let err = s.serialize(ConnectionRefused { port: 8080 });

        let original = s.original(&err).unwrap();
        assert_eq!(original.to_string(), "connection refused on port 8080");
        assert!(original.downcast_ref::<ConnectionRefused>().is_some());

        assert_eq!(s.retained(), 1);
        assert!(s.release(&err).is_some());
        assert!(s.original(&err).is_none());
        assert_eq!(s.retained(), 0);
    }

    #[test]
    fn test_originals_not_retained_by_default() {
        let s = ErrorSerializer::default();
        for port in 0..10_000 {
            let err = s.serialize(ConnectionRefused { port });
            assert!(err.origin().is_none());
            assert!(s.original(&err).is_none());
        }
        assert_eq!(s.retained(), 0);
    }

    #[test]
    fn test_retained_originals_are_bounded() {
        let s = ErrorSerializer::new(ErrorSerializerConfig {
            retain_originals: true,
            max_retained: 16,
            ..Default::default()
        });
        let first = s.serialize(ConnectionRefused { port: 0 });
        let last = (1..1_000)
            .map(|port| {
                let err = s.serialize(ConnectionRefused { port });
                assert!(s.retained() <= 16);
                err
            })
            .last()
            .unwrap();

        assert_eq!(s.retained(), 16);
        assert!(s.original(&first).is_none());
        let original = s.original(&last).map(|e| e.to_string());
        assert_eq!(original.as_deref(), Some("connection refused on port 999"));
    }

    #[test]
    fn test_io_error_name() {
        let err = ErrorSerializer::default()
            .serialize(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(err.name, "Error");
        assert_eq!(err.message, "disk full");
    }

    #[test]
    fn test_from_value() {
        let err = SerializedError::from_value(&serde_json::json!({
            "name": "TypeError",
            "message": "boom"
        }))
        .unwrap();
        assert_eq!(err, SerializedError::new("TypeError", "boom"));
        assert!(err.stack.is_none());

        let err = SerializedError::from_value(&serde_json::json!("plain")).unwrap();
        assert_eq!(err, SerializedError::new("Error", "plain"));

        assert!(SerializedError::from_value(&serde_json::json!(42)).is_none());
    }

    #[test]
    fn test_from_value_tolerates_odd_shapes() {
        let err = SerializedError::from_value(&serde_json::json!({
            "name": "TypeError",
            "message": "boom",
            "stack": "TypeError: boom\n    at handler (/app/index.js:3:9)"
        }))
        .unwrap();
        assert_eq!(err, SerializedError::new("TypeError", "boom"));

        let err = SerializedError::from_value(&serde_json::json!({
            "name": "RangeError",
            "message": null
        }))
        .unwrap();
        assert_eq!(err, SerializedError::new("RangeError", ""));

        let err = SerializedError::from_value(&serde_json::json!({
            "message": 42,
            "stack": [{ "file": "/app/a.js", "line": 1 }, "garbage"]
        }))
        .unwrap();
        assert_eq!(err.name, "Error");
        assert_eq!(err.message, "42");
        assert_eq!(err.stack.as_ref().map(Vec::len), Some(1));
    }
}
