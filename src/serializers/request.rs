use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 请求 ID，放在 `http::Request` 的 extensions 中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// 没有 [`RequestId`] 扩展时读取的请求头
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 请求的只读视图
pub trait HttpRequest {
    fn method(&self) -> String;
    fn url(&self) -> String;
    fn id(&self) -> Option<String> {
        None
    }
    fn headers(&self) -> BTreeMap<String, String>;
}

impl<B> HttpRequest for http::Request<B> {
    fn method(&self) -> String {
        http::Request::method(self).as_str().to_string()
    }

    fn url(&self) -> String {
        self.uri().to_string()
    }

    fn id(&self) -> Option<String> {
        self.extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .or_else(|| {
                http::Request::headers(self)
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            })
    }

    fn headers(&self) -> BTreeMap<String, String> {
        collect_headers(http::Request::headers(self))
    }
}

/// 同名多值请求头用 `, ` 连接，非 UTF-8 的值按有损方式转换
pub(crate) fn collect_headers(headers: &http::HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

/// 可移植的请求表示
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializedRequest {
    #[serde(deserialize_with = "lenient_string")]
    pub method: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_opt_string"
    )]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string_map")]
    pub headers: BTreeMap<String, String>,
}

impl SerializedRequest {
    /// 从记录中的字段值宽松解析，非对象返回 None
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }
}

/// 序列化请求，不修改输入
pub fn serialize_request(req: &dyn HttpRequest) -> SerializedRequest {
    SerializedRequest {
        method: req.method(),
        url: req.url(),
        id: req.id(),
        headers: req.headers(),
    }
}

/// 把任意 JSON 标量转成字符串
pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// null 记为空字符串，其他标量按 [`value_to_string`] 转换
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string).unwrap_or_default())
}

pub(crate) fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string))
}

pub(crate) fn lenient_string_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    // 不是对象的 headers 整体忽略
    let Some(Value::Object(map)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| {
            let v = match v {
                Value::Array(items) => items
                    .iter()
                    .filter_map(value_to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                other => value_to_string(&other)?,
            };
            Some((k, v))
        })
        .collect())
}
