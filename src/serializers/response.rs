use crate::serializers::request::{
    collect_headers, lenient_string, lenient_string_map, serialize_request, HttpRequest,
    SerializedRequest,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 响应的只读视图
pub trait HttpResponse {
    fn status(&self) -> u16;

    /// 显式设置的状态说明，没有时使用标准短语
    fn status_message(&self) -> Option<String> {
        None
    }

    fn headers(&self) -> BTreeMap<String, String>;

    /// 产生该响应的请求
    fn request(&self) -> &dyn HttpRequest;

    /// 框架包装层暴露的底层响应；存在时序列化它而不是包装层本身
    fn raw(&self) -> Option<&dyn HttpResponse> {
        None
    }
}

/// 一次请求/响应交换，`http::Response` 本身不持有请求
pub struct Exchange<'a, Req, Res> {
    pub request: &'a http::Request<Req>,
    pub response: &'a http::Response<Res>,
}

impl<'a, Req, Res> Exchange<'a, Req, Res> {
    pub fn new(request: &'a http::Request<Req>, response: &'a http::Response<Res>) -> Self {
        Self { request, response }
    }
}

impl<Req, Res> HttpResponse for Exchange<'_, Req, Res> {
    fn status(&self) -> u16 {
        self.response.status().as_u16()
    }

    fn headers(&self) -> BTreeMap<String, String> {
        collect_headers(self.response.headers())
    }

    fn request(&self) -> &dyn HttpRequest {
        self.request
    }
}

/// 可移植的响应表示
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializedResponse {
    #[serde(deserialize_with = "lenient_status")]
    pub status: u16,
    #[serde(deserialize_with = "lenient_string")]
    pub status_message: String,
    #[serde(deserialize_with = "lenient_string_map")]
    pub headers: BTreeMap<String, String>,
    #[serde(deserialize_with = "lenient_request")]
    pub request: SerializedRequest,
}

impl SerializedResponse {
    /// 从记录中的字段值宽松解析，非对象返回 None
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }
}

/// 数字或数字字符串，其他值记为 0
fn lenient_status<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let status = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(status.unwrap_or(0))
}

fn lenient_request<'de, D>(deserializer: D) -> Result<SerializedRequest, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(SerializedRequest::from_value)
        .unwrap_or_default())
}

/// 状态码的标准短语，未知状态码为 `Unknown`
pub fn reason_phrase(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown")
}

/// 序列化响应，连同产生它的请求
pub fn serialize_response(res: &dyn HttpResponse) -> SerializedResponse {
    let res = res.raw().unwrap_or(res);
    let status = res.status();

    SerializedResponse {
        status,
        status_message: res
            .status_message()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| reason_phrase(status).to_string()),
        headers: res.headers(),
        request: serialize_request(res.request()),
    }
}
