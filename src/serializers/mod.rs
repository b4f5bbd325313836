//! 序列化器
//!
//! 把运行时的错误、请求、响应转换成可以写进日志记录的纯数据。
//! [`Serializers`] 按配置组合它们，并给出它们在记录中使用的字段名。

pub mod error;
pub mod request;
pub mod response;
pub mod stack;

pub use error::{ErrorId, ErrorSerializer, ErrorSerializerConfig, OriginalError, SerializedError};
pub use request::{serialize_request, HttpRequest, RequestId, SerializedRequest, REQUEST_ID_HEADER};
pub use response::{reason_phrase, serialize_response, Exchange, HttpResponse, SerializedResponse};
pub use stack::{BacktraceCallStack, CallStack, RawFrame, StackFrame};

use serde::Deserialize;
use smart_default::SmartDefault;
use std::error::Error;

/// 允许使用短字段名 `req` / `res` / `err`
#[derive(Debug, Clone, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct AllowAliases {
    #[default = true]
    pub req: bool,
    #[default = true]
    pub res: bool,
    #[default = true]
    pub err: bool,
}

/// 序列化器组合配置
#[derive(Debug, Clone, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct SerializersConfig {
    #[default = true]
    pub request: bool,

    #[default = true]
    pub response: bool,

    pub error: ErrorSerializerConfig,

    pub allow: AllowAliases,
}

/// 按配置启用的序列化器集合
pub struct Serializers {
    config: SerializersConfig,
    error: ErrorSerializer,
}

impl Serializers {
    pub fn new(config: SerializersConfig) -> Self {
        Self {
            error: ErrorSerializer::new(config.error.clone()),
            config,
        }
    }

    /// 访问内部的错误序列化器，例如取回原始错误
    pub fn error_serializer(&self) -> &ErrorSerializer {
        &self.error
    }

    /// 序列化错误，未启用时返回 None
    pub fn error<E>(&self, err: E) -> Option<SerializedError>
    where
        E: Error + Send + Sync + 'static,
    {
        self.config.error.enabled.then(|| self.error.serialize(err))
    }

    /// 序列化请求，未启用时返回 None
    pub fn request(&self, req: &dyn HttpRequest) -> Option<SerializedRequest> {
        self.config.request.then(|| serialize_request(req))
    }

    /// 序列化响应，未启用时返回 None
    pub fn response(&self, res: &dyn HttpResponse) -> Option<SerializedResponse> {
        self.config.response.then(|| serialize_response(res))
    }

    /// 写入记录时首选的错误字段名
    pub fn error_key(&self) -> &'static str {
        if self.config.allow.err {
            "err"
        } else {
            "error"
        }
    }

    pub fn request_key(&self) -> &'static str {
        if self.config.allow.req {
            "req"
        } else {
            "request"
        }
    }

    pub fn response_key(&self) -> &'static str {
        if self.config.allow.res {
            "res"
        } else {
            "response"
        }
    }

    /// 各个启用的序列化器负责的记录字段
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.config.request {
            keys.push("request");
            if self.config.allow.req {
                keys.push("req");
            }
        }
        if self.config.response {
            keys.push("response");
            if self.config.allow.res {
                keys.push("res");
            }
        }
        if self.config.error.enabled {
            keys.push("error");
            if self.config.allow.err {
                keys.push("err");
            }
        }
        keys
    }
}

impl Default for Serializers {
    fn default() -> Self {
        Self::new(SerializersConfig::default())
    }
}

crate::impl_from!(SerializersConfig => Serializers);
