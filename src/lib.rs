//! logline - 结构化日志格式化管道
//!
//! 读取上游日志库逐行输出的 JSON 记录，格式化后写到指定的输出目标。
//!
//! ## 模块
//!
//! - **cfg**: 配置解析、按名称注册和创建组件
//! - **log**: 记录模型、格式化器、输出目标和管道驱动
//! - **serializers**: 把错误、HTTP 请求和响应转换成可写入记录的纯数据

pub mod cfg;
pub mod log;
pub mod serializers;

pub use cfg::{create_trait_from_type_options, register_trait, TypeOptions};

pub use log::{
    DefaultFormatter, JsonFormatter, LogAppender, LogFormatter, LogRecord, Pipeline,
    PipelineConfig, PipelineError, PipelineStats, Severity,
};

pub use serializers::{
    ErrorSerializer, SerializedError, SerializedRequest, SerializedResponse, Serializers,
    StackFrame,
};
