//! 日志格式化
//!
//! 把上游日志库输出的逐行 JSON 记录转换成人类可读的彩色文本或规范化的 JSON。
//!
//! # 特性
//!
//! - 可扩展的格式化器：DefaultFormatter、JsonFormatter
//! - 多种输出目标：ConsoleAppender、FileAppender、FdAppender
//! - 基于配置的动态创建
//! - 无法解析的行原样转发
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use logline::log::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::from_json(r#"
//!         {
//!             formatter: {
//!                 targetPadding: 20,
//!                 timestamp: { timezone: "utc" },
//!             },
//!         }
//!     "#)?;
//!
//!     let pipeline = Pipeline::new(config)?;
//!     let stats = pipeline.run(tokio::io::stdin()).await?;
//!     eprintln!("{:?}", stats);
//!
//!     Ok(())
//! }
//! ```

pub mod appender;
pub mod formatter;
pub mod host;
pub mod level;
pub mod log_record;
pub mod pipeline;
pub mod style;
pub mod timestamp;

pub use appender::{
    register_appenders, ConsoleAppender, ConsoleAppenderConfig, Destination, FileAppender,
    FileAppenderConfig, LogAppender, Target,
};
#[cfg(unix)]
pub use appender::{FdAppender, FdAppenderConfig};
pub use formatter::{
    register_formatters, DefaultFormatter, DefaultFormatterConfig, JsonFormatter,
    JsonFormatterConfig, LogFormatter, LINE_ENDING,
};
pub use host::HostContext;
pub use level::{LevelPalette, Severity};
pub use log_record::{LogRecord, RecordDefect};
pub use pipeline::{LineOutcome, Pipeline, PipelineConfig, PipelineError, PipelineStats};
pub use timestamp::{TimestampConfig, TimestampRenderer};
