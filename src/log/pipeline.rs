//! 管道驱动
//!
//! 逐行读取上游的 JSON 日志，解析为 [`LogRecord`] 后交给唯一的格式化器，
//! 结果写入输出目标。无法解析的行不经格式化原样转发，绝不丢弃。
//!
//! 行严格按到达顺序处理：每行写出后才读取下一行。

use crate::cfg::{ConfigFormat, TypeOptions};
use crate::log::appender::{
    create_appender_from_options, register_appenders, ConsoleAppender, ConsoleAppenderConfig,
    Destination, LogAppender,
};
use crate::log::formatter::{
    create_formatter_from_options, register_formatters, DefaultFormatter, DefaultFormatterConfig,
    JsonFormatter, JsonFormatterConfig, LogFormatter,
};
use crate::log::log_record::LogRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smart_default::SmartDefault;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// 管道配置
///
/// 格式化器的选择优先级：显式传入的实例 > `transport` > `json` > DefaultFormatter
#[derive(Debug, Clone, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// 使用 JsonFormatter
    pub json: bool,

    /// 通过注册表按名称创建的格式化器
    pub transport: Option<TypeOptions>,

    /// 输出目标，缺省为标准输出
    pub dest: Option<Destination>,

    /// DefaultFormatter 的配置
    pub formatter: DefaultFormatterConfig,
}

impl PipelineConfig {
    /// 从 JSON 字符串创建（支持 JSON5 格式）
    pub fn from_json(content: &str) -> Result<Self> {
        ConfigFormat::Json.parse(content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        ConfigFormat::Yaml.parse(content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        ConfigFormat::Toml.parse(content)
    }

    /// 按扩展名选择格式读取配置文件
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        format.parse(&content)
    }
}

/// 管道错误
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 写入输出目标失败，管道停止
    #[error("destination write failed: {0:#}")]
    Destination(anyhow::Error),

    /// 读取输入失败
    #[error("input read failed: {0}")]
    Input(#[from] io::Error),
}

/// 管道计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// 经过格式化器输出的行
    pub formatted: u64,
    /// 原样转发的行
    pub passthrough: u64,
    /// 缺少必填字段、使用占位值格式化的行（同时计入 formatted）
    pub degraded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    formatted: AtomicU64,
    passthrough: AtomicU64,
    degraded: AtomicU64,
}

/// 单行的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Formatted,
    Passthrough,
    /// 空行，不产生输出
    Skipped,
}

/// 管道驱动
pub struct Pipeline {
    formatter: Box<dyn LogFormatter>,
    appender: Box<dyn LogAppender>,
    counters: Counters,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// 使用预先构造好的格式化器，忽略配置中的 `transport` 和 `json`
    pub fn with_formatter(config: PipelineConfig, formatter: Box<dyn LogFormatter>) -> Result<Self> {
        Self::build(config, Some(formatter))
    }

    /// 替换输出目标
    pub fn with_appender(mut self, appender: Box<dyn LogAppender>) -> Self {
        self.appender = appender;
        self
    }

    fn build(config: PipelineConfig, formatter: Option<Box<dyn LogFormatter>>) -> Result<Self> {
        register_formatters()?;
        register_appenders()?;

        let formatter = match (formatter, &config.transport) {
            (Some(formatter), _) => formatter,
            (None, Some(transport)) => create_formatter_from_options(transport)
                .with_context(|| format!("failed to create formatter {}", transport.type_name))?,
            (None, None) if config.json => Box::new(JsonFormatter::new(JsonFormatterConfig {})),
            (None, None) => Box::new(DefaultFormatter::new(config.formatter.clone())),
        };

        let appender: Box<dyn LogAppender> = match &config.dest {
            Some(dest) => create_appender_from_options(&dest.type_options())
                .with_context(|| format!("failed to open destination {}", dest))?,
            None => Box::new(ConsoleAppender::new(ConsoleAppenderConfig::default())),
        };

        Ok(Self {
            formatter,
            appender,
            counters: Counters::default(),
        })
    }

    /// 当前计数，运行期间也可读取
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            formatted: self.counters.formatted.load(Ordering::Relaxed),
            passthrough: self.counters.passthrough.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
        }
    }

    /// 读取输入直到结束或输出目标关闭，返回最终计数
    pub async fn run<R>(&self, input: R) -> Result<PipelineStats, PipelineError>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(input);
        let mut line = Vec::with_capacity(1024);

        tracing::info!("pipeline started");
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }

            match self.process_line(&line).await {
                Ok(_) => {}
                Err(PipelineError::Destination(err)) if is_broken_pipe(&err) => {
                    tracing::info!(stats = ?self.stats(), "destination closed, pipeline stopped");
                    return Ok(self.stats());
                }
                Err(err) => {
                    tracing::error!(error = %err, "pipeline failed");
                    return Err(err);
                }
            }
        }

        match self.appender.flush().await {
            Err(err) if !is_broken_pipe(&err) => {
                tracing::error!(error = %err, "failed to flush destination");
                return Err(PipelineError::Destination(err));
            }
            _ => {}
        }

        tracing::info!(stats = ?self.stats(), "pipeline finished");
        Ok(self.stats())
    }

    /// 处理一行输入（行尾的换行符可有可无）
    ///
    /// 只去掉 `\n`，`\r` 对 JSON 解析是空白，转发时原样保留
    pub async fn process_line(&self, line: &[u8]) -> Result<LineOutcome, PipelineError> {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        if line.is_empty() {
            return Ok(LineOutcome::Skipped);
        }

        match serde_json::from_slice::<Value>(line) {
            Ok(Value::Object(object)) => self.format(Value::Object(object)).await,
            Ok(_) | Err(_) => self.passthrough(line).await,
        }
    }

    /// 处理已经结构化的输入；非对象按其 JSON 文本转发
    pub async fn process_value(&self, value: Value) -> Result<LineOutcome, PipelineError> {
        match value {
            Value::Object(_) => self.format(value).await,
            other => self.passthrough(other.to_string().as_bytes()).await,
        }
    }

    async fn format(&self, value: Value) -> Result<LineOutcome, PipelineError> {
        let Some(record) = LogRecord::from_value(value) else {
            return Ok(LineOutcome::Skipped);
        };

        if !record.defects().is_empty() {
            tracing::warn!(defects = ?record.defects(), "record formatted with placeholders");
            self.counters.degraded.fetch_add(1, Ordering::Relaxed);
        }

        let output = self.formatter.transform(&record);
        self.write(output.as_bytes()).await?;
        self.counters.formatted.fetch_add(1, Ordering::Relaxed);
        Ok(LineOutcome::Formatted)
    }

    async fn passthrough(&self, line: &[u8]) -> Result<LineOutcome, PipelineError> {
        tracing::debug!(len = line.len(), "passing through unparsable line");

        let mut output = Vec::with_capacity(line.len() + 1);
        output.extend_from_slice(line);
        output.push(b'\n');
        self.write(&output).await?;
        self.counters.passthrough.fetch_add(1, Ordering::Relaxed);
        Ok(LineOutcome::Passthrough)
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), PipelineError> {
        self.appender
            .append(bytes)
            .await
            .map_err(PipelineError::Destination)
    }
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
    })
}
