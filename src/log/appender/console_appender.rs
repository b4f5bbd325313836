use crate::log::appender::LogAppender;
use anyhow::Result;
use serde::Deserialize;
use smart_default::SmartDefault;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// 输出目标
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, SmartDefault)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Stdout,
    Stderr,
}

/// ConsoleAppender 配置
#[derive(Debug, Clone, Deserialize, PartialEq, SmartDefault)]
#[serde(default)]
pub struct ConsoleAppenderConfig {
    pub target: Target,

    /// 每次写入后立即刷新，关闭时只在 flush 时写出
    #[default = true]
    pub auto_flush: bool,
}

type Sink = BufWriter<Box<dyn AsyncWrite + Send + Unpin>>;

/// 终端输出器
///
/// 将日志输出到标准输出或标准错误
pub struct ConsoleAppender {
    config: ConsoleAppenderConfig,
    sink: Mutex<Sink>,
}

impl ConsoleAppender {
    pub fn new(config: ConsoleAppenderConfig) -> Self {
        let writer: Box<dyn AsyncWrite + Send + Unpin> = match config.target {
            Target::Stdout => Box::new(tokio::io::stdout()),
            Target::Stderr => Box::new(tokio::io::stderr()),
        };

        Self {
            config,
            sink: Mutex::new(BufWriter::new(writer)),
        }
    }

    pub fn target(&self) -> Target {
        self.config.target
    }
}

#[async_trait::async_trait]
impl LogAppender for ConsoleAppender {
    async fn append(&self, bytes: &[u8]) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.write_all(bytes).await?;
        if self.config.auto_flush {
            sink.flush().await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.sink.lock().await.flush().await?;
        Ok(())
    }
}

crate::impl_from!(ConsoleAppenderConfig => ConsoleAppender);
crate::impl_box_from!(ConsoleAppender => dyn LogAppender);
