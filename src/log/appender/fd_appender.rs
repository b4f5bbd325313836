use crate::log::appender::{ConsoleAppender, ConsoleAppenderConfig, LogAppender, Target};
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::os::fd::{BorrowedFd, RawFd};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// FdAppender 配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FdAppenderConfig {
    /// 已经打开的文件描述符，1 和 2 分别对应标准输出和标准错误
    pub fd: RawFd,
}

enum Sink {
    Console(ConsoleAppender),
    File(Mutex<tokio::fs::File>),
    Invalid(String),
}

/// 文件描述符输出器
///
/// 写入调用方传入描述符的副本，原描述符仍归调用方所有。
/// 0 和未打开的描述符在构造时识别，之后每次写入都返回错误
pub struct FdAppender {
    fd: RawFd,
    sink: Sink,
}

impl FdAppender {
    pub fn new(config: FdAppenderConfig) -> Self {
        let sink = match config.fd {
            1 => Sink::Console(ConsoleAppender::new(ConsoleAppenderConfig::default())),
            2 => Sink::Console(ConsoleAppender::new(ConsoleAppenderConfig {
                target: Target::Stderr,
                ..Default::default()
            })),
            0 => Sink::Invalid("file descriptor 0 is the input stream".to_string()),
            fd if fd < 0 => Sink::Invalid(format!("invalid file descriptor: {}", fd)),
            fd => match duplicate(fd) {
                Ok(file) => Sink::File(Mutex::new(tokio::fs::File::from_std(file))),
                Err(err) => Sink::Invalid(format!("invalid file descriptor {}: {}", fd, err)),
            },
        };

        Self {
            fd: config.fd,
            sink,
        }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

/// 复制描述符，未打开的描述符返回 EBADF
fn duplicate(fd: RawFd) -> std::io::Result<std::fs::File> {
    // SAFETY: 只在复制期间借用，复制失败不会访问该描述符
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    Ok(std::fs::File::from(borrowed.try_clone_to_owned()?))
}

#[async_trait::async_trait]
impl LogAppender for FdAppender {
    async fn append(&self, bytes: &[u8]) -> Result<()> {
        match &self.sink {
            Sink::Console(console) => console.append(bytes).await,
            Sink::File(file) => {
                let mut file = file.lock().await;
                file.write_all(bytes).await?;
                file.flush().await?;
                Ok(())
            }
            Sink::Invalid(reason) => Err(anyhow!("{}", reason)),
        }
    }

    async fn flush(&self) -> Result<()> {
        match &self.sink {
            Sink::Console(console) => console.flush().await,
            Sink::File(file) => {
                file.lock().await.flush().await?;
                Ok(())
            }
            Sink::Invalid(_) => Ok(()),
        }
    }
}

crate::impl_from!(FdAppenderConfig => FdAppender);
crate::impl_box_from!(FdAppender => dyn LogAppender);
