use crate::log::appender::LogAppender;
use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// FileAppender 配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FileAppenderConfig {
    /// 日志文件路径
    pub file_path: String,
}

/// 文件输出器
///
/// 以追加模式写入文件，父目录不存在时自动创建
pub struct FileAppender {
    file: Mutex<Option<tokio::fs::File>>,
    config: FileAppenderConfig,
}

impl FileAppender {
    /// 从配置创建并立即打开文件
    pub async fn from_config(config: FileAppenderConfig) -> Result<Self> {
        let file = open(Path::new(&config.file_path)).await?;

        Ok(Self {
            file: Mutex::new(Some(file)),
            config,
        })
    }

    /// 同步构造（用于支持 From trait），文件在第一次写入时打开，打开失败作为写入错误返回
    pub fn new(config: FileAppenderConfig) -> Self {
        Self {
            file: Mutex::new(None),
            config,
        }
    }

    /// 获取日志文件路径
    pub fn path(&self) -> &str {
        &self.config.file_path
    }
}

async fn open(path: &Path) -> Result<tokio::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(PathBuf::from(path))
        .await?;
    Ok(file)
}

#[async_trait::async_trait]
impl LogAppender for FileAppender {
    async fn append(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.file.lock().await;
        let file = match guard.take() {
            Some(file) => file,
            None => open(Path::new(&self.config.file_path)).await?,
        };
        let file = guard.insert(file);
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        if let Some(file) = self.file.lock().await.as_mut() {
            file.flush().await?;
        }
        Ok(())
    }
}

// 使用 new 方法（同步）实现 From trait
crate::impl_from!(FileAppenderConfig => FileAppender);
crate::impl_box_from!(FileAppender => dyn LogAppender);

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_appender_appends() -> Result<()> {
        let temp_file = tempfile::NamedTempFile::new()?;
        std::fs::write(temp_file.path(), "existing\n")?;
        let config = FileAppenderConfig {
            file_path: temp_file.path().to_string_lossy().to_string(),
        };

        let appender = FileAppender::from_config(config).await?;
        appender.append(b"First message\n").await?;
        appender.append(b"Second message\n").await?;
        appender.flush().await?;

        let contents = tokio::fs::read_to_string(temp_file.path()).await?;
        assert_eq!(contents, "existing\nFirst message\nSecond message\n");

        Ok(())
    }

    #[tokio::test]
    async fn test_file_appender_opens_lazily() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let log_path = temp_dir.path().join("nested").join("dir").join("test.log");

        let appender = FileAppender::from(FileAppenderConfig {
            file_path: log_path.to_string_lossy().to_string(),
        });
        assert_eq!(appender.path(), log_path.to_string_lossy());
        assert!(!log_path.exists());

        appender.append(b"Test\n").await?;
        assert_eq!(std::fs::read_to_string(&log_path)?, "Test\n");

        Ok(())
    }

    #[tokio::test]
    async fn test_file_appender_open_failure_is_reported() -> Result<()> {
        let temp_file = tempfile::NamedTempFile::new()?;
        // 父路径是普通文件，无法创建目录
        let log_path = temp_file.path().join("test.log");

        let appender = FileAppender::new(FileAppenderConfig {
            file_path: log_path.to_string_lossy().to_string(),
        });
        assert!(appender.append(b"Test\n").await.is_err());

        Ok(())
    }
}
