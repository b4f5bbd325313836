use anyhow::Result;

/// 日志输出器 trait
///
/// 负责将格式化后的行写入目标介质。`append` 返回时数据已经写出或进入缓冲区，
/// 写失败时原样返回底层错误（`std::io::Error` 可以通过 downcast 取回）
#[async_trait::async_trait]
pub trait LogAppender: Send + Sync {
    /// 输出一段完整的字节，调用方负责换行
    async fn append(&self, bytes: &[u8]) -> Result<()>;

    /// 刷新缓冲区（默认实现为空操作）
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
