use crate::log::log_record::LogRecord;

/// 平台换行符
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// 日志格式化器 trait
///
/// 负责将 LogRecord 转换为一行完整输出（以 [`LINE_ENDING`] 结尾）。
/// 对任何解析成功的记录都必须返回结果，缺失的可选字段只会跳过对应部分。
pub trait LogFormatter: Send + Sync {
    fn transform(&self, record: &LogRecord) -> String;
}
