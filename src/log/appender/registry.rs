use crate::cfg::{create_trait_from_type_options, register_trait, TypeOptions};
#[cfg(unix)]
use crate::log::appender::{FdAppender, FdAppenderConfig};
use crate::log::appender::{
    ConsoleAppender, ConsoleAppenderConfig, FileAppender, FileAppenderConfig, LogAppender,
};
use anyhow::Result;

/// 注册所有 Appender 实现
pub fn register_appenders() -> Result<()> {
    register_trait::<ConsoleAppender, dyn LogAppender, ConsoleAppenderConfig>("ConsoleAppender")?;
    register_trait::<FileAppender, dyn LogAppender, FileAppenderConfig>("FileAppender")?;
    #[cfg(unix)]
    register_trait::<FdAppender, dyn LogAppender, FdAppenderConfig>("FdAppender")?;
    Ok(())
}

/// 从 TypeOptions 创建 Appender
pub fn create_appender_from_options(options: &TypeOptions) -> Result<Box<dyn LogAppender>> {
    create_trait_from_type_options(options)
}
