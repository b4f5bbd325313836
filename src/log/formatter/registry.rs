use crate::cfg::{create_trait_from_type_options, register_trait, TypeOptions};
use crate::log::formatter::{
    DefaultFormatter, DefaultFormatterConfig, JsonFormatter, JsonFormatterConfig, LogFormatter,
};
use anyhow::Result;

/// 注册所有 Formatter 实现
pub fn register_formatters() -> Result<()> {
    register_trait::<DefaultFormatter, dyn LogFormatter, DefaultFormatterConfig>(
        "DefaultFormatter",
    )?;
    register_trait::<JsonFormatter, dyn LogFormatter, JsonFormatterConfig>("JsonFormatter")?;
    Ok(())
}

/// 从 TypeOptions 创建 Formatter
pub fn create_formatter_from_options(options: &TypeOptions) -> Result<Box<dyn LogFormatter>> {
    create_trait_from_type_options(options)
}
