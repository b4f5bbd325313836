//! cfg 模块 - 配置管理
//!
//! `TypeOptions` 描述"用哪个实现 + 它的配置"，注册表按名字构造 formatter / appender

pub mod macros;
pub mod registry;
pub mod type_options;

pub use registry::{create_trait_from_type_options, register_trait, short_type_name};
pub use type_options::{ConfigFormat, TypeOptions};
