mod core;
mod default_formatter;
mod json_formatter;
mod registry;

pub use core::{LogFormatter, LINE_ENDING};
pub use default_formatter::{DefaultFormatter, DefaultFormatterConfig};
pub use json_formatter::{JsonFormatter, JsonFormatterConfig, FIXED_KEYS};
pub use registry::{create_formatter_from_options, register_formatters};
