mod console_appender;
mod destination;
#[cfg(unix)]
mod fd_appender;
mod file_appender;
mod registry;
mod trait_;

pub use console_appender::{ConsoleAppender, ConsoleAppenderConfig, Target};
pub use destination::Destination;
#[cfg(unix)]
pub use fd_appender::{FdAppender, FdAppenderConfig};
pub use file_appender::{FileAppender, FileAppenderConfig};
pub use registry::{create_appender_from_options, register_appenders};
pub use trait_::LogAppender;
