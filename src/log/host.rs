//! 进程级只读信息：当前用户名、终端颜色能力
//!
//! 两者都只计算一次，之后只读，可以在多个 formatter 之间共享

use once_cell::sync::{Lazy, OnceCell};
use std::sync::Arc;

/// 用户名查不到时使用的占位
pub const UNKNOWN_USER: &str = "(unknown)";

static SHARED: Lazy<Arc<HostContext>> = Lazy::new(|| Arc::new(HostContext::new()));

/// 用户名与颜色能力的惰性缓存
///
/// 测试里用 [`HostContext::fixed`] 注入固定值
#[derive(Debug, Default)]
pub struct HostContext {
    username: OnceCell<String>,
    color: OnceCell<bool>,
}

impl HostContext {
    /// 首次访问时再探测系统
    pub fn new() -> Self {
        Self::default()
    }

    /// 固定的用户名和颜色能力
    pub fn fixed(username: impl Into<String>, color: bool) -> Self {
        Self {
            username: OnceCell::with_value(username.into()),
            color: OnceCell::with_value(color),
        }
    }

    /// 进程共享的实例，注册表构造 formatter 时使用
    pub fn shared() -> Arc<HostContext> {
        SHARED.clone()
    }

    pub fn username(&self) -> &str {
        self.username.get_or_init(lookup_username)
    }

    pub fn color_supported(&self) -> bool {
        *self
            .color
            .get_or_init(|| colored::control::ShouldColorize::from_env().should_colorize())
    }
}

fn lookup_username() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_USER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_fixed_context() {
        let ctx = HostContext::fixed("alice", true);
        assert_eq!(ctx.username(), "alice");
        assert!(ctx.color_supported());
    }

    #[test]
    #[serial]
    fn test_username_is_cached_after_first_lookup() {
        let ctx = HostContext::new();
        let first = ctx.username().to_string();

        let previous = std::env::var("USER").ok();
        std::env::set_var("USER", "someone-else-entirely");
        assert_eq!(ctx.username(), first);

        match previous {
            Some(value) => std::env::set_var("USER", value),
            None => std::env::remove_var("USER"),
        }
    }

    #[test]
    #[serial]
    fn test_username_falls_back_to_unknown() {
        let saved: Vec<_> = ["USER", "USERNAME", "LOGNAME"]
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();
        for (key, _) in &saved {
            std::env::remove_var(key);
        }

        assert_eq!(HostContext::new().username(), UNKNOWN_USER);

        for (key, value) in saved {
            if let Some(value) = value {
                std::env::set_var(key, value);
            }
        }
    }
}
