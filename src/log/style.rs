//! 终端着色
//!
//! 直接拼接 ANSI 转义序列；`enabled == false` 时原样返回文本

use std::borrow::Cow;

const RESET: &str = "\x1b[0m";

/// 着色器，是否真正输出颜色由构造时的能力决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// 24 位真彩色前景色
    pub fn rgb<'a>(&self, (r, g, b): (u8, u8, u8), text: &'a str) -> Cow<'a, str> {
        if self.enabled {
            Cow::Owned(format!("\x1b[38;2;{};{};{}m{}{}", r, g, b, text, RESET))
        } else {
            Cow::Borrowed(text)
        }
    }

    pub fn gray<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.rgb((134, 134, 134), text)
    }

    pub fn bold<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.sgr("1", text)
    }

    pub fn dim<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.sgr("2", text)
    }

    pub fn red<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.sgr("31", text)
    }

    pub fn magenta<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.sgr("35", text)
    }

    fn sgr<'a>(&self, code: &str, text: &'a str) -> Cow<'a, str> {
        if self.enabled {
            Cow::Owned(format!("\x1b[{}m{}{}", code, text, RESET))
        } else {
            Cow::Borrowed(text)
        }
    }
}
