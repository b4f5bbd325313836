//! 调用栈捕获
//!
//! [`CallStack`] 是宿主提供的能力：按顺序返回当前调用栈的原始帧。
//! 默认实现基于 `backtrace`，测试可以注入固定的帧序列。

use serde::{Deserialize, Serialize};

/// 源文件以此前缀开头的帧属于标准库
pub const INTERNAL_FILE_PREFIX: &str = "/rustc/";

const INTERNAL_SYMBOL_PREFIXES: &[&str] = &["backtrace::", "std::", "core::", "alloc::"];

// 进程入口和 libc 启动代码
const RUNTIME_ENTRY_SYMBOLS: &[&str] = &["_start", "__libc_start_main", "__libc_start_call_main"];

// 捕获过程自身的帧，连同它们之前（更内层）的帧一起丢弃
const OWN_SYMBOL_PREFIXES: &[&str] = &[
    concat!(module_path!(), "::"),
    concat!(env!("CARGO_CRATE_NAME"), "::serializers::error::ErrorSerializer"),
    concat!(env!("CARGO_CRATE_NAME"), "::serializers::Serializers"),
];

/// 捕获到的原始帧，字段都可能缺失
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    /// 去掉 hash 的符号名，如 `app::db::Pool::connect`
    pub symbol: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub col: Option<u32>,
}

/// 调用栈捕获能力
pub trait CallStack: Send + Sync {
    /// 由内向外返回帧；无法捕获时返回 None
    fn capture(&self) -> Option<Vec<RawFrame>>;
}

/// 基于 `backtrace` 的实现
///
/// 不依赖 `RUST_BACKTRACE` 等环境变量，也不修改任何全局状态
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceCallStack;

impl CallStack for BacktraceCallStack {
    fn capture(&self) -> Option<Vec<RawFrame>> {
        let backtrace = backtrace::Backtrace::new();
        let mut frames = Vec::new();

        for frame in backtrace.frames() {
            // 无法解析符号的帧（加载器、libc 等）不可用，直接跳过；
            // 内联展开后一帧可能对应多个符号
            for symbol in frame.symbols() {
                frames.push(RawFrame {
                    symbol: symbol.name().map(|name| format!("{:#}", name)),
                    file: symbol.filename().map(|p| p.to_string_lossy().into_owned()),
                    line: symbol.lineno(),
                    col: symbol.colno(),
                });
            }
        }

        if frames.is_empty() {
            None
        } else {
            Some(frames)
        }
    }
}

/// 可移植的调用栈帧
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackFrame {
    pub function: String,
    pub method: String,
    pub this_context: String,
    pub file: String,
    pub line: i64,
    pub col: i64,
    pub native: bool,
    pub toplevel: bool,
    pub constructor: bool,
    pub eval_invocation: bool,
}

impl Default for StackFrame {
    fn default() -> Self {
        Self {
            function: "<anonymous>".to_string(),
            method: "<unknown>".to_string(),
            this_context: "Object".to_string(),
            file: String::new(),
            line: -1,
            col: -1,
            native: false,
            toplevel: false,
            constructor: false,
            eval_invocation: false,
        }
    }
}

impl From<RawFrame> for StackFrame {
    fn from(raw: RawFrame) -> Self {
        let mut frame = StackFrame {
            native: raw.file.is_none(),
            file: raw.file.unwrap_or_default(),
            line: raw.line.map(i64::from).unwrap_or(-1),
            col: raw.col.map(i64::from).unwrap_or(-1),
            ..Default::default()
        };

        let Some(symbol) = raw.symbol.filter(|s| !s.is_empty()) else {
            return frame;
        };

        let (owner, method) = split_symbol(&symbol);
        frame.toplevel = owner.is_none();
        frame.constructor = owner.is_some() && method == "new";
        frame.method = method.to_string();
        if let Some(owner) = owner {
            frame.this_context = owner;
        }
        frame.function = symbol;
        frame
    }
}

/// 捕获并整理调用栈：去掉捕获过程自身和标准库的帧
pub fn capture_frames(call_stack: &dyn CallStack) -> Vec<StackFrame> {
    let Some(raw) = call_stack.capture() else {
        return Vec::new();
    };

    let start = raw
        .iter()
        .rposition(is_own_frame)
        .map(|pos| pos + 1)
        .unwrap_or(0);

    raw.into_iter()
        .skip(start)
        .filter(|frame| !is_internal(frame))
        .map(StackFrame::from)
        .collect()
}

fn symbol_path(frame: &RawFrame) -> Option<&str> {
    frame.symbol.as_deref().map(|s| s.trim_start_matches('<'))
}

fn is_own_frame(frame: &RawFrame) -> bool {
    symbol_path(frame)
        .map(|s| OWN_SYMBOL_PREFIXES.iter().any(|p| s.starts_with(p)))
        .unwrap_or(false)
}

fn is_internal(frame: &RawFrame) -> bool {
    if frame.symbol.as_deref().map_or(true, str::is_empty) && frame.file.is_none() {
        return true;
    }

    let internal_file = frame
        .file
        .as_deref()
        .map(|f| f.starts_with(INTERNAL_FILE_PREFIX))
        .unwrap_or(false);
    let internal_symbol = symbol_path(frame)
        .map(|s| {
            INTERNAL_SYMBOL_PREFIXES.iter().any(|p| s.starts_with(p))
                || RUNTIME_ENTRY_SYMBOLS.contains(&s)
        })
        .unwrap_or(false);

    internal_file || internal_symbol
}

/// 拆出符号的所属类型和方法名
///
/// `app::Pool::connect` => (Some("Pool"), "connect")，
/// `<app::Pool as app::Connect>::open` => (Some("Pool"), "open")，
/// `app::main` => (None, "main")
fn split_symbol(symbol: &str) -> (Option<String>, &str) {
    let Some(split) = last_top_level_separator(symbol) else {
        return (None, symbol);
    };
    let (path, method) = (&symbol[..split], &symbol[split + 2..]);

    let owner = if path.starts_with('<') && path.ends_with('>') {
        let inner = &path[1..path.len() - 1];
        let type_path = inner.split_once(" as ").map(|(t, _)| t).unwrap_or(inner);
        Some(last_segment(type_path).to_string())
    } else {
        let segment = last_segment(path);
        segment
            .chars()
            .next()
            .filter(|c| c.is_ascii_uppercase())
            .map(|_| segment.to_string())
    };

    (owner, method)
}

fn last_top_level_separator(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut found = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth -= 1,
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                found = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    found
}

fn last_segment(path: &str) -> &str {
    let base = path.split('<').next().unwrap_or(path);
    base.rsplit("::").next().unwrap_or(base)
}
