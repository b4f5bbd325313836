use anyhow::{anyhow, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, SecondsFormat, Utc};
use serde::Deserialize;
use smart_default::SmartDefault;
use std::fmt::Write;

/// 时间戳渲染配置
#[derive(Debug, Clone, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct TimestampConfig {
    /// 时区：`local`、`utc` 或固定偏移 `+08:00` / `-07:00`
    #[default("local".to_string())]
    pub timezone: String,

    /// strftime 格式
    #[default("%d %b %Y, %H:%M:%S %Z".to_string())]
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Zone {
    Local,
    Utc,
    Fixed(FixedOffset),
}

/// 把毫秒时间戳渲染成人类可读的时间
#[derive(Debug, Clone)]
pub struct TimestampRenderer {
    zone: Zone,
    format: String,
}

impl TimestampRenderer {
    pub fn new(config: TimestampConfig) -> Result<Self> {
        if StrftimeItems::new(&config.format).any(|item| matches!(item, Item::Error)) {
            return Err(anyhow!("invalid timestamp format: {}", config.format));
        }

        Ok(Self {
            zone: parse_zone(&config.timezone)?,
            format: config.format,
        })
    }

    /// 按配置的时区和格式渲染；超出可表示范围时输出原始毫秒数
    pub fn render(&self, millis: i64) -> String {
        let Some(utc) = DateTime::<Utc>::from_timestamp_millis(millis) else {
            return millis.to_string();
        };

        let mut out = String::with_capacity(32);
        let written = match &self.zone {
            Zone::Utc => write!(out, "{}", utc.format(&self.format)),
            Zone::Local => write!(out, "{}", utc.with_timezone(&Local).format(&self.format)),
            Zone::Fixed(offset) => write!(out, "{}", utc.with_timezone(offset).format(&self.format)),
        };

        match written {
            Ok(()) => out,
            Err(_) => millis.to_string(),
        }
    }
}

impl Default for TimestampRenderer {
    fn default() -> Self {
        Self {
            zone: Zone::Local,
            format: TimestampConfig::default().format,
        }
    }
}

/// ISO-8601 UTC 时间（毫秒精度），如 `2023-11-14T22:13:20.000Z`
pub fn iso8601(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

/// 当前时间（毫秒）
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn parse_zone(timezone: &str) -> Result<Zone> {
    match timezone.trim().to_ascii_lowercase().as_str() {
        "local" | "" => Ok(Zone::Local),
        "utc" | "z" | "gmt" => Ok(Zone::Utc),
        other => parse_offset(other)
            .map(Zone::Fixed)
            .ok_or_else(|| anyhow!("invalid timezone: {}", timezone)),
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(timezone: &str, format: &str) -> TimestampRenderer {
        TimestampRenderer::new(TimestampConfig {
            timezone: timezone.to_string(),
            format: format.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_render_utc_default_format() {
        let r = renderer("utc", &TimestampConfig::default().format);
        assert_eq!(r.render(1_700_000_000_000), "14 Nov 2023, 22:13:20 UTC");
    }

    #[test]
    fn test_render_fixed_offset() {
        let r = renderer("-07:00", "%Y-%m-%d %H:%M:%S %:z");
        assert_eq!(r.render(1_700_000_000_000), "2023-11-14 15:13:20 -07:00");

        let r = renderer("+0530", "%H:%M");
        assert_eq!(r.render(1_700_000_000_000), "03:43");
    }

    #[test]
    fn test_invalid_config() {
        assert!(TimestampRenderer::new(TimestampConfig {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        })
        .is_err());
        assert!(TimestampRenderer::new(TimestampConfig {
            timezone: "utc".to_string(),
            format: "%Q broken".to_string(),
        })
        .is_err());
    }

    #[test]
    fn test_out_of_range_falls_back_to_millis() {
        let r = renderer("utc", "%Y");
        assert_eq!(r.render(i64::MAX), i64::MAX.to_string());
    }

    #[test]
    fn test_iso8601() {
        assert_eq!(iso8601(1_700_000_000_000), "2023-11-14T22:13:20.000Z");
        assert_eq!(iso8601(1_700_000_000_123), "2023-11-14T22:13:20.123Z");
    }
}
