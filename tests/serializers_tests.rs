//! 序列化器与格式化器的组合：应用侧序列化、写成一行、再由管道格式化

#[cfg(test)]
mod serializers_tests {
    use anyhow::Result;
    use logline::log::{
        DefaultFormatter, DefaultFormatterConfig, HostContext, LogFormatter, LogRecord, Severity,
        TimestampConfig, LINE_ENDING,
    };
    use logline::serializers::{
        CallStack, ErrorSerializer, ErrorSerializerConfig, Exchange, RawFrame, RequestId,
        Serializers,
    };
    use std::sync::Arc;

    struct FixedCallStack(Vec<RawFrame>);

    impl CallStack for FixedCallStack {
        fn capture(&self) -> Option<Vec<RawFrame>> {
            Some(self.0.clone())
        }
    }

    fn frame(symbol: &str, file: &str, line: u32) -> RawFrame {
        RawFrame {
            symbol: Some(symbol.to_string()),
            file: Some(file.to_string()),
            line: Some(line),
            col: Some(5),
        }
    }

    fn formatter() -> Result<DefaultFormatter> {
        DefaultFormatter::try_new(
            DefaultFormatterConfig {
                target_padding: 4,
                colored: Some(false),
                timestamp: TimestampConfig {
                    timezone: "utc".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            },
            Arc::new(HostContext::fixed("alice", false)),
        )
    }

    /// 先写成一行 JSON 再解析，和管道中的路径一致
    fn reparse(record: &LogRecord) -> Result<LogRecord> {
        let value = serde_json::from_str(&record.to_line()?)?;
        LogRecord::from_value(value).ok_or_else(|| anyhow::anyhow!("not an object"))
    }

    #[test]
    fn test_error_with_stack_renders_deduplicated_trace() -> Result<()> {
        let serializer = ErrorSerializer::new(ErrorSerializerConfig {
            callsites: true,
            retain_originals: true,
            ..Default::default()
        })
        .with_call_stack(Arc::new(FixedCallStack(vec![
            frame("backtrace::capture::Backtrace::new", "/cargo/backtrace/src/capture.rs", 1),
            frame("logline::serializers::error::ErrorSerializer::serialize", "/src/error.rs", 2),
            frame("app::db::Pool::query", "/app/src/db.rs", 10),
            frame("app::handlers::list", "/app/src/handlers.rs", 20),
            frame("app::db::Pool::new", "/app/src/db.rs", 30),
            frame("core::ops::function::FnOnce::call_once", "/rustc/abc/library/core/src/ops/function.rs", 40),
            frame("app::main", "/app/src/main.rs", 50),
        ])));

        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "table missing");
        let serialized = serializer.serialize(err);
        let stack = serialized.stack.clone().unwrap_or_default();
        assert_eq!(stack.len(), 4);
        assert_eq!(stack[0].this_context, "Pool");
        assert!(stack[2].constructor);
        assert!(stack[3].toplevel);

        let record = LogRecord::new(Severity::Error, "query failed")
            .with_time(1_700_000_000_000)
            .with_name("db")
            .with_hostname("h1")
            .with_pid(7)
            .with_field("err", &serialized);

        let output = formatter()?.transform(&reparse(&record)?);
        let lines: Vec<_> = output.trim_end().split(LINE_ENDING).collect();
        assert_eq!(
            lines,
            vec![
                "[14 Nov 2023, 22:13:20 UTC] ERROR [db   | alice@h1 (7)] query failed",
                "Error: table missing",
                "   • in db.rs:10:5",
                "   • in handlers.rs:20:5",
                "       ~ /app/src/db.rs:30:5",
                "   • in main.rs:50:5",
            ]
        );

        let original = serializer.original(&serialized).map(|e| e.to_string());
        assert_eq!(original.as_deref(), Some("table missing"));
        Ok(())
    }

    #[test]
    fn test_exchange_renders_request_and_response() -> Result<()> {
        let serializers = Serializers::default();

        let mut req = http::Request::builder()
            .method("POST")
            .uri("/orders?draft=1")
            .header("x-request-id", "from-header")
            .body(())?;
        req.extensions_mut().insert(RequestId("ext-9".to_string()));
        let res = http::Response::builder().status(201).body(())?;

        let record = LogRecord::new(Severity::Info, "request completed")
            .with_time(1_700_000_000_000)
            .with_hostname("h1")
            .with_field(serializers.request_key(), serializers.request(&req))
            .with_field(
                serializers.response_key(),
                serializers.response(&Exchange::new(&req, &res)),
            )
            .with_field("responseTime", 3.14159)
            .with_field("route", "orders.create");

        let output = formatter()?.transform(&reparse(&record)?);
        assert!(output.ends_with(&format!(
            "route=orders.create request completed POST /orders?draft=1 [ext-9] -> 201 Created 3.14ms{}",
            LINE_ENDING
        )));
        Ok(())
    }

    #[test]
    fn test_request_only_prefers_explicit_id() -> Result<()> {
        let serializers = Serializers::default();
        let req = http::Request::builder()
            .method("get")
            .uri("/health")
            .header("x-request-id", "embedded")
            .body(())?;

        let record = LogRecord::new(Severity::Debug, "probe")
            .with_time(1_700_000_000_000)
            .with_hostname("h1")
            .with_field("req", serializers.request(&req))
            .with_field("reqId", "explicit");

        let output = formatter()?.transform(&reparse(&record)?);
        assert!(output.ends_with(&format!("probe GET /health [explicit]{}", LINE_ENDING)));
        assert!(!output.contains("embedded"));
        Ok(())
    }
}
