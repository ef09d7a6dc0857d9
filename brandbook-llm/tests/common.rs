#![allow(dead_code)]

use std::sync::OnceLock;

use brandbook_common::observability::{LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "brandbook-tests",
            emit_stderr: true,
            format: LogFormat::from_env_value(std::env::var("BRANDBOOK_LOG_FORMAT").ok().as_deref()),
            default_filter: "debug",
            ..LogConfig::default()
        };

        brandbook_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// Render `(event, data)` pairs as a `text/event-stream` body.
pub fn sse_body(events: &[(Option<&str>, &str)]) -> String {
    let mut out = String::new();
    for (event, data) in events {
        if let Some(name) = event {
            out.push_str(&format!("event: {name}\n"));
        }
        out.push_str(&format!("data: {data}\n\n"));
    }
    out
}
