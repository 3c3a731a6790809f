//! Process-wide `tracing` setup for binaries embedding the client.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const ENABLED_VAR: &str = "SKILL_STREAM_OBSERVABILITY_ENABLED";
const LEVEL_VAR: &str = "SKILL_STREAM_LOG_LEVEL";
const JSON_PATH_VAR: &str = "SKILL_STREAM_JSON_LOG_PATH";

/// Client events at info, everything else (reqwest, hyper) at warn.
const DEFAULT_DIRECTIVE: &str = "warn,skill_stream=info";
const DEFAULT_LOG_FILE: &str = "skill-stream.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Where log output goes.
#[derive(Clone, Debug, PartialEq, Eq)]
enum LogSink {
    Off,
    /// Compact lines on stderr; stdout carries streamed text.
    Stderr,
    JsonFile(PathBuf),
}

impl LogSink {
    fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let disabled = lookup(ENABLED_VAR).is_some_and(|raw| {
            matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off" | "disabled"
            )
        });
        if disabled {
            return Self::Off;
        }
        match lookup(JSON_PATH_VAR) {
            Some(path) if !path.trim().is_empty() => Self::JsonFile(PathBuf::from(path.trim())),
            _ => Self::Stderr,
        }
    }
}

/// `SKILL_STREAM_LOG_LEVEL`, then `RUST_LOG`, then the crate default.
/// Unparseable values fall through to the next source.
fn resolve_filter(lookup: impl Fn(&str) -> Option<String>) -> EnvFilter {
    [LEVEL_VAR, EnvFilter::DEFAULT_ENV]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find_map(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn json_file_writer(path: &Path) -> RollingFileAppender {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let _ = std::fs::create_dir_all(dir);
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    tracing_appender::rolling::never(dir, file_name)
}

/// Installs the global subscriber once per process. Later calls are no-ops,
/// as is a call made after another subscriber was installed.
///
/// Reads `SKILL_STREAM_OBSERVABILITY_ENABLED` (set to `false` to skip),
/// `SKILL_STREAM_LOG_LEVEL` / `RUST_LOG` for the filter and
/// `SKILL_STREAM_JSON_LOG_PATH` to write JSON lines to a file instead of
/// stderr.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let env = |key: &str| std::env::var(key).ok();
        let filter = resolve_filter(env);
        match LogSink::resolve(env) {
            LogSink::Off => {}
            LogSink::Stderr => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
            LogSink::JsonFile(path) => {
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(json_file_writer(&path));
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
        }
    });
}
