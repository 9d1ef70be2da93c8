use std::io;
use tracing_subscriber::{fmt, EnvFilter};

/// Request spans come from `tower_http`; store and handler events from `service` and `server`.
const COMPACT_FILTER: &str = "info,tower_http=info,service=info,server=info";

/// Same targets, plus `record committed` / lock-timeout detail from `service::storage`.
const JSON_FILTER: &str = "info,tower_http=info,server=info,service::storage=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output for a terminal.
    Compact,
    /// One JSON object per event, including the emitting target.
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON; anything else, or unset, is compact.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }

    fn default_filter(self) -> &'static str {
        match self {
            LogFormat::Compact => COMPACT_FILTER,
            LogFormat::Json => JSON_FILTER,
        }
    }
}

/// `RUST_LOG` wins; otherwise the format's default directives apply.
fn filter_for(format: LogFormat) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format.default_filter()))
}

/// Compact stdout logging for local runs of the counter service.
pub fn init_logging_default() {
    let _ = fmt()
        .with_env_filter(filter_for(LogFormat::Compact))
        .with_target(false)
        .compact()
        .with_writer(io::stdout)
        .try_init();
}

/// JSON stdout logging; targets are kept so storage events can be told apart from request spans.
pub fn init_logging_json() {
    let _ = fmt()
        .with_env_filter(filter_for(LogFormat::Json))
        .with_target(true)
        .json()
        .with_writer(io::stdout)
        .try_init();
}

/// Pick the output format from `LOG_FORMAT`.
pub fn init_logging_from_env() {
    match LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref()) {
        LogFormat::Json => init_logging_json(),
        LogFormat::Compact => init_logging_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_selection() {
        assert_eq!(LogFormat::from_env_value(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some(" json ")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("pretty")), LogFormat::Compact);
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Compact);
    }

    #[test]
    fn default_filters_parse() {
        for format in [LogFormat::Compact, LogFormat::Json] {
            assert!(EnvFilter::try_new(format.default_filter()).is_ok());
        }
    }
}
