//! Error types for conductor-http-client.

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self.kind, ErrorKind::Config(_))
    }

    /// Returns true if this error came from the active transport.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport(_))
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Invalid configuration, reportable before the service runs.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fatal error during backend selection at startup.
    #[error("Startup error: {0}")]
    Startup(String),

    /// A request was dispatched on a service that is not started.
    #[error("Service is not started; requests require a running backend")]
    NotStarted,

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A header name or value the backend cannot represent.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Transport-level failure, passed through from the active backend.
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::InvalidUrl(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

#[cfg(feature = "nonblocking")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::with_source(ErrorKind::Transport(err.to_string()), err)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::with_source(
            ErrorKind::Other(format!("request task failed: {err}")),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_config() {
        let err = Error::new(ErrorKind::Config("no backend enabled".to_string()));
        assert!(err.is_config());

        let err = Error::new(ErrorKind::NotStarted);
        assert!(!err.is_config());
    }

    #[test]
    fn test_error_kind_display_messages() {
        let cases: Vec<(ErrorKind, &str)> = vec![
            (
                ErrorKind::Config("missing backend".into()),
                "Configuration error: missing backend",
            ),
            (
                ErrorKind::Startup("no transport".into()),
                "Startup error: no transport",
            ),
            (ErrorKind::NotStarted, "not started"),
            (
                ErrorKind::InvalidUrl("relative URL without a base".into()),
                "Invalid URL: relative URL without a base",
            ),
            (
                ErrorKind::InvalidHeader("X-Bad\\n".into()),
                "Invalid header",
            ),
            (
                ErrorKind::Transport("connection refused".into()),
                "Transport error: connection refused",
            ),
            (
                ErrorKind::Json("unexpected EOF".into()),
                "JSON error: unexpected EOF",
            ),
            (ErrorKind::Other("something else".into()), "something else"),
        ];

        for (kind, expected_substring) in cases {
            let display = kind.to_string();
            assert!(
                display.contains(expected_substring),
                "Expected '{display}' to contain '{expected_substring}'"
            );
        }
    }

    #[test]
    fn test_error_with_source() {
        let source_err = std::io::Error::other("connection reset");
        let err = Error::with_source(ErrorKind::Transport("read failed".into()), source_err);

        assert!(err.source.is_some());
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Transport error: read failed");
    }

    #[test]
    fn test_from_url_parse_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err.kind, ErrorKind::InvalidUrl(_)));
        assert!(err.source.is_some());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err.kind, ErrorKind::Json(_)));
        assert!(err.source.is_some());
    }
}
