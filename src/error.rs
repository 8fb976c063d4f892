use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn external input into a [`crate::model::Diagram`]. A failed
/// load never touches the live diagram.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload too large: {actual} bytes exceeds the {limit} byte limit")]
    TooLarge { actual: usize, limit: usize },
    #[error("invalid diagram: {0}")]
    Invalid(String),
    #[error("share link is not valid Base64")]
    Base64(#[from] base64::DecodeError),
    #[error("share link does not decode to UTF-8 text")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("share link has no `data` parameter")]
    MissingShareData,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("unknown theme `{0}`")]
    UnknownTheme(String),
}
