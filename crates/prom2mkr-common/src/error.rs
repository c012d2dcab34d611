use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Prom2mkrError {
    #[error("scrape failed: {0}")]
    Source(String),
    #[error("malformed exposition at line {line}: {message}")]
    Decode { line: usize, message: String },
    #[error("invalid value {value:?} for metric {key}")]
    Parse { key: String, value: String },
    #[error("graph definition cache {}: {message}", path.display())]
    SchemaCache { path: PathBuf, message: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("push to monitoring agent failed: {0}")]
    Push(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Prom2mkrError {
    /// Errors after which the collector must not keep running.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Source(_)
            | Self::Decode { .. }
            | Self::SchemaCache { .. }
            | Self::Config(_)
            | Self::Io(_) => true,
            Self::Parse { .. } | Self::Push(_) => false,
        }
    }

    pub fn schema_cache(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SchemaCache {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Prom2mkrError>;

#[cfg(test)]
mod tests {
    use super::Prom2mkrError;

    #[test]
    fn parse_error_names_key_and_value() {
        let err = Prom2mkrError::Parse {
            key: "svc.up".to_string(),
            value: "abc".to_string(),
        };

        assert_eq!(err.to_string(), "invalid value \"abc\" for metric svc.up");
        assert!(!err.is_fatal());
    }

    #[test]
    fn schema_cache_error_is_fatal() {
        let err = Prom2mkrError::schema_cache("/tmp/graphs.json", "expected value");

        assert!(err.is_fatal());
        assert!(err.to_string().contains("/tmp/graphs.json"));
    }
}
