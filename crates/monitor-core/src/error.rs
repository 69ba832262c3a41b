use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the sensor monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A timestamp string did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// The HTTP transport to the store failed (DNS, TLS, timeout, ...).
    #[error("Store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered, but with a non-success status.
    #[error("Store returned HTTP {status} for {url}")]
    StoreStatus { status: u16, url: String },

    /// A chart artifact could not be produced.
    #[error("Chart rendering failed: {0}")]
    Chart(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the monitor crates.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = MonitorError::FileRead {
            path: PathBuf::from("/some/snapshot.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/snapshot.json"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_timestamp_parse() {
        let err = MonitorError::TimestampParse("not-a-timestamp".to_string());
        assert_eq!(err.to_string(), "Invalid timestamp format: not-a-timestamp");
    }

    #[test]
    fn test_error_display_store_status() {
        let err = MonitorError::StoreStatus {
            status: 401,
            url: "https://example.firebaseio.com/sensors/device1.json".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Store returned HTTP 401 for https://example.firebaseio.com/sensors/device1.json"
        );
    }

    #[test]
    fn test_error_display_chart() {
        let err = MonitorError::Chart("empty series".to_string());
        assert_eq!(err.to_string(), "Chart rendering failed: empty series");
    }

    #[test]
    fn test_error_display_config() {
        let err = MonitorError::Config("--hours must be non-negative".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: --hours must be non-negative"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MonitorError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: MonitorError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
