// Error taxonomy shared by every layer
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// `start >= end`, a missing endpoint, or an endpoint that cannot be parsed.
    #[error("invalid time range: {0}")]
    InvalidRange(String),

    #[error("invalid device identifier: {0}")]
    InvalidDevice(String),

    /// The store fetch exceeded its budget. Retryable by the caller.
    #[error("telemetry store did not answer within {timeout_secs}s")]
    UpstreamTimeout { timeout_secs: u64 },

    #[error("telemetry store unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A record carried a value that cannot be coerced to the type its field requires.
    #[error("malformed value {value} for field '{field}' in record at {timestamp}")]
    MalformedRecord {
        field: String,
        timestamp: i64,
        value: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl TelemetryError {
    /// Bad input from the caller, as opposed to upstream or data faults.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRange(_) | Self::InvalidDevice(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamTimeout { .. } | Self::UpstreamUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(TelemetryError::InvalidRange("x".into()).is_client_error());
        assert!(TelemetryError::InvalidDevice("x".into()).is_client_error());
        assert!(TelemetryError::UpstreamTimeout { timeout_secs: 90 }.is_retryable());
        assert!(TelemetryError::UpstreamUnavailable("down".into()).is_retryable());

        let malformed = TelemetryError::MalformedRecord {
            field: "speed".into(),
            timestamp: 1_700_000_000,
            value: "\"not-a-number\"".into(),
        };
        assert!(!malformed.is_client_error());
        assert!(!malformed.is_retryable());
        assert_eq!(
            malformed.to_string(),
            "malformed value \"not-a-number\" for field 'speed' in record at 1700000000"
        );
    }
}
