use std::{error::Error as StdError, sync::Arc};

use thiserror::Error;

/// Failure kinds surfaced by weather service operations.
#[derive(Debug, Clone, Error)]
pub enum WeatherError {
    /// The service answered with a non-success HTTP status.
    #[error("API returned unexpected status code {status_code}")]
    Api { status_code: u16 },

    /// The body was not the JSON shape we expect.
    #[error("Failed to parse response: {message}")]
    Parse { message: String },

    /// The transport itself failed (connection refused, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(Arc<dyn StdError + Send + Sync>),

    /// The fetch task stopped (panicked or was cancelled) before the service answered.
    #[error("Fetch was interrupted before a result arrived")]
    Interrupted,
}

impl WeatherError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    pub fn transport<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Transport(Arc::new(err))
    }

    /// Status code of an [`WeatherError::Api`] failure.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code } => Some(*status_code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err)
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_contains_status() {
        let err = WeatherError::Api { status_code: 503 };
        assert_eq!(err.to_string(), "API returned unexpected status code 503");
        assert_eq!(err.status_code(), Some(503));
    }

    #[test]
    fn transport_error_keeps_source_message() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = WeatherError::transport(io);
        assert!(err.to_string().contains("refused"));
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn serde_errors_become_parse_errors() {
        let err: WeatherError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(matches!(err, WeatherError::Parse { .. }));
    }
}
