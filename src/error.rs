//! Error type shared by the rate and history sources.
//!
//! Every failure a network call can produce is a distinct variant, so the
//! controller can show "Error" without ever crashing and logs can say why.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RateError {
    /// Transport failure (DNS, TLS, timeout, connection reset).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered but reported a failure inside its payload.
    #[error("{provider} returned an unsuccessful result: {error_type}")]
    Api {
        provider: &'static str,
        error_type: String,
    },

    /// The body could not be decoded or carried an unusable value.
    #[error("{provider} sent a malformed response: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },

    /// The payload decoded but had no rate for the requested code.
    #[error("No rate for {0} in response")]
    MissingRate(String),

    /// A historical query came back without usable data.
    #[error("No historical data available")]
    MissingData,

    /// A history period outside 0..=MAX_HISTORY_DAYS, or one that runs off the calendar.
    #[error("Invalid history period: {0} days")]
    InvalidPeriod(u32),

    #[error("Invalid currency code: {0}")]
    InvalidCode(String),

    #[error("Invalid currency pair: {0}")]
    InvalidPair(String),
}

impl RateError {
    pub(crate) fn malformed(provider: &'static str, message: impl Into<String>) -> Self {
        RateError::Malformed {
            provider,
            message: message.into(),
        }
    }

    /// True for failures reported by the service itself rather than the transport
    pub fn is_api_failure(&self) -> bool {
        matches!(self, RateError::Api { .. })
    }
}

/// Rates must be positive and finite to be usable
pub(crate) fn validate_rate(provider: &'static str, rate: f64) -> Result<f64, RateError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(RateError::malformed(provider, format!("invalid rate {}", rate)))
    }
}
