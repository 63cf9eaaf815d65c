//! Rate Client: HTTP access to the exchange-rate services.
//!
//! Two sources sit behind [`RateSource`]:
//! - [`ExchangeRateApiClient`]: the keyed v6 API (`/codes`, `/pair/{from}/{to}`)
//! - [`OpenRatesClient`]: the keyless v4 API (`/latest/{from}`), used when no
//!   API key is configured
//!
//! Each call is a single attempt. Decoding lives in the `parse_*` functions so
//! it can be exercised without a network.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::currency::{fallback_currencies, Currency, CurrencyCode, CurrencyPair};
use crate::error::{validate_rate, RateError};

/// Default HTTP request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const EXCHANGE_RATE_API_ID: &str = "EXCHANGE_RATE_API";
pub const OPEN_RATES_ID: &str = "OPEN_RATES";

/// Anything that can quote a rate for a pair and list the codes it supports
#[async_trait]
pub trait RateSource: Send + Sync {
    fn id(&self) -> &'static str;

    async fn supported_codes(&self) -> Result<Vec<Currency>, RateError>;

    async fn pair_rate(&self, pair: &CurrencyPair) -> Result<f64, RateError>;
}

pub(crate) fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("HTTP client with {:?} timeout unavailable ({}); using defaults", timeout, e);
            Client::new()
        })
}

/// GET and return (status, body). The status is not checked here: the v6 API
/// reports failures as JSON with a non-2xx status, so the body is still decoded.
async fn get_text(client: &Client, url: &str) -> Result<(StatusCode, String), RateError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

/// Map an undecodable body to the most useful error
fn undecodable(provider: &'static str, status: StatusCode, err: serde_json::Error) -> RateError {
    if status.is_success() {
        RateError::malformed(provider, err.to_string())
    } else {
        RateError::Api {
            provider,
            error_type: format!("HTTP {}", status.as_u16()),
        }
    }
}

// ============================================================================
// EXCHANGERATE-API v6 (keyed)
// ============================================================================

#[derive(Debug, Deserialize)]
struct CodesResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    #[serde(default)]
    supported_codes: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    conversion_rate: Option<f64>,
}

fn check_result(
    provider: &'static str,
    result: &str,
    error_type: Option<String>,
) -> Result<(), RateError> {
    if result == "success" {
        Ok(())
    } else {
        Err(RateError::Api {
            provider,
            error_type: error_type.unwrap_or_else(|| result.to_string()),
        })
    }
}

pub(crate) fn parse_codes_response(
    status: StatusCode,
    body: &str,
) -> Result<Vec<Currency>, RateError> {
    let response: CodesResponse = serde_json::from_str(body)
        .map_err(|e| undecodable(EXCHANGE_RATE_API_ID, status, e))?;
    check_result(EXCHANGE_RATE_API_ID, &response.result, response.error_type)?;

    let currencies: Vec<Currency> = response
        .supported_codes
        .into_iter()
        .filter_map(|(code, name)| match CurrencyCode::new(&code) {
            Ok(code) => Some(Currency::new(code, name)),
            Err(_) => {
                log::warn!("Skipping unsupported code '{}' from catalog", code);
                None
            }
        })
        .collect();

    if currencies.is_empty() {
        return Err(RateError::malformed(
            EXCHANGE_RATE_API_ID,
            "empty supported_codes",
        ));
    }
    Ok(currencies)
}

pub(crate) fn parse_pair_response(status: StatusCode, body: &str) -> Result<f64, RateError> {
    let response: PairResponse = serde_json::from_str(body)
        .map_err(|e| undecodable(EXCHANGE_RATE_API_ID, status, e))?;
    check_result(EXCHANGE_RATE_API_ID, &response.result, response.error_type)?;

    let rate = response
        .conversion_rate
        .ok_or_else(|| RateError::malformed(EXCHANGE_RATE_API_ID, "missing conversion_rate"))?;
    validate_rate(EXCHANGE_RATE_API_ID, rate)
}

/// Client for `https://v6.exchangerate-api.com/v6/{key}/...`
pub struct ExchangeRateApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ExchangeRateApiClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Self {
        ExchangeRateApiClient {
            client: build_http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn codes_url(&self) -> String {
        format!("{}/{}/codes", self.base_url, self.api_key)
    }

    fn pair_url(&self, pair: &CurrencyPair) -> String {
        format!(
            "{}/{}/pair/{}/{}",
            self.base_url, self.api_key, pair.from, pair.to
        )
    }
}

#[async_trait]
impl RateSource for ExchangeRateApiClient {
    fn id(&self) -> &'static str {
        EXCHANGE_RATE_API_ID
    }

    async fn supported_codes(&self) -> Result<Vec<Currency>, RateError> {
        let (status, body) = get_text(&self.client, &self.codes_url()).await?;
        let currencies = parse_codes_response(status, &body)?;
        log::info!("Loaded {} supported currencies", currencies.len());
        Ok(currencies)
    }

    async fn pair_rate(&self, pair: &CurrencyPair) -> Result<f64, RateError> {
        // The URL embeds the key, so only the pair goes to the log
        log::debug!("Fetching {} from {}", pair, EXCHANGE_RATE_API_ID);
        let (status, body) = get_text(&self.client, &self.pair_url(pair)).await?;
        parse_pair_response(status, &body)
    }
}

// ============================================================================
// EXCHANGERATE-API v4 (keyless)
// ============================================================================

#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    rates: Option<HashMap<String, f64>>,
}

pub(crate) fn parse_latest_response(
    status: StatusCode,
    body: &str,
    target: &CurrencyCode,
) -> Result<f64, RateError> {
    let response: LatestResponse =
        serde_json::from_str(body).map_err(|e| undecodable(OPEN_RATES_ID, status, e))?;

    if let Some(result) = response.result.as_deref() {
        check_result(OPEN_RATES_ID, result, response.error_type)?;
    }

    let rates = response
        .rates
        .ok_or_else(|| RateError::malformed(OPEN_RATES_ID, "missing rates"))?;
    let rate = rates
        .get(target.as_str())
        .copied()
        .ok_or_else(|| RateError::MissingRate(target.to_string()))?;
    validate_rate(OPEN_RATES_ID, rate)
}

/// Client for `https://api.exchangerate-api.com/v4/latest/{from}`
pub struct OpenRatesClient {
    client: Client,
    base_url: String,
}

impl OpenRatesClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        OpenRatesClient {
            client: build_http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn latest_url(&self, from: &CurrencyCode) -> String {
        format!("{}/{}", self.base_url, from)
    }
}

#[async_trait]
impl RateSource for OpenRatesClient {
    fn id(&self) -> &'static str {
        OPEN_RATES_ID
    }

    /// The keyless API has no catalog endpoint
    async fn supported_codes(&self) -> Result<Vec<Currency>, RateError> {
        Ok(fallback_currencies())
    }

    async fn pair_rate(&self, pair: &CurrencyPair) -> Result<f64, RateError> {
        let url = self.latest_url(&pair.from);
        log::debug!("Fetching {} from {}", url, OPEN_RATES_ID);
        let (status, body) = get_text(&self.client, &url).await?;
        parse_latest_response(status, &body, &pair.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    #[test]
    fn test_http_client_builds_with_short_timeout() {
        let client = build_http_client(Duration::from_millis(250));
        assert!(client.get("https://example.invalid/").build().is_ok());
    }

    #[test]
    fn test_parse_codes_success() {
        let body = r#"{
            "result": "success",
            "documentation": "https://www.exchangerate-api.com/docs",
            "supported_codes": [["AED", "UAE Dirham"], ["USD", "United States Dollar"], ["EUR", "Euro"]]
        }"#;

        let currencies = parse_codes_response(StatusCode::OK, body).unwrap();

        assert_eq!(currencies.len(), 3);
        assert_eq!(currencies[1].code.as_str(), "USD");
        assert_eq!(currencies[1].name, "United States Dollar");
    }

    #[test]
    fn test_parse_codes_failure_envelope() {
        let body = r#"{"result": "error", "error-type": "invalid-key"}"#;

        let err = parse_codes_response(StatusCode::FORBIDDEN, body).unwrap_err();

        match err {
            RateError::Api { error_type, .. } => assert_eq!(error_type, "invalid-key"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_pair_success() {
        let body = r#"{
            "result": "success",
            "base_code": "USD",
            "target_code": "EUR",
            "conversion_rate": 0.9213
        }"#;

        assert_eq!(parse_pair_response(StatusCode::OK, body).unwrap(), 0.9213);
    }

    #[test]
    fn test_parse_pair_failures() {
        let failure = r#"{"result": "error", "error-type": "unsupported-code"}"#;
        assert!(parse_pair_response(StatusCode::NOT_FOUND, failure)
            .unwrap_err()
            .is_api_failure());

        let missing = r#"{"result": "success"}"#;
        assert!(matches!(
            parse_pair_response(StatusCode::OK, missing),
            Err(RateError::Malformed { .. })
        ));

        let zero = r#"{"result": "success", "conversion_rate": 0}"#;
        assert!(parse_pair_response(StatusCode::OK, zero).is_err());

        assert!(matches!(
            parse_pair_response(StatusCode::OK, "<html>oops</html>"),
            Err(RateError::Malformed { .. })
        ));
        assert!(matches!(
            parse_pair_response(StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            Err(RateError::Api { .. })
        ));
    }

    #[test]
    fn test_parse_latest() {
        let body = r#"{"base": "USD", "date": "2024-05-01", "rates": {"USD": 1, "EUR": 0.93, "KES": 131.5}}"#;

        assert_eq!(
            parse_latest_response(StatusCode::OK, body, &code("KES")).unwrap(),
            131.5
        );
        assert!(matches!(
            parse_latest_response(StatusCode::OK, body, &code("ZAR")),
            Err(RateError::MissingRate(c)) if c == "ZAR"
        ));
    }

    #[test]
    fn test_urls() {
        let client = ExchangeRateApiClient::new(
            "https://v6.exchangerate-api.com/v6/",
            "KEY".to_string(),
            REQUEST_TIMEOUT,
        );
        let pair: CurrencyPair = "USD-EUR".parse().unwrap();

        assert_eq!(
            client.codes_url(),
            "https://v6.exchangerate-api.com/v6/KEY/codes"
        );
        assert_eq!(
            client.pair_url(&pair),
            "https://v6.exchangerate-api.com/v6/KEY/pair/USD/EUR"
        );

        let open = OpenRatesClient::new("https://api.exchangerate-api.com/v4/latest", REQUEST_TIMEOUT);
        assert_eq!(
            open.latest_url(&code("GBP")),
            "https://api.exchangerate-api.com/v4/latest/GBP"
        );
    }
}
