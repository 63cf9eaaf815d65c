// History Renderer - data side
//
// Two ways to get a series for a pair:
//   SimulatedHistory  - one live rate plus a +/-5% random walk around it.
//                       The data is FAKE and is tagged as such so the chart
//                       can say so.
//   TimeseriesClient  - real per-day rates from the timeseries endpoint.
//
// Which one runs is decided by configuration, never by call order.

use async_trait::async_trait;
use chrono::{Datelike, Duration, Local, NaiveDate};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::client::{build_http_client, RateSource};
use crate::currency::CurrencyPair;
use crate::error::{validate_rate, RateError};

pub const TIMESERIES_ID: &str = "TIMESERIES";

/// Maximum relative deviation of a simulated point from the base rate
pub const SIMULATED_SPREAD: f64 = 0.05;

/// Periods offered by the history selector (days)
pub const PERIOD_CHOICES: &[u32] = &[7, 30, 90, 180, 365];

/// Longest period any caller may ask for (days)
pub const MAX_HISTORY_DAYS: u32 = 3650;

// ============================================================================
// SERIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStrategy {
    Simulated,
    Queried,
}

impl fmt::Display for HistoryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryStrategy::Simulated => f.write_str("simulated"),
            HistoryStrategy::Queried => f.write_str("queried"),
        }
    }
}

impl FromStr for HistoryStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "simulate" | "fake" => Ok(HistoryStrategy::Simulated),
            "queried" | "query" | "timeseries" => Ok(HistoryStrategy::Queried),
            other => Err(format!(
                "unknown history source '{}' (expected 'simulated' or 'queried')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    /// "month/day", no zero padding
    pub label: String,
    pub rate: f64,
}

/// Ordered (oldest first) rates for one pair. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSeries {
    pub pair: CurrencyPair,
    pub source: HistoryStrategy,
    pub points: Vec<HistoryPoint>,
}

impl HistoricalSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_simulated(&self) -> bool {
        self.source == HistoryStrategy::Simulated
    }

    /// (min, max) rate, None for an empty series
    pub fn bounds(&self) -> Option<(f64, f64)> {
        let mut iter = self.points.iter().map(|p| p.rate);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), r| (lo.min(r), hi.max(r))))
    }

    pub fn title(&self) -> String {
        match self.source {
            HistoryStrategy::Simulated => {
                format!("Historical {} Exchange Rates (simulated)", self.pair.label())
            }
            HistoryStrategy::Queried => format!("Historical {} Exchange Rates", self.pair.label()),
        }
    }
}

pub fn date_label(date: NaiveDate) -> String {
    format!("{}/{}", date.month(), date.day())
}

/// First day of a `days`-long window ending at `today`
pub fn period_start(today: NaiveDate, days: u32) -> Result<NaiveDate, RateError> {
    if days > MAX_HISTORY_DAYS {
        return Err(RateError::InvalidPeriod(days));
    }
    today
        .checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or(RateError::InvalidPeriod(days))
}

/// Fabricate `days + 1` points ending at `today`, each `base * (1 + u)` with
/// `u` uniform in [-0.05, 0.05).
pub fn simulate_series<R: Rng + ?Sized>(
    pair: &CurrencyPair,
    base_rate: f64,
    days: u32,
    today: NaiveDate,
    rng: &mut R,
) -> Result<HistoricalSeries, RateError> {
    let start = period_start(today, days)?;
    let points = (0..=days)
        .map(|offset| {
            let date = start + Duration::days(i64::from(offset));
            let variation = rng.gen_range(-SIMULATED_SPREAD..SIMULATED_SPREAD);
            HistoryPoint {
                date,
                label: date_label(date),
                rate: base_rate * (1.0 + variation),
            }
        })
        .collect();

    Ok(HistoricalSeries {
        pair: pair.clone(),
        source: HistoryStrategy::Simulated,
        points,
    })
}

// ============================================================================
// SOURCES
// ============================================================================

#[async_trait]
pub trait HistorySource: Send + Sync {
    fn strategy(&self) -> HistoryStrategy;

    async fn series(&self, pair: &CurrencyPair, days: u32) -> Result<HistoricalSeries, RateError>;
}

/// Random walk around the live rate
pub struct SimulatedHistory {
    rates: Arc<dyn RateSource>,
}

impl SimulatedHistory {
    pub fn new(rates: Arc<dyn RateSource>) -> Self {
        SimulatedHistory { rates }
    }
}

#[async_trait]
impl HistorySource for SimulatedHistory {
    fn strategy(&self) -> HistoryStrategy {
        HistoryStrategy::Simulated
    }

    async fn series(&self, pair: &CurrencyPair, days: u32) -> Result<HistoricalSeries, RateError> {
        let base_rate = self.rates.pair_rate(pair).await?;
        let today = Local::now().date_naive();
        let mut rng = rand::thread_rng();
        simulate_series(pair, base_rate, days, today, &mut rng)
    }
}

#[derive(Debug, Deserialize)]
struct TimeseriesResponse {
    success: Option<bool>,
    rates: Option<BTreeMap<String, HashMap<String, f64>>>,
}

/// Dates come back as ISO keys; BTreeMap keeps them in ascending order
pub(crate) fn parse_timeseries(
    pair: &CurrencyPair,
    body: &str,
) -> Result<HistoricalSeries, RateError> {
    let response: TimeseriesResponse = serde_json::from_str(body)
        .map_err(|e| RateError::malformed(TIMESERIES_ID, e.to_string()))?;

    if response.success == Some(false) {
        return Err(RateError::MissingData);
    }
    let rates = response.rates.ok_or(RateError::MissingData)?;

    let mut points = Vec::with_capacity(rates.len());
    for (day, symbols) in rates {
        let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
            .map_err(|e| RateError::malformed(TIMESERIES_ID, format!("bad date '{}': {}", day, e)))?;
        let rate = match symbols.get(pair.to.as_str()) {
            Some(rate) => validate_rate(TIMESERIES_ID, *rate)?,
            None => {
                log::warn!("No {} rate for {}, skipping day", pair.to, day);
                continue;
            }
        };
        points.push(HistoryPoint {
            date,
            label: date_label(date),
            rate,
        });
    }

    if points.is_empty() {
        return Err(RateError::MissingData);
    }

    Ok(HistoricalSeries {
        pair: pair.clone(),
        source: HistoryStrategy::Queried,
        points,
    })
}

/// Real series from `https://api.exchangerate.host/timeseries`
pub struct TimeseriesClient {
    client: Client,
    url: String,
    access_key: Option<String>,
}

impl TimeseriesClient {
    pub fn new(url: &str, access_key: Option<String>, timeout: std::time::Duration) -> Self {
        TimeseriesClient {
            client: build_http_client(timeout),
            url: url.to_string(),
            access_key,
        }
    }

    fn query(
        &self,
        pair: &CurrencyPair,
        days: u32,
        today: NaiveDate,
    ) -> Result<Vec<(&'static str, String)>, RateError> {
        let start = period_start(today, days)?;
        let mut query = vec![
            ("start_date", start.format("%Y-%m-%d").to_string()),
            ("end_date", today.format("%Y-%m-%d").to_string()),
            ("base", pair.from.to_string()),
            ("symbols", pair.to.to_string()),
        ];
        if let Some(key) = &self.access_key {
            query.push(("access_key", key.clone()));
        }
        Ok(query)
    }
}

#[async_trait]
impl HistorySource for TimeseriesClient {
    fn strategy(&self) -> HistoryStrategy {
        HistoryStrategy::Queried
    }

    async fn series(&self, pair: &CurrencyPair, days: u32) -> Result<HistoricalSeries, RateError> {
        let today = Local::now().date_naive();
        log::debug!("Fetching {} days of {} history", days, pair);

        let query = self.query(pair, days, today)?;
        let body = self
            .client
            .get(&self.url)
            .query(&query)
            .send()
            .await?
            .text()
            .await?;
        parse_timeseries(pair, &body)
    }
}
