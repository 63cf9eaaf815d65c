// Currency model: codes, pairs and the built-in catalog
//
// A pair is ORDERED: "USD-EUR" and "EUR-USD" are different pairs with
// different rates and different favorites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RateError;

// ============================================================================
// CURRENCY CODE
// ============================================================================

/// ISO-style 3-letter currency code, always upper-case
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: &str) -> Result<Self, RateError> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(CurrencyCode(code.to_ascii_uppercase()))
        } else {
            Err(RateError::InvalidCode(code.to_string()))
        }
    }

    /// Built-in table entries, already upper-case
    pub(crate) fn from_static(code: &'static str) -> Self {
        CurrencyCode(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyCode::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = RateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CurrencyCode::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// Catalog entry: code plus display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    pub code: CurrencyCode,
    pub name: String,
}

impl Currency {
    pub fn new(code: CurrencyCode, name: impl Into<String>) -> Self {
        Currency {
            code,
            name: name.into(),
        }
    }

    /// "USD - US Dollar", the selector label
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.code.to_string()
        } else {
            format!("{} - {}", self.code, self.name)
        }
    }
}

// ============================================================================
// CURRENCY PAIR
// ============================================================================

/// Ordered (from, to) combination, string form "FROM-TO"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

impl CurrencyPair {
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        CurrencyPair { from, to }
    }

    /// Same pair, other direction
    pub fn swapped(&self) -> Self {
        CurrencyPair {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }

    /// Identifier used as the favorites key, e.g. "USD-EUR"
    pub fn id(&self) -> String {
        format!("{}-{}", self.from, self.to)
    }

    /// Human label, e.g. "USD/EUR"
    pub fn label(&self) -> String {
        format!("{}/{}", self.from, self.to)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl FromStr for CurrencyPair {
    type Err = RateError;

    /// Accepts "USD-EUR" and "USD/EUR"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once(|c| c == '-' || c == '/')
            .ok_or_else(|| RateError::InvalidPair(s.to_string()))?;

        let from = CurrencyCode::new(from).map_err(|_| RateError::InvalidPair(s.to_string()))?;
        let to = CurrencyCode::new(to).map_err(|_| RateError::InvalidPair(s.to_string()))?;
        Ok(CurrencyPair { from, to })
    }
}

// ============================================================================
// BUILT-IN CATALOG
// ============================================================================

/// Used when the remote catalog is unavailable or the keyless source is active
pub const FALLBACK_CURRENCIES: &[(&str, &str)] = &[
    ("USD", "US Dollar"),
    ("EUR", "Euro"),
    ("GBP", "Pound Sterling"),
    ("JPY", "Japanese Yen"),
    ("CAD", "Canadian Dollar"),
    ("AUD", "Australian Dollar"),
    ("NGN", "Nigerian Naira"),
    ("KES", "Kenyan Shilling"),
    ("ZAR", "South African Rand"),
];

/// Pairs offered by the history selector
pub const POPULAR_PAIRS: &[(&str, &str)] = &[
    ("USD", "EUR"),
    ("USD", "GBP"),
    ("USD", "JPY"),
    ("EUR", "USD"),
    ("GBP", "USD"),
];

pub const DEFAULT_FROM: &str = "USD";
pub const DEFAULT_TO: &str = "EUR";

pub fn fallback_currencies() -> Vec<Currency> {
    FALLBACK_CURRENCIES
        .iter()
        .map(|(code, name)| Currency::new(CurrencyCode::from_static(code), *name))
        .collect()
}

pub fn popular_pairs() -> Vec<CurrencyPair> {
    POPULAR_PAIRS
        .iter()
        .map(|(from, to)| {
            CurrencyPair::new(CurrencyCode::from_static(from), CurrencyCode::from_static(to))
        })
        .collect()
}
