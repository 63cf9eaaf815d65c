// Currency Widget - Core Library
// Exposes the controller and its services for the terminal UI, the CLI and tests

pub mod app;
pub mod chart;
pub mod client;
pub mod config;
pub mod conversion;
pub mod currency;
pub mod error;
pub mod favorites;
pub mod history;
pub mod runtime;
pub mod storage;

// Only compile the terminal front end when the TUI feature is enabled
#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use app::{App, Command, Focus, HistoryStatus, Message, Notice, NoticeLevel, RateStatus};
pub use chart::{ChartSlot, HistoryChart};
pub use client::{ExchangeRateApiClient, OpenRatesClient, RateSource};
pub use config::Config;
pub use conversion::{convert, format_amount, parse_amount};
pub use currency::{Currency, CurrencyCode, CurrencyPair};
pub use error::RateError;
pub use favorites::{AddOutcome, Favorite, FavoritesStore, FAVORITES_KEY};
pub use history::{
    simulate_series, HistoricalSeries, HistoryPoint, HistorySource, HistoryStrategy,
    SimulatedHistory, TimeseriesClient,
};
pub use runtime::{dispatch, execute, Services};
pub use storage::{KeyValueStore, SqliteStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
