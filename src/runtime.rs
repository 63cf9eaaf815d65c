// Command execution
//
// Turns the controller's Commands into network calls and their results into
// Messages. `execute` does one command and returns its message; `dispatch`
// runs it on the tokio runtime and posts the message to the UI channel.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;

use crate::app::{Command, Message};
use crate::client::{ExchangeRateApiClient, OpenRatesClient, RateSource};
use crate::config::Config;
use crate::history::{HistorySource, HistoryStrategy, SimulatedHistory, TimeseriesClient};

/// The network collaborators, shared by every spawned task
#[derive(Clone)]
pub struct Services {
    pub rates: Arc<dyn RateSource>,
    pub history: Arc<dyn HistorySource>,
}

impl Services {
    pub fn new(rates: Arc<dyn RateSource>, history: Arc<dyn HistorySource>) -> Self {
        Services { rates, history }
    }

    /// Keyed source when an API key is configured, keyless otherwise;
    /// history strategy exactly as configured.
    pub fn from_config(config: &Config) -> Self {
        let rates: Arc<dyn RateSource> = match &config.api_key {
            Some(key) => Arc::new(ExchangeRateApiClient::new(
                &config.api_base_url,
                key.clone(),
                config.request_timeout,
            )),
            None => Arc::new(OpenRatesClient::new(
                &config.open_rates_url,
                config.request_timeout,
            )),
        };

        let history: Arc<dyn HistorySource> = match config.history_strategy {
            HistoryStrategy::Simulated => Arc::new(SimulatedHistory::new(rates.clone())),
            HistoryStrategy::Queried => Arc::new(TimeseriesClient::new(
                &config.timeseries_url,
                config.history_access_key.clone(),
                config.request_timeout,
            )),
        };

        log::info!(
            "Using rate source {} with {} history",
            rates.id(),
            history.strategy()
        );
        Services { rates, history }
    }
}

pub async fn execute(services: &Services, command: Command) -> Message {
    match command {
        Command::LoadCurrencies => Message::CurrenciesLoaded(services.rates.supported_codes().await),
        Command::FetchRate { seq, pair } => {
            let result = services.rates.pair_rate(&pair).await;
            Message::RateFetched { seq, pair, result }
        }
        Command::FetchHistory { seq, pair, days } => {
            let result = services.history.series(&pair, days).await;
            Message::HistoryLoaded { seq, result }
        }
    }
}

/// Fire and forget; a closed channel just means the UI is gone
pub fn dispatch(
    handle: &Handle,
    services: &Services,
    sender: &UnboundedSender<Message>,
    command: Command,
) {
    let services = services.clone();
    let sender = sender.clone();
    handle.spawn(async move {
        let message = execute(&services, command).await;
        if sender.send(message).is_err() {
            log::debug!("UI closed before a result arrived");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::{fallback_currencies, Currency, CurrencyPair};
    use crate::error::RateError;
    use async_trait::async_trait;
    use tokio::sync::mpsc::unbounded_channel;

    struct Fixed;

    #[async_trait]
    impl RateSource for Fixed {
        fn id(&self) -> &'static str {
            "FIXED"
        }

        async fn supported_codes(&self) -> Result<Vec<Currency>, RateError> {
            Ok(fallback_currencies())
        }

        async fn pair_rate(&self, _pair: &CurrencyPair) -> Result<f64, RateError> {
            Ok(1.5)
        }
    }

    fn services() -> Services {
        let rates: Arc<dyn RateSource> = Arc::new(Fixed);
        Services::new(rates.clone(), Arc::new(SimulatedHistory::new(rates)))
    }

    #[tokio::test]
    async fn test_execute_maps_commands() {
        let services = services();
        let pair: CurrencyPair = "USD-EUR".parse().unwrap();

        match execute(&services, Command::FetchRate { seq: 4, pair: pair.clone() }).await {
            Message::RateFetched { seq, result, .. } => {
                assert_eq!(seq, 4);
                assert_eq!(result.unwrap(), 1.5);
            }
            other => panic!("unexpected message {:?}", other),
        }

        match execute(&services, Command::FetchHistory { seq: 2, pair, days: 7 }).await {
            Message::HistoryLoaded { seq, result } => {
                assert_eq!(seq, 2);
                assert_eq!(result.unwrap().len(), 8);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_posts_to_channel() {
        let (tx, mut rx) = unbounded_channel();

        dispatch(&Handle::current(), &services(), &tx, Command::LoadCurrencies);

        match rx.recv().await {
            Some(Message::CurrenciesLoaded(Ok(list))) => assert_eq!(list.len(), 9),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_from_config_picks_sources() {
        let keyless = Config::from_lookup(|_| None).unwrap();
        let services = Services::from_config(&keyless);
        assert_eq!(services.rates.id(), "OPEN_RATES");
        assert_eq!(services.history.strategy(), HistoryStrategy::Simulated);

        let keyed = Config::from_lookup(|name| match name {
            "EXCHANGE_RATE_API_KEY" => Some("k".to_string()),
            "FX_HISTORY_SOURCE" => Some("queried".to_string()),
            _ => None,
        })
        .unwrap();
        let services = Services::from_config(&keyed);
        assert_eq!(services.rates.id(), "EXCHANGE_RATE_API");
        assert_eq!(services.history.strategy(), HistoryStrategy::Queried);
    }
}
