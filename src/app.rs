// UI Controller - application state and transitions
//
// App owns every piece of UI state. Its methods never touch the network or the
// terminal: they mutate state and hand back Commands, and completed work comes
// back in as Messages through App::update. Each rate/history fetch carries a
// sequence number; only the latest one issued may change the screen.

use crate::chart::{ChartSlot, HistoryChart};
use crate::conversion::{convert, format_amount, parse_amount};
use crate::currency::{
    fallback_currencies, popular_pairs, Currency, CurrencyCode, CurrencyPair, DEFAULT_FROM,
    DEFAULT_TO,
};
use crate::error::RateError;
use crate::favorites::{AddOutcome, Favorite, FavoritesStore};
use crate::history::{HistoricalSeries, PERIOD_CHOICES};
use crate::storage::KeyValueStore;

pub const DUPLICATE_FAVORITE_NOTICE: &str = "This currency pair is already in your favorites.";
pub const CURRENCY_LOAD_NOTICE: &str = "Failed to load currencies. Please try again later.";
pub const HISTORY_ERROR_NOTICE: &str = "Error loading historical data. Please try again later.";
pub const EMPTY_FAVORITES_TEXT: &str =
    "You have no favorites yet. Add some currency pairs to track them here.";

// ============================================================================
// COMMANDS & MESSAGES
// ============================================================================

/// Work the controller wants done off the UI thread
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadCurrencies,
    FetchRate { seq: u64, pair: CurrencyPair },
    FetchHistory { seq: u64, pair: CurrencyPair, days: u32 },
}

/// Completed work coming back
#[derive(Debug)]
pub enum Message {
    CurrenciesLoaded(Result<Vec<Currency>, RateError>),
    RateFetched {
        seq: u64,
        pair: CurrencyPair,
        result: Result<f64, RateError>,
    },
    HistoryLoaded {
        seq: u64,
        result: Result<HistoricalSeries, RateError>,
    },
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateStatus {
    Idle,
    Loading,
    Displayed(f64),
    Error,
}

impl RateStatus {
    pub fn rate(&self) -> Option<f64> {
        match self {
            RateStatus::Displayed(rate) => Some(*rate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryStatus {
    Idle,
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    From,
    To,
    Amount,
    Favorites,
    HistoryPair,
    HistoryPeriod,
}

impl Focus {
    pub fn next(&self) -> Self {
        match self {
            Focus::From => Focus::To,
            Focus::To => Focus::Amount,
            Focus::Amount => Focus::Favorites,
            Focus::Favorites => Focus::HistoryPair,
            Focus::HistoryPair => Focus::HistoryPeriod,
            Focus::HistoryPeriod => Focus::From,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Focus::From => Focus::HistoryPeriod,
            Focus::To => Focus::From,
            Focus::Amount => Focus::To,
            Focus::Favorites => Focus::Amount,
            Focus::HistoryPair => Focus::Favorites,
            Focus::HistoryPeriod => Focus::HistoryPair,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Notice {
            level,
            text: text.into(),
        }
    }
}

pub struct App<S: KeyValueStore> {
    pub currencies: Vec<Currency>,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub amount: String,
    pub result: String,
    pub rate: RateStatus,
    pub favorites: FavoritesStore<S>,
    pub selected_favorite: Option<usize>,
    pub history_pairs: Vec<CurrencyPair>,
    pub history_pair_index: usize,
    pub period_index: usize,
    pub history: HistoryStatus,
    pub chart: ChartSlot,
    pub focus: Focus,
    pub notice: Option<Notice>,
    pub should_quit: bool,
    rate_seq: u64,
    history_seq: u64,
}

impl<S: KeyValueStore> App<S> {
    /// `warning` is the startup configuration warning, shown until replaced
    pub fn new(favorites: FavoritesStore<S>, warning: Option<&str>) -> Self {
        let currencies = fallback_currencies();
        let (from, to) = default_selection(&currencies);
        let selected_favorite = if favorites.is_empty() { None } else { Some(0) };

        App {
            currencies,
            from,
            to,
            amount: String::new(),
            result: String::new(),
            rate: RateStatus::Idle,
            favorites,
            selected_favorite,
            history_pairs: popular_pairs(),
            history_pair_index: 0,
            period_index: 0,
            history: HistoryStatus::Idle,
            chart: ChartSlot::default(),
            focus: Focus::Amount,
            notice: warning.map(|text| Notice::new(NoticeLevel::Warning, text)),
            should_quit: false,
            rate_seq: 0,
            history_seq: 0,
        }
    }

    pub fn start(&mut self) -> Vec<Command> {
        vec![Command::LoadCurrencies]
    }

    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.from.clone(), self.to.clone())
    }

    pub fn history_pair(&self) -> &CurrencyPair {
        &self.history_pairs[self.history_pair_index]
    }

    pub fn history_days(&self) -> u32 {
        PERIOD_CHOICES[self.period_index]
    }

    /// Right-hand side of the rate line: "0.9213 EUR", "Loading...", "Error"
    pub fn rate_value_text(&self) -> String {
        match self.rate {
            RateStatus::Idle => "-".to_string(),
            RateStatus::Loading => "Loading...".to_string(),
            RateStatus::Displayed(rate) => format!("{} {}", rate, self.to),
            RateStatus::Error => "Error".to_string(),
        }
    }

    pub fn rate_info_text(&self) -> String {
        format!("1 {} = ", self.from)
    }

    // ========================================================================
    // MESSAGES
    // ========================================================================

    pub fn update(&mut self, message: Message) -> Vec<Command> {
        match message {
            Message::CurrenciesLoaded(Ok(currencies)) => {
                if !currencies.is_empty() {
                    self.currencies = currencies;
                }
                let (from, to) = default_selection(&self.currencies);
                self.from = from;
                self.to = to;
                vec![self.fetch_rate()]
            }
            Message::CurrenciesLoaded(Err(e)) => {
                log::error!("Error loading currencies: {}", e);
                self.notice = Some(Notice::new(NoticeLevel::Error, CURRENCY_LOAD_NOTICE));
                vec![self.fetch_rate()]
            }
            Message::RateFetched { seq, pair, result } => {
                if seq != self.rate_seq {
                    log::debug!("Dropping stale rate for {} (seq {} < {})", pair, seq, self.rate_seq);
                    return Vec::new();
                }
                match result {
                    Ok(rate) => {
                        self.rate = RateStatus::Displayed(rate);
                        if !self.amount.is_empty() {
                            self.recompute(rate);
                        }
                    }
                    Err(e) => {
                        log::warn!("Error getting exchange rate for {}: {}", pair, e);
                        self.rate = RateStatus::Error;
                    }
                }
                Vec::new()
            }
            Message::HistoryLoaded { seq, result } => {
                if seq != self.history_seq {
                    log::debug!("Dropping stale history (seq {} < {})", seq, self.history_seq);
                    return Vec::new();
                }
                match result {
                    Ok(series) => {
                        self.chart.attach(HistoryChart::from_series(&series));
                        self.history = HistoryStatus::Ready;
                    }
                    Err(e) => {
                        log::warn!("Error fetching historical data: {}", e);
                        self.chart.dispose();
                        self.history = HistoryStatus::Error(HISTORY_ERROR_NOTICE.to_string());
                    }
                }
                Vec::new()
            }
        }
    }

    // ========================================================================
    // CONVERTER
    // ========================================================================

    /// Enter Loading for the current pair and ask for its rate
    pub fn fetch_rate(&mut self) -> Command {
        self.rate_seq += 1;
        self.rate = RateStatus::Loading;
        Command::FetchRate {
            seq: self.rate_seq,
            pair: self.pair(),
        }
    }

    /// Convert button
    pub fn convert(&mut self) -> Command {
        self.fetch_rate()
    }

    pub fn select_from(&mut self, code: CurrencyCode) -> Command {
        self.from = code;
        self.fetch_rate()
    }

    pub fn select_to(&mut self, code: CurrencyCode) -> Command {
        self.to = code;
        self.fetch_rate()
    }

    pub fn cycle_from(&mut self, delta: isize) -> Option<Command> {
        let code = cycle_code(&self.currencies, &self.from, delta)?;
        Some(self.select_from(code))
    }

    pub fn cycle_to(&mut self, delta: isize) -> Option<Command> {
        let code = cycle_code(&self.currencies, &self.to, delta)?;
        Some(self.select_to(code))
    }

    /// New amount text. With a rate on screen the result is recomputed in
    /// place; without one, a fetch is started and the result follows it.
    pub fn edit_amount(&mut self, text: String) -> Option<Command> {
        self.amount = text;
        match self.rate {
            RateStatus::Displayed(rate) => {
                self.recompute(rate);
                None
            }
            RateStatus::Loading => None,
            RateStatus::Idle | RateStatus::Error => Some(self.fetch_rate()),
        }
    }

    pub fn push_amount_char(&mut self, c: char) -> Option<Command> {
        if !(c.is_ascii_digit() || c == '.') {
            return None;
        }
        let mut text = self.amount.clone();
        text.push(c);
        self.edit_amount(text)
    }

    pub fn pop_amount_char(&mut self) -> Option<Command> {
        let mut text = self.amount.clone();
        text.pop()?;
        self.edit_amount(text)
    }

    /// Invalid amounts leave the previous result alone
    fn recompute(&mut self, rate: f64) {
        if let Some(amount) = parse_amount(&self.amount) {
            self.result = format_amount(convert(amount, rate));
        }
    }

    /// Exchange from/to; a shown result becomes the new amount
    pub fn swap(&mut self) -> Command {
        std::mem::swap(&mut self.from, &mut self.to);

        if !self.amount.is_empty() && !self.result.is_empty() {
            self.amount = std::mem::take(&mut self.result);
        }

        self.fetch_rate()
    }

    // ========================================================================
    // FAVORITES
    // ========================================================================

    pub fn add_favorite(&mut self) {
        let pair = self.pair();
        let favorite = Favorite::new(&pair, self.rate.rate());

        self.notice = Some(match self.favorites.add(favorite) {
            Ok(AddOutcome::Added) => {
                if self.selected_favorite.is_none() {
                    self.selected_favorite = Some(0);
                }
                Notice::new(NoticeLevel::Info, format!("★ Added {} to favorites", pair.label()))
            }
            Ok(AddOutcome::AlreadyExists) => {
                Notice::new(NoticeLevel::Warning, DUPLICATE_FAVORITE_NOTICE)
            }
            Err(e) => {
                log::error!("Failed to save favorites: {:#}", e);
                Notice::new(NoticeLevel::Error, "Failed to save favorites.")
            }
        });
    }

    pub fn remove_favorite(&mut self, pair_id: &str) {
        if let Err(e) = self.favorites.remove(pair_id) {
            log::error!("Failed to save favorites: {:#}", e);
            self.notice = Some(Notice::new(NoticeLevel::Error, "Failed to save favorites."));
        }
        self.clamp_favorite_selection();
    }

    pub fn remove_selected_favorite(&mut self) {
        let pair_id = self
            .selected_favorite
            .and_then(|i| self.favorites.list().get(i))
            .map(|fav| fav.pair.clone());

        if let Some(pair_id) = pair_id {
            self.remove_favorite(&pair_id);
        }
    }

    /// Click-to-load: select the favorite's pair and fetch it
    pub fn load_favorite(&mut self, index: usize) -> Option<Command> {
        let pair = self.favorites.list().get(index)?.currency_pair();
        self.from = pair.from;
        self.to = pair.to;
        Some(self.fetch_rate())
    }

    pub fn load_selected_favorite(&mut self) -> Option<Command> {
        let index = self.selected_favorite?;
        self.load_favorite(index)
    }

    pub fn cycle_favorite(&mut self, delta: isize) {
        let len = self.favorites.len();
        if len == 0 {
            self.selected_favorite = None;
            return;
        }
        let current = self.selected_favorite.unwrap_or(0);
        self.selected_favorite = Some(wrap_index(current, len, delta));
    }

    fn clamp_favorite_selection(&mut self) {
        let len = self.favorites.len();
        self.selected_favorite = match (len, self.selected_favorite) {
            (0, _) => None,
            (_, Some(i)) if i >= len => Some(len - 1),
            (_, Some(i)) => Some(i),
            (_, None) => Some(0),
        };
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    pub fn fetch_history(&mut self) -> Command {
        self.history_seq += 1;
        self.history = HistoryStatus::Loading;
        Command::FetchHistory {
            seq: self.history_seq,
            pair: self.history_pair().clone(),
            days: self.history_days(),
        }
    }

    pub fn cycle_history_pair(&mut self, delta: isize) {
        self.history_pair_index =
            wrap_index(self.history_pair_index, self.history_pairs.len(), delta);
    }

    pub fn cycle_period(&mut self, delta: isize) {
        self.period_index = wrap_index(self.period_index, PERIOD_CHOICES.len(), delta);
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn previous_focus(&mut self) {
        self.focus = self.focus.previous();
    }

    /// Up/Down in whatever is focused
    pub fn move_selection(&mut self, delta: isize) -> Option<Command> {
        match self.focus {
            Focus::From => self.cycle_from(delta),
            Focus::To => self.cycle_to(delta),
            Focus::Amount => None,
            Focus::Favorites => {
                self.cycle_favorite(delta);
                None
            }
            Focus::HistoryPair => {
                self.cycle_history_pair(delta);
                None
            }
            Focus::HistoryPeriod => {
                self.cycle_period(delta);
                None
            }
        }
    }

    /// Enter: load favorite, fetch history or convert, by focus
    pub fn activate(&mut self) -> Option<Command> {
        match self.focus {
            Focus::Favorites => self.load_selected_favorite(),
            Focus::HistoryPair | Focus::HistoryPeriod => Some(self.fetch_history()),
            Focus::From | Focus::To | Focus::Amount => Some(self.convert()),
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

/// USD/EUR when the catalog has them, otherwise its first two entries
fn default_selection(currencies: &[Currency]) -> (CurrencyCode, CurrencyCode) {
    let pick = |wanted: &'static str, fallback: usize| {
        currencies
            .iter()
            .find(|c| c.code.as_str() == wanted)
            .or_else(|| currencies.get(fallback))
            .map(|c| c.code.clone())
            .unwrap_or_else(|| CurrencyCode::from_static(wanted))
    };
    (pick(DEFAULT_FROM, 0), pick(DEFAULT_TO, 1))
}

fn cycle_code(currencies: &[Currency], current: &CurrencyCode, delta: isize) -> Option<CurrencyCode> {
    if currencies.is_empty() {
        return None;
    }
    let index = currencies
        .iter()
        .position(|c| &c.code == current)
        .map(|i| wrap_index(i, currencies.len(), delta))
        .unwrap_or(0);
    Some(currencies[index].code.clone())
}

fn wrap_index(current: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + delta).rem_euclid(len as isize) as usize
}
