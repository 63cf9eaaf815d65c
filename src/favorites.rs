// Favorites Store
//
// The store is the ONLY owner of the favorites list. Every mutation writes the
// whole list back under FAVORITES_KEY; loading reads the whole list.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::currency::{CurrencyCode, CurrencyPair};
use crate::storage::KeyValueStore;

/// Fixed storage key for the serialized list
pub const FAVORITES_KEY: &str = "currencyFavorites";

/// A saved pair with the rate that was displayed when it was saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub pair: String,
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    /// None when no rate was on screen at save time
    #[serde(default)]
    pub rate: Option<f64>,
}

impl Favorite {
    pub fn new(pair: &CurrencyPair, rate: Option<f64>) -> Self {
        Favorite {
            pair: pair.id(),
            from_currency: pair.from.clone(),
            to_currency: pair.to.clone(),
            rate,
        }
    }

    pub fn currency_pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.from_currency.clone(), self.to_currency.clone())
    }

    /// "Rate: 0.9213", or "Rate: -" without a snapshot
    pub fn rate_label(&self) -> String {
        match self.rate {
            Some(rate) => format!("Rate: {}", rate),
            None => "Rate: -".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyExists,
}

pub struct FavoritesStore<S: KeyValueStore> {
    store: S,
    favorites: Vec<Favorite>,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    /// Load the persisted list. A blob that does not decode is logged and
    /// treated as empty; it gets replaced on the next mutation.
    pub fn load(store: S) -> Result<Self> {
        let favorites = match store.get(FAVORITES_KEY)? {
            Some(blob) => match serde_json::from_str::<Vec<Favorite>>(&blob) {
                Ok(list) => list,
                Err(e) => {
                    log::warn!("Ignoring unreadable favorites blob: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        log::debug!("Loaded {} favorites", favorites.len());
        Ok(FavoritesStore { store, favorites })
    }

    /// Insertion order
    pub fn list(&self) -> &[Favorite] {
        &self.favorites
    }

    pub fn len(&self) -> usize {
        self.favorites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.favorites.is_empty()
    }

    pub fn contains(&self, pair_id: &str) -> bool {
        self.favorites.iter().any(|fav| fav.pair == pair_id)
    }

    pub fn add(&mut self, favorite: Favorite) -> Result<AddOutcome> {
        if self.contains(&favorite.pair) {
            return Ok(AddOutcome::AlreadyExists);
        }

        log::info!("Adding favorite {}", favorite.pair);
        let previous = self.favorites.clone();
        self.favorites.push(favorite);
        self.commit(previous)?;
        Ok(AddOutcome::Added)
    }

    /// Remove every favorite with this pair id; returns how many went away
    pub fn remove(&mut self, pair_id: &str) -> Result<usize> {
        let previous = self.favorites.clone();
        self.favorites.retain(|fav| fav.pair != pair_id);
        let removed = previous.len() - self.favorites.len();

        self.commit(previous)?;
        if removed > 0 {
            log::info!("Removed favorite {}", pair_id);
        }
        Ok(removed)
    }

    /// Persist the current list; on failure the list goes back to `previous`
    fn commit(&mut self, previous: Vec<Favorite>) -> Result<()> {
        if let Err(e) = self.save() {
            log::warn!("Failed to save favorites: {:#}", e);
            self.favorites = previous;
            return Err(e);
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let blob =
            serde_json::to_string(&self.favorites).context("Failed to serialize favorites")?;
        self.store.set(FAVORITES_KEY, &blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    fn pair(s: &str) -> CurrencyPair {
        s.parse().unwrap()
    }

    /// In-memory store whose writes can be switched off
    #[derive(Default)]
    struct SwitchableStore {
        values: RefCell<HashMap<String, String>>,
        read_only: Cell<bool>,
    }

    impl KeyValueStore for &SwitchableStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.values.borrow().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.read_only.get() {
                anyhow::bail!("disk is read-only");
            }
            self.values
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_leaves_list_unchanged() {
        let backing = SwitchableStore::default();
        let mut favorites = FavoritesStore::load(&backing).unwrap();
        favorites.add(Favorite::new(&pair("USD-GBP"), Some(0.79))).unwrap();

        backing.read_only.set(true);
        assert!(favorites.add(Favorite::new(&pair("USD-EUR"), Some(0.92))).is_err());
        assert_eq!(favorites.len(), 1);
        assert!(!favorites.contains("USD-EUR"));
        assert!(favorites.remove("USD-GBP").is_err());
        assert!(favorites.contains("USD-GBP"));

        backing.read_only.set(false);
        let outcome = favorites.add(Favorite::new(&pair("USD-EUR"), Some(0.92))).unwrap();
        assert_eq!(outcome, AddOutcome::Added);

        let reloaded = FavoritesStore::load(&backing).unwrap();
        let pairs: Vec<&str> = reloaded.list().iter().map(|f| f.pair.as_str()).collect();
        assert_eq!(pairs, vec!["USD-GBP", "USD-EUR"]);
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let mut favorites = FavoritesStore::load(SqliteStore::in_memory().unwrap()).unwrap();

        let first = favorites
            .add(Favorite::new(&pair("USD-EUR"), Some(0.92)))
            .unwrap();
        let second = favorites
            .add(Favorite::new(&pair("USD-EUR"), Some(0.95)))
            .unwrap();

        assert_eq!(first, AddOutcome::Added);
        assert_eq!(second, AddOutcome::AlreadyExists);
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites.list()[0].rate, Some(0.92));
    }

    #[test]
    fn test_reverse_pair_is_distinct() {
        let mut favorites = FavoritesStore::load(SqliteStore::in_memory().unwrap()).unwrap();

        favorites.add(Favorite::new(&pair("USD-EUR"), None)).unwrap();
        let outcome = favorites.add(Favorite::new(&pair("EUR-USD"), None)).unwrap();

        assert_eq!(outcome, AddOutcome::Added);
        assert_eq!(favorites.len(), 2);
    }

    #[test]
    fn test_remove_absent_pair_is_noop() {
        let mut favorites = FavoritesStore::load(SqliteStore::in_memory().unwrap()).unwrap();
        favorites.add(Favorite::new(&pair("USD-GBP"), Some(0.79))).unwrap();

        let removed = favorites.remove("USD-JPY").unwrap();

        assert_eq!(removed, 0);
        assert_eq!(favorites.len(), 1);
        assert!(favorites.contains("USD-GBP"));
    }

    #[test]
    fn test_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.db");

        {
            let mut favorites = FavoritesStore::load(SqliteStore::open(&path).unwrap()).unwrap();
            favorites.add(Favorite::new(&pair("USD-EUR"), Some(0.92))).unwrap();
            favorites.add(Favorite::new(&pair("GBP-USD"), Some(1.27))).unwrap();
            favorites.add(Favorite::new(&pair("USD-JPY"), None)).unwrap();
            favorites.remove("GBP-USD").unwrap();
        }

        let reloaded = FavoritesStore::load(SqliteStore::open(&path).unwrap()).unwrap();
        let ids: Vec<&str> = reloaded.list().iter().map(|f| f.pair.as_str()).collect();

        assert_eq!(ids, vec!["USD-EUR", "USD-JPY"]);
        assert_eq!(reloaded.list()[0].rate, Some(0.92));
        assert_eq!(reloaded.list()[1].rate, None);
    }

    #[test]
    fn test_blob_uses_camel_case_records() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .set(
                FAVORITES_KEY,
                r#"[{"pair":"USD-EUR","fromCurrency":"USD","toCurrency":"EUR","rate":0.9213}]"#,
            )
            .unwrap();

        let favorites = FavoritesStore::load(store).unwrap();

        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites.list()[0].currency_pair().id(), "USD-EUR");
        assert_eq!(favorites.list()[0].rate_label(), "Rate: 0.9213");
    }

    #[test]
    fn test_corrupt_blob_loads_empty() {
        let store = SqliteStore::in_memory().unwrap();
        store.set(FAVORITES_KEY, "{not json").unwrap();

        let mut favorites = FavoritesStore::load(store).unwrap();
        assert!(favorites.is_empty());

        favorites.add(Favorite::new(&pair("USD-EUR"), None)).unwrap();
        assert_eq!(favorites.len(), 1);
    }
}
