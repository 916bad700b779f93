//! Currency codes, rate lookups, and rounding shared by the aggregation code.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt, fs,
    path::Path,
};

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::{tmp_path, write_atomic},
    errors::BudgetError,
};

const CACHE_TTL_HOURS: i64 = 24;

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "String")]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

impl From<String> for CurrencyCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for CurrencyCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Boundary to whatever supplies exchange rates and the set of known codes.
///
/// `convert` must return `amount` unchanged when `from == to` and `f64::NAN`
/// when no direct rate is known. It never blocks.
pub trait CurrencyResolver {
    fn convert(&self, amount: f64, from: &CurrencyCode, to: &CurrencyCode) -> f64;
    fn is_valid_currency(&self, code: &str) -> bool;
}

static DEFAULT_SYMBOLS: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("AUD", "Australian Dollar"),
        ("CAD", "Canadian Dollar"),
        ("CHF", "Swiss Franc"),
        ("CNY", "Chinese Renminbi Yuan"),
        ("EUR", "Euro"),
        ("GBP", "British Pound"),
        ("JPY", "Japanese Yen"),
        ("NOK", "Norwegian Krone"),
        ("SEK", "Swedish Krona"),
        ("USD", "United States Dollar"),
    ])
});

/// Rates quoted against one base currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseRates {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
    pub rates: HashMap<String, f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateCache {
    #[serde(default)]
    rates_by_base: HashMap<String, BaseRates>,
    #[serde(default)]
    symbols: BTreeMap<String, String>,
}

/// In-process resolver backed by cached direct rates.
///
/// A lookup for a base with no fresh rates records that base as pending;
/// whoever fetches rates drains [`RateTable::take_pending_bases`] and feeds
/// results back through [`RateTable::insert_rates`]. Later reads see them.
#[derive(Debug)]
pub struct RateTable {
    cache: RefCell<RateCache>,
    pending: RefCell<BTreeSet<CurrencyCode>>,
    ttl: Duration,
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RateTable {
    pub fn new() -> Self {
        Self {
            cache: RefCell::new(RateCache::default()),
            pending: RefCell::new(BTreeSet::new()),
            ttl: Duration::hours(CACHE_TTL_HOURS),
        }
    }

    /// Table seeded with a built-in list of common currency codes.
    pub fn with_default_symbols() -> Self {
        let table = Self::new();
        table.set_symbols(
            DEFAULT_SYMBOLS
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string())),
        );
        table
    }

    pub fn set_symbols<I, K, V>(&self, symbols: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut cache = self.cache.borrow_mut();
        cache.symbols = symbols
            .into_iter()
            .map(|(code, name)| (CurrencyCode::new(code).0, name.into()))
            .collect();
        info!(count = cache.symbols.len(), "Currency list loaded");
    }

    pub fn symbols(&self) -> Vec<CurrencyCode> {
        self.cache
            .borrow()
            .symbols
            .keys()
            .map(|code| CurrencyCode(code.clone()))
            .collect()
    }

    /// Stores freshly fetched rates for `base`, stamped now.
    pub fn insert_rates<I, K>(&self, base: &CurrencyCode, rates: I)
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.insert_rates_at(base, rates, Utc::now());
    }

    pub fn insert_rates_at<I, K>(&self, base: &CurrencyCode, rates: I, fetched_at: DateTime<Utc>)
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let mut quoted: HashMap<String, f64> = rates
            .into_iter()
            .map(|(code, rate)| (CurrencyCode::new(code).0, rate))
            .collect();
        quoted.insert(base.0.clone(), 1.0);
        self.cache.borrow_mut().rates_by_base.insert(
            base.0.clone(),
            BaseRates {
                fetched_at,
                rates: quoted,
            },
        );
        self.pending.borrow_mut().remove(base);
        info!(base = %base, "Exchange rates loaded");
    }

    /// Direct rate from `from` to `to`, if cached. Never derives a cross rate.
    pub fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        self.cache
            .borrow()
            .rates_by_base
            .get(from.as_str())
            .and_then(|base| base.rates.get(to.as_str()))
            .copied()
    }

    pub fn is_cache_valid(&self, base: &CurrencyCode) -> bool {
        self.cache
            .borrow()
            .rates_by_base
            .get(base.as_str())
            .map(|entry| Utc::now() - entry.fetched_at < self.ttl)
            .unwrap_or(false)
    }

    pub fn pending_bases(&self) -> Vec<CurrencyCode> {
        self.pending.borrow().iter().cloned().collect()
    }

    /// Bases that lookups found missing since the last call.
    pub fn take_pending_bases(&self) -> Vec<CurrencyCode> {
        std::mem::take(&mut *self.pending.borrow_mut())
            .into_iter()
            .collect()
    }

    pub fn save_cache(&self, path: &Path) -> Result<(), BudgetError> {
        let json = serde_json::to_string_pretty(&*self.cache.borrow())?;
        let tmp = tmp_path(path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Replaces the cached rates and symbols with the file contents.
    ///
    /// A missing file leaves the table unchanged.
    pub fn load_cache(&self, path: &Path) -> Result<(), BudgetError> {
        if !path.exists() {
            warn!(path = %path.display(), "No FX cache to load");
            return Ok(());
        }
        let data = fs::read_to_string(path)?;
        let cache: RateCache = serde_json::from_str(&data)?;
        *self.cache.borrow_mut() = cache;
        Ok(())
    }
}

impl CurrencyResolver for RateTable {
    fn convert(&self, amount: f64, from: &CurrencyCode, to: &CurrencyCode) -> f64 {
        if from == to {
            return amount;
        }
        if let Some(rate) = self.rate(from, to) {
            return amount * rate;
        }
        if !self.is_cache_valid(from) && self.pending.borrow_mut().insert(from.clone()) {
            debug!(base = %from, "Rate missing, base queued for fetch");
        }
        f64::NAN
    }

    fn is_valid_currency(&self, code: &str) -> bool {
        self.cache
            .borrow()
            .symbols
            .contains_key(CurrencyCode::new(code).as_str())
    }
}

/// Rounds half away from zero at `decimals` places. NaN stays NaN.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(10.126, 2), 10.13);
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn codes_are_normalised() {
        assert_eq!(CurrencyCode::new(" eur ").as_str(), "EUR");
        let parsed: CurrencyCode = serde_json::from_str("\"gbp\"").expect("parse");
        assert_eq!(parsed, CurrencyCode::new("GBP"));
    }
}
