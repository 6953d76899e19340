// src/screener.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, SearchCache};
use crate::core::engine::ScreeningEngine;
use crate::core::ngram::{InvalidNgramLength, DEFAULT_NGRAM_LEN};
use crate::core::types::{CancelToken, SearchOptions};

/// One row of the watch-list source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistRecord {
    pub id: i32,
    pub full_name: String,
    pub birthday: Option<NaiveDate>,
}

/// The source-of-truth boundary: hands back the full current watch-list,
/// once per refresh cycle.
pub trait WatchlistProvider {
    fn get_all_records(&self) -> Result<Vec<WatchlistRecord>, Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Error)]
pub enum RefreshError {
    /// The provider failed; the previously published catalog stays live.
    #[error("watch-list source unavailable: {0}")]
    SourceUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Counters for one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub loaded: usize,
    pub rejected: usize,
}

/// One entry of a search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub person_id: i32,
    pub full_name: String,
    pub birthday: Option<NaiveDate>,
    pub avg_coefficient: f64,
}

/// Thread-safe front door around the matching engine: serializes catalog
/// refresh against in-flight searches by building a fresh engine off to the
/// side and publishing it atomically, consults the response cache, and emits
/// the observability events.
pub struct Screener {
    engine: RwLock<Arc<ScreeningEngine>>,
    cache: SearchCache,
    ngram_length: usize,
}

impl Screener {
    pub fn new() -> Self {
        Self::with_ngram_length(DEFAULT_NGRAM_LEN).expect("default n-gram length is valid")
    }

    pub fn with_ngram_length(n: usize) -> Result<Self, InvalidNgramLength> {
        Ok(Self {
            engine: RwLock::new(Arc::new(ScreeningEngine::with_ngram_length(n)?)),
            cache: SearchCache::new(),
            ngram_length: n,
        })
    }

    /// Rebuilds the catalog from the provider. The live engine keeps serving
    /// searches until the replacement is fully built; a provider failure
    /// leaves it untouched. Records that fail to parse are skipped and
    /// counted, never fatal to the cycle.
    pub fn refresh<P: WatchlistProvider>(&self, provider: &P) -> Result<RefreshStats, RefreshError> {
        let records = provider
            .get_all_records()
            .map_err(RefreshError::SourceUnavailable)?;

        let mut engine = ScreeningEngine::with_ngram_length(self.ngram_length)
            .expect("n-gram length validated at construction");
        let mut stats = RefreshStats::default();

        for record in records {
            match engine.add(record.id, &record.full_name, record.birthday) {
                Ok(()) => stats.loaded += 1,
                Err(reason) => {
                    warn!(
                        person_id = record.id,
                        full_name = %record.full_name,
                        %reason,
                        "skipping watch-list record"
                    );
                    stats.rejected += 1;
                }
            }
        }

        *self.engine.write().expect("engine lock poisoned") = Arc::new(engine);
        self.cache.clear();

        debug!(loaded = stats.loaded, rejected = stats.rejected, "catalog refreshed");
        Ok(stats)
    }

    /// Searches the live catalog, capped to `count` results (default 1).
    /// Responses are served from and stored into the cache; an absent or
    /// malformed result is an empty list, never an error.
    pub fn search(
        &self,
        input: &str,
        count: Option<usize>,
        options: &SearchOptions,
        cancel: &CancelToken,
    ) -> Vec<SearchHit> {
        let count = count.unwrap_or(1);
        let key = cache_key(input, count, options);

        if let Some(hits) = self.cache.get(key) {
            return hits;
        }

        let engine = self
            .engine
            .read()
            .expect("engine lock poisoned")
            .clone();

        let results = engine.search(input, options, cancel);

        let hits: Vec<SearchHit> = match results {
            Some(results) => results
                .into_iter()
                .take(count)
                .map(|result| SearchHit {
                    person_id: result.person.id,
                    full_name: result.person.full_name.clone(),
                    birthday: result.person.birthday,
                    avg_coefficient: result.avg_coefficient,
                })
                .collect(),
            None => Vec::new(),
        };

        match hits.first() {
            Some(best) => info!(
                input,
                person_id = best.person_id,
                full_name = %best.full_name,
                birthday = ?best.birthday,
                avg_coefficient = best.avg_coefficient,
                "best match"
            ),
            None => info!(input, "no matches"),
        }

        self.cache.insert(key, hits.clone());
        hits
    }
}

impl Default for Screener {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider(Vec<WatchlistRecord>);

    impl WatchlistProvider for FixedProvider {
        fn get_all_records(
            &self,
        ) -> Result<Vec<WatchlistRecord>, Box<dyn std::error::Error + Send + Sync>> {
            Ok(self.0.clone())
        }
    }

    struct FailingProvider;

    impl WatchlistProvider for FailingProvider {
        fn get_all_records(
            &self,
        ) -> Result<Vec<WatchlistRecord>, Box<dyn std::error::Error + Send + Sync>> {
            Err("connection refused".into())
        }
    }

    fn record(id: i32, full_name: &str) -> WatchlistRecord {
        WatchlistRecord {
            id,
            full_name: full_name.to_string(),
            birthday: None,
        }
    }

    #[test]
    fn refresh_counts_loaded_and_rejected_records() {
        let screener = Screener::new();
        let provider = FixedProvider(vec![
            record(1, "EL MUHAMMED HALED"),
            record(2, "MUMAR AL IBN AL MOHAMMED"),
            record(3, " - "),
        ]);

        let stats = screener.refresh(&provider).unwrap();
        assert_eq!(stats, RefreshStats { loaded: 2, rejected: 1 });
    }

    #[test]
    fn failed_refresh_keeps_the_previous_catalog() {
        let screener = Screener::new();
        screener
            .refresh(&FixedProvider(vec![record(1, "EL MUHAMMED HALED")]))
            .unwrap();

        let err = screener.refresh(&FailingProvider).unwrap_err();
        assert!(matches!(err, RefreshError::SourceUnavailable(_)));

        let hits = screener.search(
            "el muhammed haled",
            None,
            &SearchOptions::default(),
            &CancelToken::new(),
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].person_id, 1);
    }

    #[test]
    fn search_caps_results_to_count_with_default_one() {
        let screener = Screener::new();
        screener
            .refresh(&FixedProvider(vec![
                record(1, "MUHAMMED OMAR"),
                record(2, "MUHAMMED OMAROV"),
            ]))
            .unwrap();

        let options = SearchOptions {
            min_average_coefficient: 0.5,
            ..SearchOptions::default()
        };

        let capped = screener.search("muhammed omar", None, &options, &CancelToken::new());
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].person_id, 1);

        let both = screener.search("muhammed omar", Some(10), &options, &CancelToken::new());
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn refresh_invalidates_cached_responses() {
        let screener = Screener::new();
        screener
            .refresh(&FixedProvider(vec![record(1, "EL MUHAMMED HALED")]))
            .unwrap();

        let options = SearchOptions::default();
        let cancel = CancelToken::new();
        let hits = screener.search("el muhammed haled", None, &options, &cancel);
        assert_eq!(hits.len(), 1);

        // Cached: repeating the call returns the same answer.
        let hits = screener.search("el muhammed haled", None, &options, &cancel);
        assert_eq!(hits.len(), 1);

        screener.refresh(&FixedProvider(vec![record(9, "GASAN MUMAROV")])).unwrap();
        let hits = screener.search("el muhammed haled", None, &options, &cancel);
        assert!(hits.is_empty());
    }
}
