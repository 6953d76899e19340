// src/core/ngram.rs
use ahash::AHashMap;
use std::hash::Hash;
use thiserror::Error;

/// Longest supported n-gram; lets `Ngram` live inline without allocating.
pub const MAX_NGRAM_LEN: usize = 10;

/// Default n-gram length (trigrams).
pub const DEFAULT_NGRAM_LEN: usize = 3;

/// Left edge-padding sentinel; never appears in natural input.
const PAD_LEFT: char = '[';
/// Right edge-padding sentinel.
const PAD_RIGHT: char = ']';

#[derive(Debug, Error, PartialEq, Eq)]
#[error("n-gram length must be between 2 and 10, got {0}")]
pub struct InvalidNgramLength(pub usize);

/// A fixed-length slice of a prepared word's characters, compared and hashed
/// by exact character content (ordinal, not culture-aware).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ngram {
    chars: [char; MAX_NGRAM_LEN],
    len: u8,
}

impl Ngram {
    fn from_chars(window: &[char]) -> Self {
        debug_assert!(window.len() <= MAX_NGRAM_LEN);
        let mut chars = ['\0'; MAX_NGRAM_LEN];
        chars[..window.len()].copy_from_slice(window);
        Self {
            chars,
            len: window.len() as u8,
        }
    }
}

impl std::fmt::Display for Ngram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in &self.chars[..self.len as usize] {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// An index key must expose how many n-grams its own prepared word slices
/// into; that count is the key's side of the Dice denominator.
pub trait IndexKey: Eq + Hash + Clone {
    fn ngram_count(&self) -> usize;
}

/// Per-candidate outcome of a `get_matches` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NgramScore {
    /// How many of the query's n-grams (counted with repeats) hit the key.
    pub matches: u32,
    /// Dice-style overlap: `2 * matches / (query n-grams + key n-grams)`.
    pub coefficient: f64,
}

/// Inverted index from an n-gram to every `(key, value)` pair whose prepared
/// word contains it. Writers must not run concurrently with readers; once
/// a refresh cycle's writes are complete, any number of readers is safe.
#[derive(Debug)]
pub struct NgramIndex<K, V> {
    n: usize,
    buckets: AHashMap<Ngram, AHashMap<K, V>>,
}

impl<K: IndexKey, V> NgramIndex<K, V> {
    pub fn new(n: usize) -> Result<Self, InvalidNgramLength> {
        if !(2..=MAX_NGRAM_LEN).contains(&n) {
            return Err(InvalidNgramLength(n));
        }

        Ok(Self {
            n,
            buckets: AHashMap::new(),
        })
    }

    /// The configured n-gram length. Entries are never shared across
    /// different lengths; changing it means a full rebuild.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Upper-cases `raw` and wraps it with `n - 1` sentinel characters per
    /// side, so boundary n-grams are distinguishable from interior ones.
    pub fn prepare_word(&self, raw: &str) -> String {
        let pad = self.n - 1;
        let mut prepared = String::with_capacity(raw.len() + 2 * pad);
        for _ in 0..pad {
            prepared.push(PAD_LEFT);
        }
        for c in raw.chars() {
            prepared.extend(c.to_uppercase());
        }
        for _ in 0..pad {
            prepared.push(PAD_RIGHT);
        }
        prepared
    }

    /// Overlapping n-grams of a prepared word, in order, repeats included.
    pub fn ngrams_of(&self, prepared: &str) -> Vec<Ngram> {
        let chars: Vec<char> = prepared.chars().collect();
        chars.windows(self.n).map(Ngram::from_chars).collect()
    }

    /// Inserts `key -> value` into the bucket of every n-gram of
    /// `prepared`. Re-adding an equal key overwrites its value (last write
    /// wins) instead of duplicating the entry.
    pub fn add(&mut self, prepared: &str, key: K, value: V)
    where
        V: Clone,
    {
        for ngram in self.ngrams_of(prepared) {
            self.buckets
                .entry(ngram)
                .or_default()
                .insert(key.clone(), value.clone());
        }
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Scores every indexed key against the query word. `filter` is applied
    /// per candidate before counting, which narrows the scan without a
    /// dedicated index per filter value. Entries scoring below
    /// `min_coefficient` are dropped, except that a coefficient of 1.0 or
    /// more always survives (exact matches are never filtered out).
    pub fn get_matches(
        &self,
        prepared: &str,
        min_coefficient: f64,
        filter: Option<&dyn Fn(&K, &V) -> bool>,
    ) -> AHashMap<K, NgramScore> {
        let query = self.ngrams_of(prepared);
        let mut result: AHashMap<K, NgramScore> = AHashMap::new();

        for ngram in &query {
            let Some(bucket) = self.buckets.get(ngram) else {
                continue;
            };

            for (key, value) in bucket {
                if let Some(accept) = filter {
                    if !accept(key, value) {
                        continue;
                    }
                }

                result
                    .entry(key.clone())
                    .or_insert(NgramScore {
                        matches: 0,
                        coefficient: 0.0,
                    })
                    .matches += 1;
            }
        }

        for (key, score) in result.iter_mut() {
            score.coefficient =
                2.0 * f64::from(score.matches) / (query.len() + key.ngram_count()) as f64;
        }

        result.retain(|_, score| score.coefficient >= min_coefficient || score.coefficient >= 1.0);

        result
    }
}
