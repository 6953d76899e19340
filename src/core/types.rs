// src/core/types.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::ngram::IndexKey;

/// A unique identifier for a watch-listed person.
pub type PersonId = i32;

/// One word position within a person's full name. The word is the prepared
/// (upper-cased, edge-padded) interned token, so `ngram_count` is fixed at
/// ingestion time for the index's configured n-gram length.
#[derive(Debug, Clone)]
pub struct NameSlot {
    /// Position of the word in the full name.
    pub word_index: u8,
    /// Prepared, interned word content.
    pub word: Arc<str>,
    /// Number of n-grams the prepared word slices into.
    pub ngram_count: usize,
    /// 1-based rank of this slot among slots of the same name sharing
    /// identical word content.
    pub duplicate_index: u8,
    /// Total count of slots sharing this slot's word content.
    pub duplicate_group_size: u8,
}

/// A watch-listed person. Immutable once ingested.
#[derive(Debug)]
pub struct Person {
    pub id: PersonId,
    pub full_name: String,
    pub birthday: Option<NaiveDate>,
    /// Ordered name slots, one per word (1..=255).
    pub name: Vec<NameSlot>,
}

/// Shared handle to a `Person` whose equality and hash are defined by `id`
/// ALONE. Two `PersonRef`s with the same id are the same entity regardless of
/// any other field. Every hash-based collection in the engine relies on this;
/// do not switch to structural equality.
#[derive(Debug, Clone)]
pub struct PersonRef(pub Arc<Person>);

impl PartialEq for PersonRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for PersonRef {}

impl Hash for PersonRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl Deref for PersonRef {
    type Target = Person;

    fn deref(&self) -> &Person {
        &self.0
    }
}

/// Index key for one name slot: identified by `(person id, word index)` only,
/// mirroring the id-only identity of `PersonRef`.
#[derive(Debug, Clone)]
pub struct SlotRef {
    pub person: PersonRef,
    pub word_index: u8,
}

impl SlotRef {
    pub fn slot(&self) -> &NameSlot {
        &self.person.name[self.word_index as usize]
    }
}

impl PartialEq for SlotRef {
    fn eq(&self, other: &Self) -> bool {
        self.person.id == other.person.id && self.word_index == other.word_index
    }
}

impl Eq for SlotRef {}

impl Hash for SlotRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.person.id.hash(state);
        self.word_index.hash(state);
    }
}

impl IndexKey for SlotRef {
    fn ngram_count(&self) -> usize {
        self.slot().ngram_count
    }
}

/// Tuning knobs for a single search call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    /// When set, only persons with exactly this birthday are considered.
    pub birthday: Option<NaiveDate>,
    /// When set (and `birthday` is not), only persons born this year are
    /// considered.
    pub year_of_birth: Option<i32>,
    /// Per-word acceptance threshold for the Dice coefficient.
    pub min_coefficient: f64,
    /// Final acceptance threshold for the per-person average.
    pub min_average_coefficient: f64,
    /// If true, the average is taken over the top `input word count` slot
    /// coefficients, so long watch-list names are not penalized by their own
    /// unmatched trailing slots.
    pub average_by_input_count: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            birthday: None,
            year_of_birth: None,
            min_coefficient: 0.39,
            min_average_coefficient: 0.75,
            average_by_input_count: true,
        }
    }
}

/// One ranked search result.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub person: PersonRef,
    /// Aggregate score of the assigned slots.
    pub avg_coefficient: f64,
    /// Per-slot coefficients in name word order; 0.0 means the slot was not
    /// assigned an input word.
    pub coefficients: Vec<f64>,
}

/// Cooperative cancellation flag shared by reference across the per-word
/// search workers. Once raised it never resets.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
