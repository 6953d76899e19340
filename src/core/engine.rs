// src/core/engine.rs
use ahash::AHashMap;
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use thiserror::Error;

use crate::core::assignment::{self, Objective};
use crate::core::ngram::{InvalidNgramLength, NgramIndex, DEFAULT_NGRAM_LEN};
use crate::core::types::{
    CancelToken, MatchResult, NameSlot, Person, PersonId, PersonRef, SearchOptions, SlotRef,
};
use crate::core::words::{TooManyWords, WordStorage};

/// Fractional coefficients are scaled to integers before entering the
/// assignment solver.
const COEFFICIENT_SCALE: f64 = 10_000.0;

/// A single watch-list record could not be ingested. The record is skipped;
/// the surrounding refresh cycle continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordRejected {
    #[error("full name contains no usable words")]
    EmptyName,
    #[error(transparent)]
    TooManyWords(#[from] TooManyWords),
}

/// Coefficient contributed to one name slot by one input word.
#[derive(Debug, Clone, Copy)]
struct WordHit {
    input_index: u8,
    coefficient: f64,
}

/// Per input word: persons whose name matched it, with the matched slots.
type PerWordMatches = AHashMap<PersonRef, AHashMap<u8, WordHit>>;

/// The in-memory fuzzy name-matching engine: interned word storage plus the
/// n-gram inverted index over every name slot of every ingested person.
///
/// Reads (`search`) are safe from any number of threads once ingestion is
/// done; mutation (`add`/`clear`) must be serialized against reads by the
/// caller. The [`Screener`](crate::screener::Screener) facade does this by
/// building a fresh engine aside and swapping it in.
#[derive(Debug)]
pub struct ScreeningEngine {
    words: WordStorage,
    index: NgramIndex<SlotRef, PersonRef>,
    person_count: usize,
}

impl ScreeningEngine {
    /// Engine with the default trigram index.
    pub fn new() -> Self {
        Self::with_ngram_length(DEFAULT_NGRAM_LEN).expect("default n-gram length is valid")
    }

    pub fn with_ngram_length(n: usize) -> Result<Self, InvalidNgramLength> {
        Ok(Self {
            words: WordStorage::new(),
            index: NgramIndex::new(n)?,
            person_count: 0,
        })
    }

    pub fn person_count(&self) -> usize {
        self.person_count
    }

    /// Ingests one watch-list record. Words are prepared (upper-cased, edge
    /// padded) and interned; duplicated words within the name are tagged with
    /// their 1-based rank and group size so that search can cap how many
    /// input words may claim them.
    pub fn add(
        &mut self,
        id: PersonId,
        full_name: &str,
        birthday: Option<NaiveDate>,
    ) -> Result<(), RecordRejected> {
        let raw_words = WordStorage::parse_words(full_name)?;
        if raw_words.is_empty() {
            return Err(RecordRejected::EmptyName);
        }

        let words: Vec<Arc<str>> = raw_words
            .iter()
            .map(|raw| {
                let prepared = self.index.prepare_word(raw);
                self.words.intern(&prepared)
            })
            .collect();

        let mut group_sizes: AHashMap<Arc<str>, u8> = AHashMap::new();
        for word in &words {
            *group_sizes.entry(word.clone()).or_insert(0) += 1;
        }

        let n = self.index.n();
        let mut seen: AHashMap<Arc<str>, u8> = AHashMap::new();
        let slots: Vec<NameSlot> = words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                let duplicate_index = {
                    let rank = seen.entry(word.clone()).or_insert(0);
                    *rank += 1;
                    *rank
                };
                NameSlot {
                    word_index: i as u8,
                    word: word.clone(),
                    ngram_count: word.chars().count() - (n - 1),
                    duplicate_index,
                    duplicate_group_size: group_sizes[word],
                }
            })
            .collect();

        let person = PersonRef(Arc::new(Person {
            id,
            full_name: full_name.to_string(),
            birthday,
            name: slots,
        }));

        for slot in &person.0.name {
            let key = SlotRef {
                person: person.clone(),
                word_index: slot.word_index,
            };
            self.index.add(&slot.word, key, person.clone());
        }

        self.person_count += 1;
        Ok(())
    }

    /// Drops every ingested record and all interned words.
    pub fn clear(&mut self) {
        self.words.clear();
        self.index.clear();
        self.person_count = 0;
    }

    /// Searches the catalog for persons approximately matching `input`.
    ///
    /// Returns `None` when no result can exist: the input parses to zero
    /// usable words, some input word matched nobody, or the call was
    /// cancelled. `Some(vec![])` means candidates existed but none cleared
    /// `min_average_coefficient`. Results are sorted by descending average;
    /// tie order is unspecified.
    pub fn search(
        &self,
        input: &str,
        options: &SearchOptions,
        cancel: &CancelToken,
    ) -> Option<Vec<MatchResult>> {
        let Ok(input_words) = WordStorage::parse_words(input) else {
            return None;
        };
        if input_words.is_empty() {
            return None;
        }

        let prepared: Vec<String> = input_words
            .iter()
            .map(|word| self.index.prepare_word(word))
            .collect();
        let input_len = prepared.len();

        // Fan out one lookup per input word. A word with zero matches makes
        // the final intersection empty, so it raises the stop flag and the
        // remaining workers bail out as soon as they observe it.
        let stop = AtomicBool::new(false);
        let per_word: Option<Vec<PerWordMatches>> = prepared
            .par_iter()
            .enumerate()
            .map(|(input_index, word)| {
                if stop.load(AtomicOrdering::Relaxed) || cancel.is_cancelled() {
                    return None;
                }

                let matches =
                    self.search_persons_by_word(word, input_index as u8, input_len, options);

                if matches.is_empty() {
                    stop.store(true, AtomicOrdering::Relaxed);
                    None
                } else {
                    Some(matches)
                }
            })
            .collect();

        if cancel.is_cancelled() {
            return None;
        }
        let mut per_word = per_word?;

        // Drive the intersection from the smallest per-word result.
        let smallest = per_word
            .iter()
            .enumerate()
            .min_by_key(|(_, matches)| matches.len())
            .map(|(i, _)| i)
            .unwrap_or(0);
        per_word.swap(0, smallest);

        let mut results: Vec<MatchResult> = Vec::new();
        'persons: for person in per_word[0].keys() {
            if person.name.len() < input_len {
                continue;
            }
            for other in &per_word[1..] {
                if !other.contains_key(person) {
                    continue 'persons;
                }
            }

            let Some(coefficients) = self.resolve_slots(person, &per_word, options) else {
                continue;
            };

            let avg_coefficient = average(&coefficients, input_len, options);
            if avg_coefficient >= options.min_average_coefficient {
                results.push(MatchResult {
                    person: person.clone(),
                    avg_coefficient,
                    coefficients,
                });
            }
        }

        results.sort_by(|a, b| {
            b.avg_coefficient
                .partial_cmp(&a.avg_coefficient)
                .unwrap_or(Ordering::Equal)
        });

        Some(results)
    }

    /// One per-word lookup: n-gram matches filtered by the birthday/year
    /// constraint and by name length, grouped by owning person.
    fn search_persons_by_word(
        &self,
        prepared: &str,
        input_index: u8,
        input_len: usize,
        options: &SearchOptions,
    ) -> PerWordMatches {
        let birthday = options.birthday;
        let year_of_birth = options.year_of_birth;

        let filter = move |_slot: &SlotRef, person: &PersonRef| {
            let birth_ok = match birthday {
                Some(day) => person.birthday == Some(day),
                None => match year_of_birth {
                    Some(year) => person.birthday.map(|b| b.year()) == Some(year),
                    None => true,
                },
            };
            birth_ok && person.name.len() >= input_len
        };

        let filter: &dyn Fn(&SlotRef, &PersonRef) -> bool = &filter;
        let slot_scores = self
            .index
            .get_matches(prepared, options.min_coefficient, Some(filter));

        let mut persons: PerWordMatches = AHashMap::new();
        for (slot, score) in slot_scores {
            persons
                .entry(slot.person.clone())
                .or_default()
                .insert(
                    slot.word_index,
                    WordHit {
                        input_index,
                        coefficient: score.coefficient,
                    },
                );
        }
        persons
    }

    /// Builds the final per-slot coefficient vector for one surviving person.
    ///
    /// Returns `None` (hard rejection) when some slot is claimed by more
    /// distinct input words than its duplicate group has copies: the input
    /// repeats a word more often than the name does.
    fn resolve_slots(
        &self,
        person: &PersonRef,
        per_word: &[PerWordMatches],
        options: &SearchOptions,
    ) -> Option<Vec<f64>> {
        let slot_count = person.name.len();
        let mut contributions: Vec<AHashMap<u8, f64>> = vec![AHashMap::new(); slot_count];

        for matches in per_word {
            if let Some(slot_hits) = matches.get(person) {
                for (&word_index, hit) in slot_hits {
                    contributions[word_index as usize].insert(hit.input_index, hit.coefficient);
                }
            }
        }

        let mut ambiguous = false;
        for (slot, claimed) in person.name.iter().zip(&contributions) {
            if claimed.len() > slot.duplicate_group_size as usize {
                return None;
            }
            if claimed.len() > 1 {
                ambiguous = true;
            }
        }

        if ambiguous {
            // Duplicate name words legitimately matched by several input
            // positions; let the assignment solver pick the one-to-one
            // pairing with the best total.
            return Some(assign_best(&contributions));
        }

        let mut coefficients: Vec<f64> = contributions
            .iter()
            .map(|claimed| claimed.values().next().copied().unwrap_or(0.0))
            .collect();

        if !options.average_by_input_count {
            // One input word credited to several slots would count twice in a
            // whole-name average; only the best-scoring slot keeps the
            // credit (equal scores keep it on both).
            let mut best_by_input: AHashMap<u8, f64> = AHashMap::new();
            for claimed in &contributions {
                if let Some((&input_index, &coefficient)) = claimed.iter().next() {
                    let best = best_by_input.entry(input_index).or_insert(coefficient);
                    if coefficient > *best {
                        *best = coefficient;
                    }
                }
            }
            for (i, claimed) in contributions.iter().enumerate() {
                if let Some((&input_index, &coefficient)) = claimed.iter().next() {
                    if coefficient < best_by_input[&input_index] {
                        coefficients[i] = 0.0;
                    }
                }
            }
        }

        Some(coefficients)
    }
}

impl Default for ScreeningEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves a many-to-many coefficient matrix (slot word index x input word
/// index) to the coefficient-maximizing one-to-one assignment, returning one
/// coefficient per slot (0.0 where the solver assigned a dummy cell).
fn assign_best(contributions: &[AHashMap<u8, f64>]) -> Vec<f64> {
    let costs: Vec<Vec<i64>> = contributions
        .iter()
        .map(|claimed| {
            let cols = claimed.keys().max().map(|&c| c as usize + 1).unwrap_or(0);
            let mut row = vec![0i64; cols];
            for (&input_index, &coefficient) in claimed {
                row[input_index as usize] = (coefficient * COEFFICIENT_SCALE) as i64;
            }
            row
        })
        .collect();

    let assignment = assignment::solve(&costs, Objective::Maximize);

    contributions
        .iter()
        .zip(assignment)
        .map(|(claimed, column)| {
            u8::try_from(column)
                .ok()
                .and_then(|input_index| claimed.get(&input_index))
                .copied()
                .unwrap_or(0.0)
        })
        .collect()
}

fn average(coefficients: &[f64], input_len: usize, options: &SearchOptions) -> f64 {
    if options.average_by_input_count {
        let mut sorted = coefficients.to_vec();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        sorted.iter().take(input_len).sum::<f64>() / input_len as f64
    } else {
        coefficients.iter().sum::<f64>() / coefficients.len() as f64
    }
}
