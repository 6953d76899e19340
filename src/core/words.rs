// src/core/words.rs
use ahash::AHashSet;
use std::sync::Arc;
use thiserror::Error;

/// Hard ceiling on the number of words in a single name or query.
pub const MAX_WORDS: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("number of words ({0}) exceeded the maximum allowed {MAX_WORDS}")]
pub struct TooManyWords(pub usize);

/// Stores all prepared words in a unique set so that the many repeated tokens
/// across watch-list names ("AL", "IBN", "MOHAMMED", ...) share one
/// allocation. While the storage is populated, equal content never yields two
/// distinct `Arc<str>` instances.
///
/// Not safe for concurrent mutation; ingestion is externally serialized
/// against search.
#[derive(Debug, Default)]
pub struct WordStorage {
    words: AHashSet<Arc<str>>,
}

impl WordStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `text` into raw word tokens on spaces and hyphens, trimming
    /// each and dropping empties. Token order follows the input.
    pub fn parse_words(text: &str) -> Result<Vec<&str>, TooManyWords> {
        let tokens: Vec<&str> = text
            .split([' ', '-'])
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect();

        if tokens.len() > MAX_WORDS {
            return Err(TooManyWords(tokens.len()));
        }

        Ok(tokens)
    }

    /// Returns the canonical instance for `word`, inserting it first if the
    /// content is new.
    pub fn intern(&mut self, word: &str) -> Arc<str> {
        if let Some(existing) = self.words.get(word) {
            return existing.clone();
        }

        let canonical: Arc<str> = Arc::from(word);
        self.words.insert(canonical.clone());
        canonical
    }

    /// Looks up the canonical instance without inserting.
    pub fn get(&self, word: &str) -> Option<Arc<str>> {
        self.words.get(word).cloned()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_spaces_and_hyphens() {
        let words = WordStorage::parse_words("  ABD AL-RAHMAN  NASHWAN ").unwrap();
        assert_eq!(words, vec!["ABD", "AL", "RAHMAN", "NASHWAN"]);
    }

    #[test]
    fn parse_drops_empty_tokens() {
        assert_eq!(WordStorage::parse_words("- - -").unwrap(), Vec::<&str>::new());
        assert_eq!(WordStorage::parse_words("").unwrap(), Vec::<&str>::new());
    }

    #[test]
    fn parse_rejects_more_than_255_words() {
        let long = vec!["X"; MAX_WORDS + 1].join(" ");
        assert_eq!(WordStorage::parse_words(&long), Err(TooManyWords(256)));

        let at_limit = vec!["X"; MAX_WORDS].join(" ");
        assert_eq!(WordStorage::parse_words(&at_limit).unwrap().len(), MAX_WORDS);
    }

    #[test]
    fn intern_returns_one_instance_per_content() {
        let mut storage = WordStorage::new();
        let first = storage.intern("[[MOHAMMED]]");
        let second = storage.intern("[[MOHAMMED]]");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(storage.len(), 1);

        storage.clear();
        assert!(storage.is_empty());
        assert!(storage.get("[[MOHAMMED]]").is_none());
    }
}
