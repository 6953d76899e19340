// src/core/mod.rs

pub mod assignment;
pub mod engine;
pub mod ngram;
pub mod types;
pub mod words;
