// src/lib.rs

pub mod cache;
pub mod core;
pub mod screener;

pub use crate::core::engine::ScreeningEngine;
pub use crate::core::types::{CancelToken, MatchResult, SearchOptions};
pub use crate::screener::{Screener, SearchHit, WatchlistProvider, WatchlistRecord};
