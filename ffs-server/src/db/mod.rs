//! Database access layer
//!
//! Per-table queries used by the bracket engine and the API. Functions take a
//! `&mut SqliteConnection` so the same query runs on a pooled connection or
//! inside a transaction (`&mut *tx`).

pub mod matches;
pub mod playlists;
pub mod statistics;
pub mod tournaments;
pub mod users;
