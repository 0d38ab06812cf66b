//! # FFS Common Library
//!
//! Shared code for the FindFavouriteSong workspace:
//! - Database initialization and row models
//! - Configuration loading and root folder resolution
//! - Common error type

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
