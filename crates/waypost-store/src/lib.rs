//! Local persistence for waypost location records.
//!
//! This crate provides a SQLite-backed implementation of
//! [`waypost_core::LocationStore`]. The store, not the client, assigns record
//! ids and timestamps, and every subscriber receives the full ordered history
//! again after each append.
//!
//! # Features
//!
//! - UUID record ids and timestamps that never go backwards in append order
//! - Whole-snapshot push to any number of subscribers
//! - Schema versioning
//!
//! # Example
//!
//! ```no_run
//! use waypost_core::LocationStore;
//! use waypost_store::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open_default()?;
//! println!("{} stored locations", store.count().await?);
//! let subscription = store.subscribe_ordered()?;
//! # drop(subscription);
//! # Ok(())
//! # }
//! ```

mod error;
mod schema;
mod store;

pub use error::{Error, Result};
pub use schema::SCHEMA_VERSION;
pub use store::{Clock, SqliteStore};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/waypost/locations.db`
/// - macOS: `~/Library/Application Support/waypost/locations.db`
/// - Windows: `C:\Users\<user>\AppData\Local\waypost\locations.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("waypost")
        .join("locations.db")
}
