//! homefit - Home workout companion
//!
//! Exercise catalog and workout tips from a remote document store, plus a
//! per-user workout calendar kept in a local key-value store.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod exercises;
pub mod fetch;
pub mod progress;
pub mod remote;
pub mod selection;
pub mod session;
pub mod tips;
pub mod tui;

pub use api::FitnessApi;
pub use db::{KeyValueStore, SqliteStore};
pub use error::{ConfigError, RemoteError, StoreError};
pub use fetch::FetchHook;
pub use progress::{CalendarMarkMap, ProgressTracker};
pub use session::SessionContext;
