//! SQLite backend for the market engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
