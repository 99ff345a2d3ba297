//! Storage layer exposing one persistence contract over two backends.
//! - `storage::Storage` is the facade every caller depends on.
//! - `storage::file` keeps the working set in memory and persists to JSON.
//! - `storage::db` maps the same contract onto a SeaORM session.

pub mod errors;
pub mod runtime;
pub mod storage;
