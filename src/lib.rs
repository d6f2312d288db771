// src/lib.rs

//! paperwatch: incremental scrapers for working-paper feeds and a ranked
//! link listing, persisted as keyed JSON tables.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
