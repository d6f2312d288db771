//! Pipeline entry points.
//!
//! - `run_econ`: Crawl the feed directory, new issues and paper details
//! - `run_listing`: Append one snapshot of the ranked listing
//! - `run_subset`: Export a reduced copy of the economics tables
//! - `run_validate`: Check a config file
//! - `run_info`: Report what storage holds

pub mod econ;
pub mod info;
pub mod listing;
pub mod reconcile;
pub mod subset;
pub mod validate;

pub use econ::{RunReport, run_econ};
pub use info::{StorageInfo, run_info};
pub use listing::{ListingReport, run_listing};
pub use reconcile::Reconciled;
pub use subset::{Dataset, SubsetParams, run_subset, select_subset};
pub use validate::run_validate;
