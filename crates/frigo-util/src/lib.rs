//! Shared utilities for the frigorifico ledger
//!
//! This crate provides:
//! - ID types (CrateId, OrderId) and account identifier normalization
//! - Time utilities (mock-able clock, epoch millis, week ranges)
//! - Spanish (es-AR) date formatting used by history and payment views
//! - Lenient number parsing for loosely typed stored data
//! - Typed account permission flags
//! - Error types
//! - Default paths for config and data directories

mod error;
mod ids;
mod lenient;
mod paths;
mod permissions;
mod time;

pub use error::*;
pub use ids::*;
pub use lenient::*;
pub use paths::*;
pub use permissions::*;
pub use time::*;
