//! Business rules of the frigorifico ledger
//!
//! This crate contains:
//! - Inventory normalization and admin edits
//! - Order validation, stock reservation and confirmation
//! - Payment status tracking and weekly grouping of orders
//! - Admin and delivery accounts, sessions and permissions
//! - The `Ledger`, which ties all of the above to a `Store`

mod accounts;
mod inventory;
mod ledger;
mod money;
mod order;
mod payments;
mod receipt;
mod session;
mod weeks;

pub use accounts::*;
pub use inventory::*;
pub use ledger::*;
pub use money::*;
pub use order::*;
pub use payments::*;
pub use receipt::*;
pub use session::*;
pub use weeks::*;
