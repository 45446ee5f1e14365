//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Ledger-level settings
    #[serde(default)]
    pub ledger: RawLedgerConfig,

    /// Built-in admin accounts. Absent means the stock accounts.
    pub admins: Option<Vec<RawAdmin>>,

    /// Built-in delivery-portal managers. Absent means the stock managers.
    pub managers: Option<Vec<RawManager>>,
}

/// Ledger settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLedgerConfig {
    /// Directory holding the ledger database
    pub data_dir: Option<PathBuf>,

    /// ISO currency code used when printing prices
    pub currency: Option<String>,

    /// Entries kept in the admin-action log
    pub action_log_cap: Option<usize>,

    /// Entries kept in the payment log
    pub payment_log_cap: Option<usize>,

    /// Entries kept in the admin login history
    pub login_history_cap: Option<usize>,
}

/// Built-in admin account
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawAdmin {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,

    /// Permission names: "manage_payments", "clear_orders",
    /// "manage_admins", "manage_admin_passwords"
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Built-in delivery-portal manager
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawManager {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
}
