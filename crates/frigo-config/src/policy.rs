//! Validated configuration structures

use crate::schema::{RawAdmin, RawConfig, RawLedgerConfig, RawManager};
use frigo_util::{data_dir_without_env, Permissions};
use std::path::PathBuf;

/// Default number of admin-action log entries kept
pub const DEFAULT_ACTION_LOG_CAP: usize = 50;

/// Default number of payment log entries kept
pub const DEFAULT_PAYMENT_LOG_CAP: usize = 50;

/// Default number of admin login history entries kept
pub const DEFAULT_LOGIN_HISTORY_CAP: usize = 20;

/// Default currency code
pub const DEFAULT_CURRENCY: &str = "ARS";

/// Validated configuration ready for use by the ledger
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub settings: LedgerSettings,

    /// Built-in admin accounts. Their permissions are fixed; passwords may be
    /// overridden at runtime.
    pub admins: Vec<AdminDefinition>,

    /// Built-in delivery-portal managers
    pub managers: Vec<ManagerDefinition>,
}

impl LedgerConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let admins = raw
            .admins
            .map(|admins| admins.into_iter().map(AdminDefinition::from_raw).collect())
            .unwrap_or_else(builtin_admins);

        let managers = raw
            .managers
            .map(|managers| managers.into_iter().map(ManagerDefinition::from_raw).collect())
            .unwrap_or_else(builtin_managers);

        Self {
            settings: LedgerSettings::from_raw(raw.ledger),
            admins,
            managers,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            settings: LedgerSettings::default(),
            admins: builtin_admins(),
            managers: builtin_managers(),
        }
    }
}

/// Ledger-level settings
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub data_dir: PathBuf,
    pub currency: String,
    pub action_log_cap: usize,
    pub payment_log_cap: usize,
    pub login_history_cap: usize,
}

impl LedgerSettings {
    fn from_raw(raw: RawLedgerConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
            currency: raw
                .currency
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            action_log_cap: raw.action_log_cap.unwrap_or(DEFAULT_ACTION_LOG_CAP),
            payment_log_cap: raw.payment_log_cap.unwrap_or(DEFAULT_PAYMENT_LOG_CAP),
            login_history_cap: raw.login_history_cap.unwrap_or(DEFAULT_LOGIN_HISTORY_CAP),
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self::from_raw(RawLedgerConfig::default())
    }
}

/// Built-in admin account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminDefinition {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub permissions: Permissions,
}

impl AdminDefinition {
    fn from_raw(raw: RawAdmin) -> Self {
        let username = raw.username.trim().to_string();
        let permissions = raw
            .permissions
            .iter()
            .filter_map(|name| Permissions::from_config_name(name))
            .fold(Permissions::empty(), |acc, p| acc | p);

        Self {
            display_name: display_name_or(raw.display_name, &username),
            username,
            password: raw.password,
            permissions,
        }
    }
}

/// Built-in delivery-portal manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerDefinition {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

impl ManagerDefinition {
    fn from_raw(raw: RawManager) -> Self {
        let username = raw.username.trim().to_string();
        Self {
            display_name: display_name_or(raw.display_name, &username),
            username,
            password: raw.password,
        }
    }
}

fn display_name_or(display_name: Option<String>, username: &str) -> String {
    display_name
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| username.to_string())
}

/// The admin accounts the shop started with
pub fn builtin_admins() -> Vec<AdminDefinition> {
    vec![
        AdminDefinition {
            username: "Martin".into(),
            password: "1234".into(),
            display_name: "Martin".into(),
            permissions: Permissions::MANAGE_PAYMENTS | Permissions::CLEAR_ORDERS,
        },
        AdminDefinition {
            username: "luca".into(),
            password: "Luca-admin".into(),
            display_name: "Luca".into(),
            permissions: Permissions::all(),
        },
        AdminDefinition {
            username: "franco".into(),
            password: "1234".into(),
            display_name: "Franco".into(),
            permissions: Permissions::empty(),
        },
    ]
}

/// The delivery-portal managers the shop started with
pub fn builtin_managers() -> Vec<ManagerDefinition> {
    vec![
        ManagerDefinition {
            username: "Martin".into(),
            password: "1234".into(),
            display_name: "Martin".into(),
        },
        ManagerDefinition {
            username: "luca".into(),
            password: "Luca-admin".into(),
            display_name: "Luca".into(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_permissions() {
        let admins = builtin_admins();
        let luca = admins.iter().find(|a| a.username == "luca").unwrap();
        assert!(luca.permissions.contains(Permissions::MANAGE_ADMIN_PASSWORDS));
        let franco = admins.iter().find(|a| a.username == "franco").unwrap();
        assert!(franco.permissions.is_empty());
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let def = AdminDefinition::from_raw(RawAdmin {
            username: " ana ".into(),
            password: "x".into(),
            display_name: Some("  ".into()),
            permissions: vec!["clear_orders".into()],
        });
        assert_eq!(def.username, "ana");
        assert_eq!(def.display_name, "ana");
        assert_eq!(def.permissions, Permissions::CLEAR_ORDERS);
    }

    #[test]
    fn settings_defaults() {
        let settings = LedgerSettings::default();
        assert_eq!(settings.currency, "ARS");
        assert_eq!(settings.action_log_cap, 50);
        assert_eq!(settings.payment_log_cap, 50);
        assert_eq!(settings.login_history_cap, 20);
    }
}
