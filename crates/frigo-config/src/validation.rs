//! Configuration validation

use crate::schema::RawConfig;
use frigo_util::{normalize_identifier, Permissions};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{section}[{index}]: {field} cannot be empty")]
    EmptyField {
        section: &'static str,
        index: usize,
        field: &'static str,
    },

    #[error("Duplicate {section} username: {username}")]
    DuplicateUsername {
        section: &'static str,
        username: String,
    },

    #[error("Admin '{username}': unknown permission '{permission}'")]
    UnknownPermission { username: String, permission: String },

    #[error("ledger.{0} must be greater than zero")]
    InvalidLogCap(&'static str),

    #[error("Invalid currency code '{0}': expected three letters")]
    InvalidCurrency(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let caps = [
        ("action_log_cap", config.ledger.action_log_cap),
        ("payment_log_cap", config.ledger.payment_log_cap),
        ("login_history_cap", config.ledger.login_history_cap),
    ];
    for (name, cap) in caps {
        if cap == Some(0) {
            errors.push(ValidationError::InvalidLogCap(name));
        }
    }

    if let Some(currency) = &config.ledger.currency {
        let trimmed = currency.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.push(ValidationError::InvalidCurrency(currency.clone()));
        }
    }

    if let Some(admins) = &config.admins {
        let accounts = admins
            .iter()
            .map(|a| (a.username.as_str(), a.password.as_str()));
        errors.extend(validate_accounts("admins", accounts));

        for admin in admins {
            for permission in &admin.permissions {
                if Permissions::from_config_name(permission).is_none() {
                    errors.push(ValidationError::UnknownPermission {
                        username: admin.username.clone(),
                        permission: permission.clone(),
                    });
                }
            }
        }
    }

    if let Some(managers) = &config.managers {
        let accounts = managers
            .iter()
            .map(|m| (m.username.as_str(), m.password.as_str()));
        errors.extend(validate_accounts("managers", accounts));
    }

    errors
}

fn validate_accounts<'a>(
    section: &'static str,
    accounts: impl Iterator<Item = (&'a str, &'a str)>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, (username, password)) in accounts.enumerate() {
        let normalized = normalize_identifier(username);
        if normalized.is_empty() {
            errors.push(ValidationError::EmptyField {
                section,
                index,
                field: "username",
            });
        } else if !seen.insert(normalized) {
            errors.push(ValidationError::DuplicateUsername {
                section,
                username: username.to_string(),
            });
        }

        if password.is_empty() {
            errors.push(ValidationError::EmptyField {
                section,
                index,
                field: "password",
            });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawAdmin, RawLedgerConfig, RawManager};

    fn admin(username: &str, password: &str, permissions: &[&str]) -> RawAdmin {
        RawAdmin {
            username: username.into(),
            password: password.into(),
            display_name: None,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_duplicate_username_detection() {
        let config = RawConfig {
            config_version: 1,
            ledger: Default::default(),
            admins: Some(vec![admin("Martín", "a", &[]), admin(" martin", "b", &[])]),
            managers: None,
        };

        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateUsername { section: "admins", .. })));
    }

    #[test]
    fn test_empty_fields_and_unknown_permission() {
        let config = RawConfig {
            config_version: 1,
            ledger: Default::default(),
            admins: Some(vec![admin("  ", "", &["manage_everything"])]),
            managers: Some(vec![RawManager {
                username: "m".into(),
                password: "".into(),
                display_name: None,
            }]),
        };

        let errors = validate_config(&config);
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::EmptyField { .. }))
                .count(),
            3
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnknownPermission { .. })));
    }

    #[test]
    fn test_ledger_settings_validation() {
        let config = RawConfig {
            config_version: 1,
            ledger: RawLedgerConfig {
                currency: Some("PESOS".into()),
                login_history_cap: Some(0),
                ..Default::default()
            },
            admins: None,
            managers: None,
        };

        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidLogCap("login_history_cap"))));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidCurrency(_))));
    }
}
