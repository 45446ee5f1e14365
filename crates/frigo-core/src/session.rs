//! Authenticated actor context

use chrono::{DateTime, Local};
use frigo_util::Permissions;
use std::fmt;
use thiserror::Error;

/// Which portal a session was opened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Admin dashboard
    Admin,
    /// Delivery portal, allowed to manage delivery accounts
    Manager,
    /// Delivery portal, courier only
    Delivery,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Delivery => "delivery",
        };
        write!(f, "{}", name)
    }
}

/// Returned when a session lacks a capability
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{actor} is not allowed to {required}")]
pub struct PermissionDenied {
    pub actor: String,
    pub required: String,
}

/// Who is acting. Every mutating ledger operation that needs a capability
/// takes one of these instead of reading ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub permissions: Permissions,
    pub started_at: DateTime<Local>,
}

impl Session {
    pub fn new(
        username: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
        permissions: Permissions,
        started_at: DateTime<Local>,
    ) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
            role,
            permissions,
            started_at,
        }
    }

    /// Succeeds when the session is an admin holding every flag in `permission`
    pub fn require(&self, permission: Permissions) -> Result<(), PermissionDenied> {
        if self.role == Role::Admin && self.permissions.contains(permission) {
            Ok(())
        } else {
            Err(self.denied(permission.to_string()))
        }
    }

    /// Succeeds for any admin session
    pub fn require_admin(&self) -> Result<(), PermissionDenied> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(self.denied("act as admin"))
        }
    }

    /// Succeeds for delivery-portal managers
    pub fn require_manager(&self) -> Result<(), PermissionDenied> {
        if self.role == Role::Manager {
            Ok(())
        } else {
            Err(self.denied("manage delivery accounts"))
        }
    }

    fn denied(&self, required: impl Into<String>) -> PermissionDenied {
        PermissionDenied {
            actor: self.display_name.clone(),
            required: required.into(),
        }
    }
}
