//! Audit log entry types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::StorageKey;

/// Entry of the admin-action log or the payment log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub action: String,
    pub admin: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// Entry of the admin login history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEntry {
    pub name: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// The capped, append-only logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// Administrative actions (inventory edits, resets, account changes, logins)
    AdminActions,
    /// Payments marked as collected
    Payments,
    /// Admin logins
    Logins,
}

impl LogKind {
    pub const ALL: [LogKind; 3] = [LogKind::AdminActions, LogKind::Payments, LogKind::Logins];

    pub fn key(&self) -> StorageKey {
        match self {
            LogKind::AdminActions => StorageKey::AdminLogs,
            LogKind::Payments => StorageKey::PaymentLogs,
            LogKind::Logins => StorageKey::AdminHistory,
        }
    }

    /// Entry appended when this log is reset
    pub fn reset_message(&self) -> &'static str {
        match self {
            LogKind::AdminActions => "Reinició el registro de acciones",
            LogKind::Payments => "Reinició el registro de pagos",
            LogKind::Logins => "Reinició el registro de ingresos de administradores",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogKind::AdminActions => "actions",
            LogKind::Payments => "payments",
            LogKind::Logins => "logins",
        };
        write!(f, "{}", name)
    }
}
