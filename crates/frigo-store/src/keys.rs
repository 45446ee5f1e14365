//! Namespaced storage keys

use std::fmt;

/// Every key the ledger persists. Values are JSON documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Inventory,
    Orders,
    AdminHistory,
    AdminLogs,
    PaymentStatus,
    PaymentLogs,
    CustomAdmins,
    AdminOverrides,
    DeliveryAccounts,
}

impl StorageKey {
    pub const ALL: [StorageKey; 9] = [
        StorageKey::Inventory,
        StorageKey::Orders,
        StorageKey::AdminHistory,
        StorageKey::AdminLogs,
        StorageKey::PaymentStatus,
        StorageKey::PaymentLogs,
        StorageKey::CustomAdmins,
        StorageKey::AdminOverrides,
        StorageKey::DeliveryAccounts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Inventory => "frigorifico_inventory",
            StorageKey::Orders => "frigorifico_orders",
            StorageKey::AdminHistory => "frigorifico_admin_history",
            StorageKey::AdminLogs => "frigorifico_admin_logs",
            StorageKey::PaymentStatus => "frigorifico_payment_status",
            StorageKey::PaymentLogs => "frigorifico_payment_logs",
            StorageKey::CustomAdmins => "frigorifico_custom_admins",
            StorageKey::AdminOverrides => "frigorifico_admin_overrides",
            StorageKey::DeliveryAccounts => "frigorifico_delivery_accounts",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_unique_and_namespaced() {
        let names: HashSet<_> = StorageKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), StorageKey::ALL.len());
        assert!(names.iter().all(|n| n.starts_with("frigorifico_")));
    }
}
