//! Account permission flags

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

bitflags! {
    /// What an admin account may do beyond editing inventory and viewing history.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Permissions: u8 {
        /// Mark orders as paid or pending
        const MANAGE_PAYMENTS = 1 << 0;
        /// Clear the order history and reset the logs
        const CLEAR_ORDERS = 1 << 1;
        /// Add admin accounts
        const MANAGE_ADMINS = 1 << 2;
        /// Change other admins' passwords
        const MANAGE_ADMIN_PASSWORDS = 1 << 3;
    }
}

/// (flag, config name, stored field name)
const PERMISSION_NAMES: [(Permissions, &str, &str); 4] = [
    (Permissions::MANAGE_PAYMENTS, "manage_payments", "managePayments"),
    (Permissions::CLEAR_ORDERS, "clear_orders", "clearOrders"),
    (Permissions::MANAGE_ADMINS, "manage_admins", "manageAdmins"),
    (
        Permissions::MANAGE_ADMIN_PASSWORDS,
        "manage_admin_passwords",
        "manageAdminPasswords",
    ),
];

impl Permissions {
    /// Parse a single permission name, accepting both `manage_payments` and `managePayments`
    pub fn from_config_name(name: &str) -> Option<Self> {
        let name = name.trim();
        PERMISSION_NAMES
            .iter()
            .find(|(_, snake, camel)| *snake == name || *camel == name)
            .map(|(flag, _, _)| *flag)
    }

    /// Config names of the set flags
    pub fn names(&self) -> Vec<&'static str> {
        PERMISSION_NAMES
            .iter()
            .filter(|(flag, _, _)| self.contains(*flag))
            .map(|(_, snake, _)| *snake)
            .collect()
    }

    /// Read the stored object form (`{"managePayments": true, ...}`).
    /// Anything that is not an object grants nothing; values count when truthy.
    pub fn from_stored(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Permissions::empty();
        };

        let mut permissions = Permissions::empty();
        for (flag, _, camel) in PERMISSION_NAMES {
            if object.get(camel).is_some_and(is_truthy) {
                permissions |= flag;
            }
        }
        permissions
    }

    /// Stored object form, only listing granted flags
    pub fn to_stored(&self) -> Value {
        let mut object = Map::new();
        for (flag, _, camel) in PERMISSION_NAMES {
            if self.contains(flag) {
                object.insert(camel.to_string(), Value::Bool(true));
            }
        }
        Value::Object(object)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            write!(f, "-")
        } else {
            write!(f, "{}", names.join(", "))
        }
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_stored().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Permissions::from_stored(&value))
    }
}
