//! Per-order payment state

use frigo_util::{parse_timestamp, FrigoError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::money::format_currency;
use crate::order::Order;

/// Name recorded when the acting admin has no usable display name
pub const FALLBACK_ADMIN_NAME: &str = "Administrador";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }

    /// Anything other than `"paid"` counts as pending
    pub fn from_stored(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("paid") => PaymentStatus::Paid,
            _ => PaymentStatus::Pending,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = FrigoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paid" => Ok(PaymentStatus::Paid),
            "pending" => Ok(PaymentStatus::Pending),
            other => Err(FrigoError::validation(format!("unknown payment status '{}'", other))),
        }
    }
}

/// Stored record of the last payment-status change for one order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentState {
    pub status: PaymentStatus,
    /// Epoch milliseconds of the change
    pub updated_at: Option<i64>,
    pub admin: Option<String>,
}

impl PaymentState {
    pub fn from_value(value: &Value) -> Self {
        Self {
            status: PaymentStatus::from_stored(value.get("status")),
            updated_at: value.get("updatedAt").and_then(parse_timestamp),
            admin: value
                .get("admin")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// Current status of an order in a stored status map (pending when absent)
pub fn status_in(states: &Value, order_id: &str) -> PaymentStatus {
    PaymentStatus::from_stored(states.get(order_id).and_then(|s| s.get("status")))
}

/// Record for an order in a stored status map
pub fn state_in(states: &Value, order_id: &str) -> Option<PaymentState> {
    states
        .get(order_id)
        .filter(|v| v.is_object())
        .map(PaymentState::from_value)
}

/// Trimmed admin display name, or the generic placeholder
pub fn sanitize_admin_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        FALLBACK_ADMIN_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Payment-log message for an order marked as collected
pub fn describe_paid_action(order: &Order) -> String {
    let total = if order.total_price.is_finite() && order.total_price > 0.0 {
        format!(" (total estimado {})", format_currency(order.total_price))
    } else {
        String::new()
    };

    format!(
        "Marcó como cobrado el pedido de {} ({}){}",
        order.display_store_name(),
        order.quantity_label("Pedido"),
        total
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(total: f64) -> Order {
        Order {
            id: None,
            store_name: " Almacén Don José ".into(),
            store_address: "Calle 1".into(),
            crate_size: "Cajón de 6 cabezas".into(),
            crate_id: None,
            quantity: Some(3),
            unit_price: 1000.0,
            total_price: total,
            timestamp: Some(1),
        }
    }

    #[test]
    fn unknown_status_is_pending() {
        let states = json!({"1": {"status": "paid"}, "2": {"status": "maybe"}, "3": 5});
        assert_eq!(status_in(&states, "1"), PaymentStatus::Paid);
        assert_eq!(status_in(&states, "2"), PaymentStatus::Pending);
        assert_eq!(status_in(&states, "3"), PaymentStatus::Pending);
        assert_eq!(status_in(&states, "4"), PaymentStatus::Pending);
        assert_eq!(status_in(&json!([]), "1"), PaymentStatus::Pending);
    }

    #[test]
    fn state_uses_stored_field_names() {
        let state = PaymentState {
            status: PaymentStatus::Paid,
            updated_at: Some(10),
            admin: Some("Luca".into()),
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value, json!({"status": "paid", "updatedAt": 10, "admin": "Luca"}));
        assert_eq!(state_in(&json!({"x": value}), "x"), Some(state));
    }

    #[test]
    fn paid_action_message() {
        assert_eq!(
            describe_paid_action(&order(3000.0)),
            "Marcó como cobrado el pedido de Almacén Don José (3 × Cajón de 6 cabezas) (total estimado $ 3.000,00)"
        );

        let mut unpriced = order(0.0);
        unpriced.store_name = String::new();
        unpriced.crate_size = String::new();
        unpriced.quantity = None;
        assert_eq!(
            describe_paid_action(&unpriced),
            "Marcó como cobrado el pedido de Cliente sin nombre (Pedido)"
        );
    }

    #[test]
    fn admin_name_fallback() {
        assert_eq!(sanitize_admin_name("  Luca "), "Luca");
        assert_eq!(sanitize_admin_name("   "), FALLBACK_ADMIN_NAME);
    }

    #[test]
    fn status_parses_from_cli() {
        assert_eq!("PAID".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert!("cobrado".parse::<PaymentStatus>().is_err());
    }
}
