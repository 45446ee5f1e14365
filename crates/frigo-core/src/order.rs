//! Orders and stock reservation

use frigo_util::{parse_float, parse_int, parse_int_str, parse_timestamp, CrateId, OrderId};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::inventory::InventoryItem;
use crate::money::total_price;

/// Store name shown when an order has none
pub const UNNAMED_STORE: &str = "Cliente sin nombre";

/// A placed order. Immutable once persisted.
///
/// Orders written before ids existed have no `id` and older ones may also
/// lack quantity, crate id or prices; every such field is optional or
/// defaults to zero when read back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<OrderId>,
    pub store_name: String,
    pub store_address: String,
    /// Crate label at the time of ordering
    pub crate_size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crate_id: Option<CrateId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    pub unit_price: f64,
    pub total_price: f64,
    /// Epoch milliseconds, assigned at confirmation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Order {
    /// Read a stored order, tolerating missing and mistyped fields.
    /// Returns `None` only for entries that are not objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let amount = |key: &str| {
            object
                .get(key)
                .and_then(parse_float)
                .filter(|v| v.is_finite())
                .unwrap_or(0.0)
        };

        Some(Self {
            id: object
                .get("id")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(OrderId::from),
            store_name: text("storeName"),
            store_address: text("storeAddress"),
            crate_size: text("crateSize"),
            crate_id: object
                .get("crateId")
                .and_then(|v| match v {
                    Value::String(s) => CrateId::parse(s),
                    Value::Number(n) => CrateId::parse(&n.to_string()),
                    _ => None,
                }),
            quantity: object
                .get("quantity")
                .and_then(parse_int)
                .filter(|q| *q > 0)
                .and_then(|q| u32::try_from(q).ok()),
            unit_price: amount("unitPrice"),
            total_price: amount("totalPrice"),
            timestamp: object.get("timestamp").and_then(parse_timestamp),
        })
    }

    /// Key under which this order's payment state is tracked.
    ///
    /// The assigned id when present, otherwise the stringified positive
    /// timestamp. Orders with neither cannot be tracked.
    pub fn identifier(&self) -> Option<OrderId> {
        if let Some(id) = &self.id {
            return Some(id.clone());
        }
        self.timestamp
            .filter(|ts| *ts > 0)
            .map(OrderId::from_timestamp)
    }

    /// Timestamp used for sorting; missing sorts as zero
    pub fn sort_key(&self) -> i64 {
        self.timestamp.unwrap_or(0)
    }

    /// Trimmed store name, or the placeholder
    pub fn display_store_name(&self) -> &str {
        let trimmed = self.store_name.trim();
        if trimmed.is_empty() {
            UNNAMED_STORE
        } else {
            trimmed
        }
    }

    /// `3 × Cajón de 6 cabezas`, or just the crate when the quantity is unknown
    pub fn quantity_label(&self, crate_fallback: &str) -> String {
        let crate_label = if self.crate_size.is_empty() {
            crate_fallback
        } else {
            self.crate_size.as_str()
        };
        match self.quantity {
            Some(quantity) => format!("{} × {}", quantity, crate_label),
            None => crate_label.to_string(),
        }
    }
}

/// Parse a stored order list, skipping entries that are not objects
pub fn orders_from_value(value: &Value) -> Vec<Order> {
    value
        .as_array()
        .map(|entries| entries.iter().filter_map(Order::from_value).collect())
        .unwrap_or_default()
}

/// Order form input, as typed by the customer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderRequest {
    pub store_name: String,
    pub store_address: String,
    pub crate_id: String,
    pub quantity: String,
}

/// Required text fields of the order form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    StoreName,
    StoreAddress,
}

impl RequiredField {
    fn message(&self) -> &'static str {
        match self {
            RequiredField::StoreName => "Ingrese el nombre del comercio.",
            RequiredField::StoreAddress => "Ingrese la dirección del comercio.",
        }
    }
}

/// Why an order could not be reserved. None of these mutate state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    #[error("{}", .0.message())]
    MissingField(RequiredField),

    #[error("Seleccione el tipo de cajón.")]
    MissingCrate,

    #[error("Ingrese una cantidad válida de cajones.")]
    InvalidQuantity,

    #[error("No hay stock disponible de {label}.")]
    OutOfStock { label: String },

    #[error("{}", insufficient_stock_message(.label, .available))]
    InsufficientStock { label: String, available: u32 },

    #[error("El inventario cambió mientras se confirmaba el pedido. Revise el pedido y vuelva a enviarlo.")]
    Conflict,
}

fn insufficient_stock_message(label: &str, available: &u32) -> String {
    if *available == 1 {
        format!("Solo queda 1 cajón disponible de {}.", label)
    } else {
        format!("Solo quedan {} cajones disponibles de {}.", available, label)
    }
}

/// A validated reservation, not yet stamped or persisted
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub store_name: String,
    pub store_address: String,
    /// The crate as it was before the decrement
    pub item: InventoryItem,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    /// Full inventory with only the chosen crate decremented
    pub updated_inventory: Vec<InventoryItem>,
}

impl Reservation {
    /// Stock left for the chosen crate after this reservation
    pub fn remaining_stock(&self) -> u32 {
        self.item.stock - self.quantity
    }

    /// Stamp the reservation into a persisted order
    pub fn into_order(self, id: OrderId, timestamp: i64) -> Order {
        Order {
            id: Some(id),
            store_name: self.store_name,
            store_address: self.store_address,
            crate_size: self.item.label,
            crate_id: Some(self.item.id),
            quantity: Some(self.quantity),
            unit_price: self.unit_price,
            total_price: self.total_price,
            timestamp: Some(timestamp),
        }
    }
}

/// Validate an order request against an inventory snapshot.
///
/// Checks run in a fixed order and the first failure wins: store name,
/// store address, crate, quantity, then stock.
pub fn reserve(request: &OrderRequest, inventory: &[InventoryItem]) -> Result<Reservation, ReservationError> {
    let store_name = request.store_name.trim();
    if store_name.is_empty() {
        return Err(ReservationError::MissingField(RequiredField::StoreName));
    }

    let store_address = request.store_address.trim();
    if store_address.is_empty() {
        return Err(ReservationError::MissingField(RequiredField::StoreAddress));
    }

    let crate_id = CrateId::parse(&request.crate_id).ok_or(ReservationError::MissingCrate)?;

    let quantity = parse_int_str(&request.quantity)
        .filter(|q| *q > 0)
        .map(|q| u32::try_from(q).unwrap_or(u32::MAX))
        .ok_or(ReservationError::InvalidQuantity)?;

    let item = inventory
        .iter()
        .find(|item| item.id == crate_id)
        .cloned()
        .unwrap_or_else(|| InventoryItem::empty(crate_id));

    if item.stock == 0 {
        return Err(ReservationError::OutOfStock { label: item.label });
    }
    if quantity > item.stock {
        return Err(ReservationError::InsufficientStock {
            label: item.label,
            available: item.stock,
        });
    }

    let updated_inventory = inventory
        .iter()
        .map(|other| {
            if other.id == crate_id {
                InventoryItem {
                    stock: other.stock - quantity,
                    ..other.clone()
                }
            } else {
                other.clone()
            }
        })
        .collect();

    Ok(Reservation {
        store_name: store_name.to_string(),
        store_address: store_address.to_string(),
        unit_price: item.price,
        total_price: total_price(item.price, quantity),
        quantity,
        item,
        updated_inventory,
    })
}
