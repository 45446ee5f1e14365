//! Crate inventory normalization

use frigo_util::{parse_float, parse_int, CrateId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::money::format_plain_number;

/// Stock and price of one crate size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: CrateId,
    pub label: String,
    pub stock: u32,
    pub price: f64,
}

impl InventoryItem {
    /// An item with no stock and no price
    pub fn empty(id: CrateId) -> Self {
        Self {
            id,
            label: id.label().to_string(),
            stock: 0,
            price: 0.0,
        }
    }
}

/// Requested change to one inventory row. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryEdit {
    pub stock: Option<Value>,
    pub price: Option<Value>,
}

/// Bring any stored inventory into canonical shape: exactly one item per
/// crate id, in enumeration order, with non-negative stock and price.
///
/// Never fails. Unknown ids are dropped, missing ids get zero stock and
/// price, and anything that is not an array yields an all-zero inventory.
pub fn normalize_inventory(raw: &Value) -> Vec<InventoryItem> {
    let entries = raw.as_array().map(Vec::as_slice).unwrap_or(&[]);

    CrateId::ALL
        .into_iter()
        .map(|id| {
            let Some(entry) = entries.iter().find(|entry| entry_matches(entry, id)) else {
                return InventoryItem::empty(id);
            };

            InventoryItem {
                id,
                label: id.label().to_string(),
                stock: entry.get("stock").map(clamp_stock).unwrap_or(0),
                price: entry.get("price").map(clamp_price).unwrap_or(0.0),
            }
        })
        .collect()
}

fn entry_matches(entry: &Value, id: CrateId) -> bool {
    match entry.get("id") {
        Some(Value::String(s)) => s == id.as_str(),
        Some(Value::Number(n)) => n.to_string() == id.as_str(),
        _ => false,
    }
}

fn clamp_stock(value: &Value) -> u32 {
    parse_int(value)
        .filter(|n| *n > 0)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

fn clamp_price(value: &Value) -> f64 {
    parse_float(value)
        .filter(|p| p.is_finite() && *p > 0.0)
        .unwrap_or(0.0)
}

/// Apply edits to an inventory and renormalize the result
pub fn apply_edits(current: &[InventoryItem], edits: &[(CrateId, InventoryEdit)]) -> Vec<InventoryItem> {
    let raw: Vec<Value> = current
        .iter()
        .map(|item| {
            let mut stock = Value::from(item.stock);
            let mut price = Value::from(item.price);
            for (_, edit) in edits.iter().filter(|(id, _)| *id == item.id) {
                if let Some(value) = &edit.stock {
                    stock = value.clone();
                }
                if let Some(value) = &edit.price {
                    price = value.clone();
                }
            }
            serde_json::json!({ "id": item.id.as_str(), "stock": stock, "price": price })
        })
        .collect();

    normalize_inventory(&Value::Array(raw))
}

/// One `"<label>: stock a → b, precio c → d"` fragment per changed crate
pub fn describe_inventory_changes(previous: &[InventoryItem], next: &[InventoryItem]) -> Vec<String> {
    next.iter()
        .filter_map(|item| {
            let before = previous.iter().find(|p| p.id == item.id);
            let previous_stock = before.map(|p| p.stock).unwrap_or(0);
            let previous_price = before.map(|p| p.price).unwrap_or(0.0);

            let stock_changed = before.is_none_or(|p| p.stock != item.stock);
            let price_changed = before.is_none_or(|p| p.price != item.price);

            let mut fragments = Vec::new();
            if stock_changed {
                fragments.push(format!("stock {} → {}", previous_stock, item.stock));
            }
            if price_changed {
                fragments.push(format!(
                    "precio {} → {}",
                    format_plain_number(previous_price),
                    format_plain_number(item.price)
                ));
            }

            if fragments.is_empty() {
                None
            } else {
                Some(format!("{}: {}", item.label, fragments.join(", ")))
            }
        })
        .collect()
}

/// Admin log message for an inventory save
pub fn inventory_log_message(changes: &[String]) -> String {
    if changes.is_empty() {
        "Guardó el inventario sin cambios".to_string()
    } else {
        format!("Actualizó el inventario ({})", changes.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(items: &[InventoryItem]) -> Vec<CrateId> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn non_array_input_yields_zeroed_inventory() {
        for raw in [json!(null), json!({"id": "6"}), json!("[]"), json!(42)] {
            let items = normalize_inventory(&raw);
            assert_eq!(ids(&items), CrateId::ALL.to_vec());
            assert!(items.iter().all(|i| i.stock == 0 && i.price == 0.0));
        }
    }

    #[test]
    fn entries_are_reordered_and_completed() {
        let raw = json!([
            {"id": "10", "stock": 4, "price": 900},
            {"id": "X", "stock": "7 cajones", "price": "1500.50"},
            {"id": "99", "stock": 100, "price": 1},
        ]);
        let items = normalize_inventory(&raw);

        assert_eq!(ids(&items), CrateId::ALL.to_vec());
        assert_eq!(items[0].stock, 7);
        assert_eq!(items[0].price, 1500.5);
        assert_eq!(items[0].label, "Cajón X");
        assert_eq!(items[5].stock, 4);
        assert_eq!(items[1], InventoryItem::empty(CrateId::Six));
    }

    #[test]
    fn numeric_ids_match() {
        let items = normalize_inventory(&json!([{"id": 6, "stock": 5, "price": 1000}]));
        assert_eq!(items[1].stock, 5);
    }

    #[test]
    fn negative_and_garbage_values_clamp_to_zero() {
        let raw = json!([
            {"id": "6", "stock": -3, "price": -10},
            {"id": "7", "stock": "abc", "price": "n/a"},
            {"id": "8", "stock": 2.9, "price": null},
        ]);
        let items = normalize_inventory(&raw);
        assert_eq!((items[1].stock, items[1].price), (0, 0.0));
        assert_eq!((items[2].stock, items[2].price), (0, 0.0));
        assert_eq!(items[3].stock, 2);
    }

    #[test]
    fn first_matching_entry_wins() {
        let raw = json!([
            {"id": "9", "stock": 1},
            {"id": "9", "stock": 8},
        ]);
        assert_eq!(normalize_inventory(&raw)[4].stock, 1);
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = json!([
            {"id": "X", "stock": "12", "price": "10.25"},
            {"id": "7", "stock": -1, "price": 3},
            "garbage",
        ]);
        let once = normalize_inventory(&raw);
        let twice = normalize_inventory(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn edits_only_touch_their_crate() {
        let current = normalize_inventory(&json!([{"id": "6", "stock": 5, "price": 1000}]));
        let next = apply_edits(
            &current,
            &[(
                CrateId::Seven,
                InventoryEdit {
                    stock: Some(json!("3")),
                    price: None,
                },
            )],
        );
        assert_eq!(next[1], current[1]);
        assert_eq!(next[2].stock, 3);
    }

    #[test]
    fn change_descriptions() {
        let before = normalize_inventory(&json!([{"id": "6", "stock": 5, "price": 1000}]));
        let after = normalize_inventory(&json!([
            {"id": "6", "stock": 7, "price": 1200.5},
            {"id": "X", "stock": 0, "price": 50}
        ]));

        let changes = describe_inventory_changes(&before, &after);
        assert_eq!(
            changes,
            vec![
                "Cajón X: precio 0 → 50".to_string(),
                "Cajón de 6 cabezas: stock 5 → 7, precio 1000 → 1200.5".to_string(),
            ]
        );
        assert_eq!(
            inventory_log_message(&changes),
            "Actualizó el inventario (Cajón X: precio 0 → 50 | Cajón de 6 cabezas: stock 5 → 7, precio 1000 → 1200.5)"
        );
        assert_eq!(
            inventory_log_message(&describe_inventory_changes(&after, &after)),
            "Guardó el inventario sin cambios"
        );
    }
}
