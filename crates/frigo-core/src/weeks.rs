//! Weekly grouping of orders for the history and payments views

use chrono::{DateTime, Local};
use frigo_util::{from_epoch_millis, week_boundaries, OrderId, WeekRange};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::order::Order;
use crate::payments::{state_in, PaymentState, PaymentStatus};

/// Title of the group holding orders without a usable date
pub const UNDATED_GROUP_TITLE: &str = "Pedidos sin fecha registrada";

/// Orders of one week, or the trailing group of undated orders
#[derive(Debug, Clone, PartialEq)]
pub struct WeekGroup {
    /// `None` for the undated group
    pub week: Option<WeekRange>,
    /// Newest first
    pub orders: Vec<Order>,
}

impl WeekGroup {
    pub fn is_undated(&self) -> bool {
        self.week.is_none()
    }

    pub fn title(&self) -> String {
        match &self.week {
            Some(week) => week.label(),
            None => UNDATED_GROUP_TITLE.to_string(),
        }
    }
}

fn week_of_order(order: &Order) -> Option<WeekRange> {
    order
        .timestamp
        .and_then(from_epoch_millis)
        .map(|dt| week_boundaries(&dt))
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by_key(|order| std::cmp::Reverse(order.sort_key()));
}

/// Partition orders into Monday-to-Sunday weeks.
///
/// Dated groups come first, most recent week first; orders without a usable
/// timestamp end up in one trailing undated group. Every order appears in
/// exactly one group.
pub fn group_orders_by_week(orders: &[Order]) -> Vec<WeekGroup> {
    let mut weeks: BTreeMap<i64, WeekGroup> = BTreeMap::new();
    let mut undated = Vec::new();

    for order in orders {
        match week_of_order(order) {
            Some(week) => weeks
                .entry(week.start.timestamp_millis())
                .or_insert_with(|| WeekGroup {
                    week: Some(week),
                    orders: Vec::new(),
                })
                .orders
                .push(order.clone()),
            None => undated.push(order.clone()),
        }
    }

    let mut groups: Vec<WeekGroup> = weeks.into_values().rev().collect();
    for group in &mut groups {
        newest_first(&mut group.orders);
    }

    if !undated.is_empty() {
        groups.push(WeekGroup {
            week: None,
            orders: undated,
        });
    }

    groups
}

/// Weeks offered by the payments view: every week with a dated order plus
/// the current one, most recent first.
pub fn payment_weeks(orders: &[Order], now: &DateTime<Local>) -> Vec<WeekRange> {
    let mut weeks: BTreeMap<i64, WeekRange> = orders
        .iter()
        .filter_map(week_of_order)
        .map(|week| (week.start.timestamp_millis(), week))
        .collect();

    let current = week_boundaries(now);
    weeks.entry(current.start.timestamp_millis()).or_insert(current);

    weeks.into_values().rev().collect()
}

/// An order awaiting collection
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPayment {
    pub id: OrderId,
    pub order: Order,
    /// Last recorded change, if any
    pub state: Option<PaymentState>,
}

/// Orders placed during `week` that are not yet paid, newest first.
/// Orders without an identifier cannot be tracked and are left out.
pub fn pending_payments(orders: &[Order], week: &WeekRange, states: &Value) -> Vec<PendingPayment> {
    let mut in_week: Vec<Order> = orders
        .iter()
        .filter(|order| order.timestamp.is_some_and(|ts| week.contains_millis(ts)))
        .cloned()
        .collect();
    newest_first(&mut in_week);

    in_week
        .into_iter()
        .filter_map(|order| {
            let id = order.identifier()?;
            let state = state_in(states, id.as_str());
            if state.as_ref().is_some_and(|s| s.status == PaymentStatus::Paid) {
                return None;
            }
            Some(PendingPayment { id, order, state })
        })
        .collect()
}
