//! Printable delivery receipt

use chrono::{DateTime, Local};
use frigo_util::{format_datetime_es, format_millis_es};
use std::fmt::Write;

use crate::money::format_currency;
use crate::order::Order;

const WIDTH: usize = 40;

/// Plain-text receipt a courier hands over with the crates
pub fn render_receipt(order: &Order, courier: &str, now: &DateTime<Local>) -> String {
    let rule = "=".repeat(WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{:^width$}", "FRIGORÍFICO - REMITO DE ENTREGA", width = WIDTH);
    let _ = writeln!(out, "{}", rule);

    let id = order
        .identifier()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(out, "Pedido:     {}", id);
    let _ = writeln!(out, "Fecha:      {}", format_millis_es(order.timestamp));
    let _ = writeln!(out, "Comercio:   {}", order.display_store_name());
    let address = order.store_address.trim();
    let _ = writeln!(
        out,
        "Dirección:  {}",
        if address.is_empty() { "Dirección no indicada" } else { address }
    );
    let _ = writeln!(out, "{}", "-".repeat(WIDTH));
    let _ = writeln!(out, "Detalle:    {}", order.quantity_label("Pedido sin detalle"));

    if order.unit_price > 0.0 {
        let _ = writeln!(out, "Precio:     {}", format_currency(order.unit_price));
    }
    if order.total_price > 0.0 {
        let _ = writeln!(out, "Total:      {}", format_currency(order.total_price));
    }

    let _ = writeln!(out, "{}", "-".repeat(WIDTH));
    let _ = writeln!(out, "Repartidor: {}", courier.trim());
    let _ = writeln!(out, "Entregado:  {}", format_datetime_es(now));
    let _ = writeln!(out);
    let _ = writeln!(out, "Firma: ______________________________");
    let _ = writeln!(out, "{}", rule);

    out
}
