//! Integration tests for frigorifico
//!
//! These tests drive the ledger end to end over both store backends.

use chrono::{DateTime, Local, TimeZone};
use frigo_config::{parse_config, LedgerConfig};
use frigo_core::{
    InventoryEdit, Ledger, LedgerError, OrderRequest, PaymentStatus, ReservationError, Session,
};
use frigo_store::{
    ConditionalWrite, LogKind, MemoryStore, SqliteStore, StorageKey, Store, StoreError,
};
use frigo_util::{week_boundaries, CrateId, OrderId};
use serde_json::{json, Value};
use std::sync::Arc;

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn make_test_ledger(store: Arc<dyn Store>) -> Ledger {
    Ledger::new(LedgerConfig::default(), store)
}

fn stock_crate(ledger: &Ledger, admin: &Session, id: CrateId, stock: u32, price: f64) {
    let edit = InventoryEdit {
        stock: Some(json!(stock)),
        price: Some(json!(price)),
    };
    ledger
        .save_inventory(admin, &[(id, edit)], Local::now())
        .unwrap();
}

fn order_of(store_name: &str, crate_id: &str, quantity: &str) -> OrderRequest {
    OrderRequest {
        store_name: store_name.into(),
        store_address: "Av. Siempre Viva 742".into(),
        crate_id: crate_id.into(),
        quantity: quantity.into(),
    }
}

fn luca(ledger: &Ledger) -> Session {
    ledger
        .authenticate_admin("luca", "Luca-admin", Local::now())
        .unwrap()
}

#[test]
fn test_order_to_payment_flow() {
    let ledger = make_test_ledger(Arc::new(SqliteStore::in_memory().unwrap()));
    let admin = luca(&ledger);
    stock_crate(&ledger, &admin, CrateId::Six, 5, 1000.0);

    let now = at(2024, 1, 3, 10);
    let review = ledger.review_order(&order_of("Almacén", "6", "3")).unwrap();
    assert_eq!(review.total_price, 3000.0);

    let order = ledger.confirm_order(&order_of("Almacén", "6", "3"), now).unwrap();
    assert_eq!(order.total_price, 3000.0);
    assert_eq!(order.crate_size, "Cajón de 6 cabezas");

    let six = ledger
        .inventory()
        .unwrap()
        .into_iter()
        .find(|item| item.id == CrateId::Six)
        .unwrap();
    assert_eq!(six.stock, 2);

    let err = ledger
        .confirm_order(&order_of("Otro", "6", "3"), now)
        .unwrap_err();
    match err {
        LedgerError::Reservation(ReservationError::InsufficientStock { available, .. }) => {
            assert_eq!(available, 2)
        }
        other => panic!("unexpected error: {other}"),
    }

    let week = week_boundaries(&now);
    let pending = ledger.pending_payments(&week).unwrap();
    assert_eq!(pending.len(), 1);
    let id = pending[0].id.clone();

    assert!(ledger.set_payment_status(&admin, &id, PaymentStatus::Paid, now).unwrap());
    assert!(!ledger.set_payment_status(&admin, &id, PaymentStatus::Paid, now).unwrap());

    let payment_log = ledger.action_log(LogKind::Payments).unwrap();
    assert_eq!(payment_log.len(), 1);
    assert_eq!(payment_log[0].admin, "Luca");
    assert!(ledger.pending_payments(&week).unwrap().is_empty());

    let states: Value = serde_json::from_str(
        &ledger
            .store()
            .get_value(StorageKey::PaymentStatus.as_str())
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(states.as_object().unwrap().len(), 1);
    assert_eq!(states[id.as_str()]["status"], "paid");
}

#[test]
fn test_concurrent_writer_causes_conflict() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let ledger = make_test_ledger(store.clone());
    let admin = luca(&ledger);
    stock_crate(&ledger, &admin, CrateId::Eight, 4, 500.0);

    // Another device reads the same versions and commits first
    let inventory = store.get(StorageKey::Inventory.as_str()).unwrap().unwrap();
    let stale = inventory.version;
    store
        .commit(&[ConditionalWrite::new(
            StorageKey::Inventory.as_str(),
            stale,
            inventory.value.clone(),
        )])
        .unwrap();

    // The losing write is rejected without touching anything
    let err = store
        .commit(&[ConditionalWrite::new(StorageKey::Inventory.as_str(), stale, "[]")])
        .unwrap_err();
    assert!(matches!(err, StoreError::VersionConflict(_)));
    assert_eq!(
        store.get_value(StorageKey::Inventory.as_str()).unwrap(),
        Some(inventory.value)
    );

    // A ledger that reads fresh versions still succeeds
    ledger
        .confirm_order(&order_of("Almacén", "8", "4"), Local::now())
        .unwrap();
    let err = ledger
        .confirm_order(&order_of("Almacén", "8", "1"), Local::now())
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Reservation(ReservationError::OutOfStock { .. })
    ));
}

#[test]
fn test_history_groups_by_week() {
    let ledger = make_test_ledger(Arc::new(MemoryStore::new()));
    let admin = luca(&ledger);
    stock_crate(&ledger, &admin, CrateId::X, 10, 200.0);

    ledger.confirm_order(&order_of("Lunes", "X", "1"), at(2024, 1, 1, 9)).unwrap();
    ledger.confirm_order(&order_of("Domingo", "X", "1"), at(2024, 1, 7, 20)).unwrap();
    ledger.confirm_order(&order_of("Martes", "X", "1"), at(2024, 1, 9, 9)).unwrap();

    // a legacy order without a timestamp
    let mut raw: Vec<Value> = serde_json::from_str(
        &ledger
            .store()
            .get_value(StorageKey::Orders.as_str())
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    raw.push(json!({"storeName": "Viejo", "storeAddress": "x", "crateSize": "Cajón X"}));
    ledger
        .store()
        .set(StorageKey::Orders.as_str(), &Value::Array(raw).to_string())
        .unwrap();

    let groups = ledger.history().unwrap();
    let titles: Vec<String> = groups.iter().map(|g| g.title()).collect();
    assert_eq!(
        titles,
        vec![
            "Del 8 de enero al 14 de enero de 2024",
            "Del 1 de enero al 7 de enero de 2024",
            "Pedidos sin fecha registrada",
        ]
    );
    let names: Vec<&str> = groups[1]
        .orders
        .iter()
        .map(|o| o.store_name.as_str())
        .collect();
    assert_eq!(names, vec!["Domingo", "Lunes"]);

    let weeks = ledger.payment_weeks(&at(2024, 1, 10, 12)).unwrap();
    assert_eq!(weeks.len(), 2);
    assert!(weeks[0].start > weeks[1].start);
}

#[test]
fn test_legacy_order_tracked_by_timestamp() {
    let ledger = make_test_ledger(Arc::new(MemoryStore::new()));
    let placed = at(2024, 2, 6, 11);
    let millis = placed.timestamp_millis();
    ledger
        .store()
        .set(
            StorageKey::Orders.as_str(),
            &json!([{"storeName": "Viejo", "storeAddress": "x", "crateSize": "Cajón de 7 cabezas",
                     "quantity": "2", "totalPrice": "1500", "timestamp": millis}])
            .to_string(),
        )
        .unwrap();

    let pending = ledger.pending_payments(&week_boundaries(&placed)).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, OrderId::from_timestamp(millis));
    assert_eq!(pending[0].order.total_price, 1500.0);

    let admin = luca(&ledger);
    assert!(ledger
        .set_payment_status(&admin, &pending[0].id, PaymentStatus::Paid, placed)
        .unwrap());
    assert!(ledger
        .pending_payments(&week_boundaries(&placed))
        .unwrap()
        .is_empty());
}

#[test]
fn test_permissions_are_enforced() {
    let ledger = make_test_ledger(Arc::new(MemoryStore::new()));
    let franco = ledger.authenticate_admin(" franco ", " 1234 ", Local::now()).unwrap();

    assert!(matches!(
        ledger.clear_orders(&franco, Local::now()),
        Err(LedgerError::PermissionDenied(_))
    ));
    assert!(matches!(
        ledger.clear_log(&franco, LogKind::Payments, Local::now()),
        Err(LedgerError::PermissionDenied(_))
    ));
    assert!(matches!(
        ledger.add_admin(&franco, "ana", "pw", Local::now()),
        Err(LedgerError::PermissionDenied(_))
    ));

    // inventory edits are open to every admin
    stock_crate(&ledger, &franco, CrateId::Nine, 3, 100.0);

    let manager = ledger
        .authenticate_delivery("luca", "Luca-admin", Local::now())
        .unwrap();
    assert!(matches!(
        ledger.save_inventory(&manager, &[], Local::now()),
        Err(LedgerError::PermissionDenied(_))
    ));
}

#[test]
fn test_login_history_is_capped() {
    let config = parse_config(
        r#"
config_version = 1

[ledger]
login_history_cap = 3
"#,
    )
    .unwrap();
    let ledger = Ledger::new(config, Arc::new(MemoryStore::new()));
    let admin = luca(&ledger);

    for hour in 0..5 {
        ledger.record_login(&admin, at(2024, 3, 1, hour));
    }

    let history = ledger.login_history().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].timestamp, at(2024, 3, 1, 2).timestamp_millis());
    assert_eq!(ledger.action_log(LogKind::AdminActions).unwrap().len(), 5);
}

#[test]
fn test_malformed_data_degrades_to_defaults() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    store.set(StorageKey::Orders.as_str(), "{not json").unwrap();
    store.set(StorageKey::Inventory.as_str(), "\"oops\"").unwrap();
    store.set(StorageKey::PaymentStatus.as_str(), "[1, 2]").unwrap();

    let ledger = make_test_ledger(store);
    assert!(ledger.orders().unwrap().is_empty());
    assert!(ledger.history().unwrap().is_empty());
    assert!(ledger.inventory().unwrap().iter().all(|item| item.stock == 0));
    assert_eq!(
        ledger.payment_status(&OrderId::from("x")).unwrap(),
        PaymentStatus::Pending
    );
}

#[test]
fn test_state_persists_in_sqlite_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = frigo_util::database_path(dir.path());

    {
        let ledger = make_test_ledger(Arc::new(SqliteStore::open(&path).unwrap()));
        let admin = luca(&ledger);
        stock_crate(&ledger, &admin, CrateId::Ten, 2, 750.0);
        ledger.add_admin(&admin, "Ana", "secreta", Local::now()).unwrap();

        let manager = ledger
            .authenticate_delivery("Martin", "1234", Local::now())
            .unwrap();
        ledger
            .add_delivery_account(&manager, "Pedro", "pw", Local::now())
            .unwrap();
    }

    let ledger = make_test_ledger(Arc::new(SqliteStore::open(&path).unwrap()));
    assert!(ledger.authenticate_admin("ana", "secreta", Local::now()).is_ok());
    let pedro = ledger.authenticate_delivery("PEDRO", "pw", Local::now()).unwrap();

    let order = ledger
        .confirm_order(&order_of("Carnicería", "10", "2"), Local::now())
        .unwrap();
    let receipt = ledger
        .delivery_receipt(&pedro, &order.identifier().unwrap(), Local::now())
        .unwrap();
    assert!(receipt.contains("Total:      $ 1.500,00"));
    assert!(receipt.contains("Repartidor: Pedro"));
}
