//! The ledger: every operation of the shop's order and payment workflow

use chrono::{DateTime, Local};
use frigo_config::LedgerConfig;
use frigo_store::{
    append_capped, load_document, load_list, save_json, ActionLogEntry, ConditionalWrite,
    LogKind, LoginEntry, StorageKey, Store, StoreError, ABSENT_VERSION,
};
use frigo_util::{to_epoch_millis, CrateId, OrderId, Permissions, WeekRange};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    apply_edits, describe_inventory_changes, describe_paid_action, group_orders_by_week,
    inventory_log_message, normalize_inventory, orders_from_value, payment_weeks,
    pending_payments, render_receipt, reserve, sanitize_admin_name, status_in, AccountError,
    AdminAccount, AdminDirectory, DeliveryAccount, DeliveryDirectory, InventoryEdit,
    InventoryItem, Order, OrderRequest, PasswordChange, PaymentState, PaymentStatus,
    PendingPayment, PermissionDenied, Reservation, ReservationError, Role, Session, WeekGroup,
};

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reservation(#[from] ReservationError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("Permission denied: {0}")]
    PermissionDenied(#[from] PermissionDenied),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result of an inventory save
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryUpdate {
    pub inventory: Vec<InventoryItem>,
    /// One fragment per changed crate; empty when nothing changed
    pub changes: Vec<String>,
}

/// The inventory and order ledger
pub struct Ledger {
    config: LedgerConfig,
    store: Arc<dyn Store>,
}

impl Ledger {
    /// Create a new ledger over a store
    pub fn new(config: LedgerConfig, store: Arc<dyn Store>) -> Self {
        info!(
            admins = config.admins.len(),
            managers = config.managers.len(),
            currency = %config.settings.currency,
            "Ledger initialized"
        );
        Self { config, store }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    // ----- inventory -----

    /// Current inventory, normalized. Seeds an empty snapshot on first access.
    pub fn inventory(&self) -> LedgerResult<Vec<InventoryItem>> {
        let doc = load_document(self.store.as_ref(), StorageKey::Inventory)?;
        let inventory = normalize_inventory(&doc.value);

        if doc.version == ABSENT_VERSION {
            save_json(self.store.as_ref(), StorageKey::Inventory, &inventory)?;
            debug!("Seeded empty inventory");
        }

        Ok(inventory)
    }

    /// Apply admin edits to the inventory and persist the full snapshot
    pub fn save_inventory(
        &self,
        session: &Session,
        edits: &[(CrateId, InventoryEdit)],
        now: DateTime<Local>,
    ) -> LedgerResult<InventoryUpdate> {
        session.require_admin()?;

        let previous = self.inventory()?;
        let inventory = apply_edits(&previous, edits);
        let changes = describe_inventory_changes(&previous, &inventory);

        save_json(self.store.as_ref(), StorageKey::Inventory, &inventory)?;
        info!(admin = %session.display_name, changed = changes.len(), "Inventory saved");

        self.append_log(
            LogKind::AdminActions,
            &inventory_log_message(&changes),
            &session.display_name,
            now,
        );

        Ok(InventoryUpdate { inventory, changes })
    }

    // ----- orders -----

    /// Validate an order against current stock without touching anything
    pub fn review_order(&self, request: &OrderRequest) -> LedgerResult<Reservation> {
        let doc = load_document(self.store.as_ref(), StorageKey::Inventory)?;
        let reservation = reserve(request, &normalize_inventory(&doc.value))?;
        debug!(
            crate_id = %reservation.item.id,
            quantity = reservation.quantity,
            "Order reviewed"
        );
        Ok(reservation)
    }

    /// Re-validate against freshly read stock and persist the order.
    ///
    /// The inventory snapshot and the order list are written in one commit
    /// guarded by the versions read here. If another writer got in between,
    /// nothing is written and `ReservationError::Conflict` is returned; the
    /// caller may review and resubmit.
    pub fn confirm_order(&self, request: &OrderRequest, now: DateTime<Local>) -> LedgerResult<Order> {
        let store = self.store.as_ref();
        let inventory_doc = load_document(store, StorageKey::Inventory)?;
        let orders_doc = load_document(store, StorageKey::Orders)?;

        let reservation = reserve(request, &normalize_inventory(&inventory_doc.value))?;
        let remaining = reservation.remaining_stock();
        let updated_inventory = serde_json::to_string(&reservation.updated_inventory)
            .map_err(StoreError::from)?;

        let order = reservation.into_order(OrderId::new(), to_epoch_millis(&now));
        let mut orders = orders_doc.elements().to_vec();
        orders.push(serde_json::to_value(&order).map_err(StoreError::from)?);
        let orders = serde_json::to_string(&orders).map_err(StoreError::from)?;

        let writes = [
            ConditionalWrite::new(StorageKey::Inventory.as_str(), inventory_doc.version, updated_inventory),
            ConditionalWrite::new(StorageKey::Orders.as_str(), orders_doc.version, orders),
        ];

        match store.commit(&writes) {
            Ok(()) => {}
            Err(StoreError::VersionConflict(key)) => {
                warn!(%key, "Order confirmation lost a race, nothing written");
                return Err(ReservationError::Conflict.into());
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            order_id = ?order.id,
            crate_size = %order.crate_size,
            quantity = ?order.quantity,
            remaining,
            "Order placed"
        );
        Ok(order)
    }

    /// All stored orders, in stored order
    pub fn orders(&self) -> LedgerResult<Vec<Order>> {
        let doc = load_document(self.store.as_ref(), StorageKey::Orders)?;
        Ok(orders_from_value(&doc.value))
    }

    /// Find an order by its payment identifier
    pub fn find_order(&self, order_id: &OrderId) -> LedgerResult<Order> {
        self.orders()?
            .into_iter()
            .find(|order| order.identifier().as_ref() == Some(order_id))
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.clone()))
    }

    /// Order history grouped by week
    pub fn history(&self) -> LedgerResult<Vec<WeekGroup>> {
        Ok(group_orders_by_week(&self.orders()?))
    }

    /// Delete the whole order history. Returns how many orders were removed.
    pub fn clear_orders(&self, session: &Session, now: DateTime<Local>) -> LedgerResult<usize> {
        session.require(Permissions::CLEAR_ORDERS)?;

        let count = self.orders()?.len();
        self.store.remove(StorageKey::Orders.as_str())?;
        info!(admin = %session.display_name, count, "Order history cleared");

        self.append_log(
            LogKind::AdminActions,
            "Borró el historial de pedidos",
            &session.display_name,
            now,
        );
        Ok(count)
    }

    // ----- payments -----

    fn payment_states(&self) -> LedgerResult<Value> {
        Ok(load_document(self.store.as_ref(), StorageKey::PaymentStatus)?.value)
    }

    /// Weeks selectable in the payments view, most recent first
    pub fn payment_weeks(&self, now: &DateTime<Local>) -> LedgerResult<Vec<WeekRange>> {
        Ok(payment_weeks(&self.orders()?, now))
    }

    /// Orders of `week` still awaiting payment
    pub fn pending_payments(&self, week: &WeekRange) -> LedgerResult<Vec<PendingPayment>> {
        Ok(pending_payments(&self.orders()?, week, &self.payment_states()?))
    }

    /// Current payment status of an order
    pub fn payment_status(&self, order_id: &OrderId) -> LedgerResult<PaymentStatus> {
        Ok(status_in(&self.payment_states()?, order_id.as_str()))
    }

    /// Move an order to `desired`. Returns `false` when it already had that
    /// status, in which case nothing is written or logged. Only transitions
    /// to paid are written to the payment log.
    pub fn set_payment_status(
        &self,
        session: &Session,
        order_id: &OrderId,
        desired: PaymentStatus,
        now: DateTime<Local>,
    ) -> LedgerResult<bool> {
        session.require(Permissions::MANAGE_PAYMENTS)?;
        let order = self.find_order(order_id)?;

        let doc = load_document(self.store.as_ref(), StorageKey::PaymentStatus)?;
        if status_in(&doc.value, order_id.as_str()) == desired {
            debug!(%order_id, status = %desired, "Payment status unchanged");
            return Ok(false);
        }

        let admin = sanitize_admin_name(&session.display_name);
        let state = PaymentState {
            status: desired,
            updated_at: Some(to_epoch_millis(&now)),
            admin: Some(admin.clone()),
        };

        let mut states = match doc.value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        states.insert(
            order_id.to_string(),
            serde_json::to_value(&state).map_err(StoreError::from)?,
        );
        save_json(self.store.as_ref(), StorageKey::PaymentStatus, &states)?;

        info!(%order_id, status = %desired, %admin, "Payment status changed");

        if desired == PaymentStatus::Paid {
            self.append_log(LogKind::Payments, &describe_paid_action(&order), &admin, now);
        }
        Ok(true)
    }

    // ----- audit logs -----

    fn log_cap(&self, kind: LogKind) -> usize {
        let settings = &self.config.settings;
        match kind {
            LogKind::AdminActions => settings.action_log_cap,
            LogKind::Payments => settings.payment_log_cap,
            LogKind::Logins => settings.login_history_cap,
        }
    }

    /// Append an entry to a capped log.
    ///
    /// Fire-and-forget: a failed write is reported and otherwise ignored, the
    /// change being logged stands. Blank messages or actors are skipped.
    pub fn append_log(&self, kind: LogKind, message: &str, actor: &str, now: DateTime<Local>) {
        if message.trim().is_empty() || actor.trim().is_empty() {
            return;
        }

        let timestamp = to_epoch_millis(&now);
        let cap = self.log_cap(kind);
        let store = self.store.as_ref();
        let result = match kind {
            LogKind::Logins => append_capped(
                store,
                kind.key(),
                LoginEntry {
                    name: actor.to_string(),
                    timestamp,
                },
                cap,
            ),
            LogKind::AdminActions | LogKind::Payments => append_capped(
                store,
                kind.key(),
                ActionLogEntry {
                    action: message.to_string(),
                    admin: actor.to_string(),
                    timestamp,
                },
                cap,
            ),
        };

        if let Err(e) = result {
            error!(log = %kind, error = %e, "Failed to persist log entry");
        }
    }

    /// Record an admin login in the login history and the action log
    pub fn record_login(&self, session: &Session, now: DateTime<Local>) {
        self.append_log(LogKind::Logins, "Inició sesión", &session.display_name, now);
        self.append_log(LogKind::AdminActions, "Inició sesión", &session.display_name, now);
    }

    pub fn record_logout(&self, session: &Session, now: DateTime<Local>) {
        self.append_log(LogKind::AdminActions, "Cerró sesión", &session.display_name, now);
    }

    /// Entries of the action or payment log, oldest first
    pub fn action_log(&self, kind: LogKind) -> LedgerResult<Vec<ActionLogEntry>> {
        if kind == LogKind::Logins {
            return Ok(Vec::new());
        }
        Ok(load_list(self.store.as_ref(), kind.key())?)
    }

    /// Admin login history, oldest first
    pub fn login_history(&self) -> LedgerResult<Vec<LoginEntry>> {
        Ok(load_list(self.store.as_ref(), LogKind::Logins.key())?)
    }

    /// Empty a log, then note the reset in the action log
    pub fn clear_log(&self, session: &Session, kind: LogKind, now: DateTime<Local>) -> LedgerResult<()> {
        session.require(Permissions::CLEAR_ORDERS)?;

        self.store.remove(kind.key().as_str())?;
        info!(log = %kind, admin = %session.display_name, "Log cleared");

        self.append_log(
            LogKind::AdminActions,
            kind.reset_message(),
            &session.display_name,
            now,
        );
        Ok(())
    }

    // ----- admin accounts -----

    pub fn admin_directory(&self) -> LedgerResult<AdminDirectory> {
        let store = self.store.as_ref();
        let custom = load_document(store, StorageKey::CustomAdmins)?;
        let overrides = load_document(store, StorageKey::AdminOverrides)?;
        Ok(AdminDirectory::new(&self.config.admins, &custom.value, &overrides.value))
    }

    /// Check admin credentials. Does not record a login.
    pub fn authenticate_admin(&self, name: &str, password: &str, now: DateTime<Local>) -> LedgerResult<Session> {
        let directory = self.admin_directory()?;
        match directory.authenticate(name, password, now) {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!(name = %name.trim(), "Admin authentication failed");
                Err(e.into())
            }
        }
    }

    pub fn add_admin(
        &self,
        session: &Session,
        name: &str,
        password: &str,
        now: DateTime<Local>,
    ) -> LedgerResult<AdminAccount> {
        session.require(Permissions::MANAGE_ADMINS)?;

        let mut directory = self.admin_directory()?;
        let account = directory.add(name, password)?;
        save_json(self.store.as_ref(), StorageKey::CustomAdmins, directory.custom_accounts())?;
        info!(username = %account.username, by = %session.display_name, "Admin added");

        self.append_log(
            LogKind::AdminActions,
            &format!("Agregó a {} como administrador", account.username),
            &session.display_name,
            now,
        );
        Ok(account)
    }

    pub fn update_admin_password(
        &self,
        session: &Session,
        target: &str,
        new_password: &str,
        now: DateTime<Local>,
    ) -> LedgerResult<AdminAccount> {
        session.require(Permissions::MANAGE_ADMIN_PASSWORDS)?;

        let mut directory = self.admin_directory()?;
        let (account, change) = directory.update_password(target, new_password)?;
        let store = self.store.as_ref();
        match change {
            PasswordChange::CustomAccount => {
                save_json(store, StorageKey::CustomAdmins, directory.custom_accounts())?;
            }
            PasswordChange::Override => {
                save_json(store, StorageKey::AdminOverrides, directory.overrides())?;
            }
        }
        info!(username = %account.username, ?change, "Admin password updated");

        self.append_log(
            LogKind::AdminActions,
            &format!("Actualizó la contraseña de {}", account.display_name),
            &session.display_name,
            now,
        );
        Ok(account)
    }

    // ----- delivery portal -----

    pub fn delivery_directory(&self) -> LedgerResult<DeliveryDirectory> {
        let stored = load_document(self.store.as_ref(), StorageKey::DeliveryAccounts)?;
        Ok(DeliveryDirectory::new(&self.config.managers, &stored.value))
    }

    pub fn authenticate_delivery(&self, username: &str, password: &str, now: DateTime<Local>) -> LedgerResult<Session> {
        let directory = self.delivery_directory()?;
        match directory.authenticate(username, password, now) {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!(username = %username.trim(), "Delivery authentication failed");
                Err(e.into())
            }
        }
    }

    /// Stored courier accounts, newest registration first
    pub fn delivery_accounts(&self, session: &Session) -> LedgerResult<Vec<DeliveryAccount>> {
        session.require_manager()?;
        Ok(self.delivery_directory()?.sorted_accounts())
    }

    pub fn add_delivery_account(
        &self,
        session: &Session,
        username: &str,
        password: &str,
        now: DateTime<Local>,
    ) -> LedgerResult<DeliveryAccount> {
        session.require_manager()?;

        let mut directory = self.delivery_directory()?;
        let account = directory.add(username, password, now)?;
        save_json(self.store.as_ref(), StorageKey::DeliveryAccounts, directory.accounts())?;
        info!(username = %account.username, by = %session.display_name, "Delivery account added");
        Ok(account)
    }

    pub fn remove_delivery_account(&self, session: &Session, username: &str) -> LedgerResult<usize> {
        session.require_manager()?;

        let mut directory = self.delivery_directory()?;
        let removed = directory.remove(username)?;
        save_json(self.store.as_ref(), StorageKey::DeliveryAccounts, directory.accounts())?;
        info!(username = %username.trim(), count = removed.len(), "Delivery account removed");
        Ok(removed.len())
    }

    /// Printable receipt for an order, signed by the courier of `session`
    pub fn delivery_receipt(&self, session: &Session, order_id: &OrderId, now: DateTime<Local>) -> LedgerResult<String> {
        if session.role == Role::Admin {
            return Err(PermissionDenied {
                actor: session.display_name.clone(),
                required: "print delivery receipts".to_string(),
            }
            .into());
        }
        let order = self.find_order(order_id)?;
        Ok(render_receipt(&order, &session.display_name, &now))
    }
}
