//! Admin and delivery account directories
//!
//! Built-in accounts come from configuration. Extra accounts live in the
//! store and are read leniently: entries without a username or password
//! are dropped and duplicates (by normalized username) collapse, the last
//! one winning.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use frigo_config::{AdminDefinition, ManagerDefinition};
use frigo_util::{normalize_identifier, Permissions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

use crate::session::{Role, Session};

/// Account problems, worded for the person at the form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("Usuario o contraseña incorrectos.")]
    InvalidCredentials,

    #[error("Ingrese un nombre para el nuevo administrador.")]
    MissingAdminName,

    #[error("Ingrese una contraseña para el nuevo administrador.")]
    MissingAdminPassword,

    #[error("Ya existe un administrador con ese nombre.")]
    DuplicateAdmin,

    #[error("Seleccione un administrador a actualizar.")]
    MissingTarget,

    #[error("Ingrese la nueva contraseña.")]
    MissingNewPassword,

    #[error("No se encontró el administrador seleccionado.")]
    AdminNotFound,

    #[error("Complete el usuario y la contraseña para continuar.")]
    MissingDeliveryCredentials,

    #[error("Ingrese un usuario válido.")]
    InvalidUsername,

    #[error("Ese usuario ya está registrado. Elija otro nombre.")]
    DuplicateDelivery,

    #[error("No se encontró el usuario \"{0}\".")]
    DeliveryNotFound(String),
}

pub type AccountResult<T> = Result<T, AccountError>;

/// Keep the last entry per normalized username, at the position of the first
fn dedup_last_wins<T>(entries: impl IntoIterator<Item = T>, username: impl Fn(&T) -> &str) -> Vec<T> {
    let mut keys: Vec<String> = Vec::new();
    let mut out: Vec<T> = Vec::new();
    for entry in entries {
        let key = normalize_identifier(username(&entry));
        if key.is_empty() {
            continue;
        }
        match keys.iter().position(|k| *k == key) {
            Some(index) => out[index] = entry,
            None => {
                keys.push(key);
                out.push(entry);
            }
        }
    }
    out
}

fn string_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// An admin account, built-in or stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccount {
    pub username: String,
    pub password: String,
    pub display_name: String,
    #[serde(default)]
    pub permissions: Permissions,
}

impl AdminAccount {
    /// Sanitize a stored entry. Username is trimmed, display name falls
    /// back to the username, anything but an object grants no permissions.
    pub fn from_stored(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let username = string_field(value, "username").unwrap_or_default().trim();
        let password = string_field(value, "password").unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return None;
        }

        let display_name = string_field(value, "displayName")
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(username);

        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
            display_name: display_name.to_string(),
            permissions: value
                .get("permissions")
                .map(Permissions::from_stored)
                .unwrap_or_default(),
        })
    }

    fn from_definition(def: &AdminDefinition) -> Self {
        Self {
            username: def.username.clone(),
            password: def.password.clone(),
            display_name: def.display_name.clone(),
            permissions: def.permissions,
        }
    }

    fn identity(&self) -> String {
        normalize_identifier(&self.username)
    }
}

/// Replacement password for a built-in admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminOverride {
    pub username: String,
    pub password: String,
}

impl AdminOverride {
    pub fn from_stored(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let username = string_field(value, "username").unwrap_or_default().trim();
        let password = string_field(value, "password").unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Where a password change was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordChange {
    /// A stored custom account was rewritten
    CustomAccount,
    /// A built-in account got an override
    Override,
}

/// Every admin who may log in
#[derive(Debug, Clone)]
pub struct AdminDirectory {
    builtins: Vec<AdminAccount>,
    custom: Vec<AdminAccount>,
    overrides: Vec<AdminOverride>,
}

impl AdminDirectory {
    pub fn new(builtins: &[AdminDefinition], custom: &Value, overrides: &Value) -> Self {
        let elements = |v: &Value| v.as_array().cloned().unwrap_or_default();

        Self {
            builtins: builtins.iter().map(AdminAccount::from_definition).collect(),
            custom: dedup_last_wins(
                elements(custom).iter().filter_map(AdminAccount::from_stored),
                |a| a.username.as_str(),
            ),
            overrides: dedup_last_wins(
                elements(overrides).iter().filter_map(AdminOverride::from_stored),
                |o| o.username.as_str(),
            ),
        }
    }

    /// Stored admins, in stored order
    pub fn custom_accounts(&self) -> &[AdminAccount] {
        &self.custom
    }

    pub fn overrides(&self) -> &[AdminOverride] {
        &self.overrides
    }

    /// Built-ins then custom admins, with overridden passwords applied
    pub fn all(&self) -> Vec<AdminAccount> {
        self.builtins
            .iter()
            .chain(&self.custom)
            .map(|account| self.with_override(account.clone()))
            .collect()
    }

    fn with_override(&self, mut account: AdminAccount) -> AdminAccount {
        let identity = account.identity();
        if let Some(o) = self
            .overrides
            .iter()
            .find(|o| normalize_identifier(&o.username) == identity)
        {
            account.password = o.password.clone();
        }
        account
    }

    /// Look up an admin by username, ignoring case, accents and padding
    pub fn find(&self, identifier: &str) -> Option<AdminAccount> {
        let wanted = normalize_identifier(identifier);
        if wanted.is_empty() {
            return None;
        }
        self.builtins
            .iter()
            .chain(&self.custom)
            .find(|account| account.identity() == wanted)
            .map(|account| self.with_override(account.clone()))
    }

    /// Check credentials and open an admin session
    pub fn authenticate(&self, name: &str, password: &str, now: DateTime<Local>) -> AccountResult<Session> {
        let name = name.trim();
        let password = password.trim();
        if name.is_empty() || password.is_empty() {
            return Err(AccountError::InvalidCredentials);
        }

        let account = self
            .find(name)
            .filter(|account| account.password == password)
            .ok_or(AccountError::InvalidCredentials)?;

        Ok(Session::new(
            account.username,
            account.display_name,
            Role::Admin,
            account.permissions,
            now,
        ))
    }

    /// Register a new admin. New admins start without permissions.
    pub fn add(&mut self, name: &str, password: &str) -> AccountResult<AdminAccount> {
        let name = name.trim();
        let password = password.trim();
        if name.is_empty() {
            return Err(AccountError::MissingAdminName);
        }
        if password.is_empty() {
            return Err(AccountError::MissingAdminPassword);
        }
        if self.find(name).is_some() {
            return Err(AccountError::DuplicateAdmin);
        }

        let account = AdminAccount {
            username: name.to_string(),
            password: password.to_string(),
            display_name: name.to_string(),
            permissions: Permissions::empty(),
        };
        self.custom.push(account.clone());
        Ok(account)
    }

    /// Change an admin's password. Custom accounts are rewritten in place;
    /// built-ins get an override entry replacing any previous one.
    pub fn update_password(&mut self, target: &str, new_password: &str) -> AccountResult<(AdminAccount, PasswordChange)> {
        let target = target.trim();
        if target.is_empty() {
            return Err(AccountError::MissingTarget);
        }
        if new_password.is_empty() {
            return Err(AccountError::MissingNewPassword);
        }

        let account = self.find(target).ok_or(AccountError::AdminNotFound)?;
        let identity = account.identity();

        if let Some(custom) = self.custom.iter_mut().find(|c| c.identity() == identity) {
            custom.password = new_password.to_string();
            return Ok((custom.clone(), PasswordChange::CustomAccount));
        }

        self.overrides
            .retain(|o| normalize_identifier(&o.username) != identity);
        self.overrides.push(AdminOverride {
            username: account.username.clone(),
            password: new_password.to_string(),
        });

        Ok((self.with_override(account), PasswordChange::Override))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryRole {
    Manager,
    Delivery,
}

/// A delivery-portal account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAccount {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub role: DeliveryRole,
    /// ISO-8601 creation time
    pub created_at: Option<String>,
}

impl DeliveryAccount {
    /// Stored entries need string `username` and `password`; the rest defaults
    pub fn from_stored(value: &Value) -> Option<Self> {
        let username = string_field(value, "username")?;
        let password = string_field(value, "password")?;
        let role = match string_field(value, "role") {
            Some("manager") => DeliveryRole::Manager,
            _ => DeliveryRole::Delivery,
        };

        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
            display_name: string_field(value, "displayName")
                .unwrap_or(username)
                .to_string(),
            role,
            created_at: string_field(value, "createdAt").map(str::to_string),
        })
    }

    fn from_definition(def: &ManagerDefinition) -> Self {
        Self {
            username: def.username.clone(),
            password: def.password.clone(),
            display_name: def.display_name.clone(),
            role: DeliveryRole::Manager,
            created_at: None,
        }
    }

    fn identity(&self) -> String {
        normalize_identifier(&self.username)
    }

    fn created_millis(&self) -> Option<i64> {
        self.created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp_millis())
    }

    /// Display form of the registration date
    pub fn created_label(&self) -> String {
        match self.created_at.as_deref().map(DateTime::parse_from_rfc3339) {
            Some(Ok(dt)) => frigo_util::format_datetime_es(&dt.with_timezone(&Local)),
            _ => "Registro sin fecha disponible".to_string(),
        }
    }
}

/// Newest registrations first; undated accounts last, by username
fn registration_order(a: &DeliveryAccount, b: &DeliveryAccount) -> Ordering {
    match (&a.created_at, &b.created_at) {
        (Some(_), Some(_)) => b
            .created_millis()
            .cmp(&a.created_millis())
            .then_with(|| a.identity().cmp(&b.identity())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.identity().cmp(&b.identity()),
    }
}

/// Managers from configuration plus stored courier accounts
#[derive(Debug, Clone)]
pub struct DeliveryDirectory {
    managers: Vec<DeliveryAccount>,
    accounts: Vec<DeliveryAccount>,
}

impl DeliveryDirectory {
    pub fn new(managers: &[ManagerDefinition], stored: &Value) -> Self {
        Self {
            managers: managers.iter().map(DeliveryAccount::from_definition).collect(),
            accounts: stored
                .as_array()
                .map(|entries| entries.iter().filter_map(DeliveryAccount::from_stored).collect())
                .unwrap_or_default(),
        }
    }

    /// Stored accounts, in stored order
    pub fn accounts(&self) -> &[DeliveryAccount] {
        &self.accounts
    }

    /// Stored accounts for display
    pub fn sorted_accounts(&self) -> Vec<DeliveryAccount> {
        let mut sorted = self.accounts.clone();
        sorted.sort_by(registration_order);
        sorted
    }

    /// Managers take precedence over stored accounts with the same name
    pub fn find(&self, identifier: &str) -> Option<&DeliveryAccount> {
        let wanted = normalize_identifier(identifier);
        if wanted.is_empty() {
            return None;
        }
        self.managers
            .iter()
            .chain(&self.accounts)
            .find(|account| account.identity() == wanted)
    }

    pub fn is_taken(&self, identifier: &str) -> bool {
        self.find(identifier).is_some()
    }

    pub fn authenticate(&self, username: &str, password: &str, now: DateTime<Local>) -> AccountResult<Session> {
        let account = self
            .find(username)
            .filter(|account| account.password == password)
            .ok_or(AccountError::InvalidCredentials)?;

        let role = match account.role {
            DeliveryRole::Manager => Role::Manager,
            DeliveryRole::Delivery => Role::Delivery,
        };
        Ok(Session::new(
            account.username.clone(),
            account.display_name.clone(),
            role,
            Permissions::empty(),
            now,
        ))
    }

    /// Register a courier. Names must be unique across managers and couriers.
    pub fn add(&mut self, username: &str, password: &str, now: DateTime<Local>) -> AccountResult<DeliveryAccount> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::MissingDeliveryCredentials);
        }
        if normalize_identifier(username).is_empty() {
            return Err(AccountError::InvalidUsername);
        }
        if self.is_taken(username) {
            return Err(AccountError::DuplicateDelivery);
        }

        let account = DeliveryAccount {
            username: username.to_string(),
            password: password.to_string(),
            display_name: username.to_string(),
            role: DeliveryRole::Delivery,
            created_at: Some(
                now.with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        };
        self.accounts.push(account.clone());
        Ok(account)
    }

    /// Remove every stored account matching `username`
    pub fn remove(&mut self, username: &str) -> AccountResult<Vec<DeliveryAccount>> {
        let wanted = normalize_identifier(username);
        if wanted.is_empty() {
            return Err(AccountError::InvalidUsername);
        }

        let (removed, kept): (Vec<_>, Vec<_>) = self
            .accounts
            .drain(..)
            .partition(|account| account.identity() == wanted);
        self.accounts = kept;

        if removed.is_empty() {
            return Err(AccountError::DeliveryNotFound(username.trim().to_string()));
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frigo_config::{builtin_admins, builtin_managers};
    use serde_json::json;

    fn admins(custom: Value, overrides: Value) -> AdminDirectory {
        AdminDirectory::new(&builtin_admins(), &custom, &overrides)
    }

    #[test]
    fn builtin_login_ignores_case_and_accents() {
        let dir = admins(json!(null), json!(null));
        let session = dir.authenticate(" LÚCA ", " Luca-admin ", Local::now()).unwrap();
        assert_eq!(session.display_name, "Luca");
        assert_eq!(session.permissions, Permissions::all());

        assert_eq!(
            dir.authenticate("luca", "wrong", Local::now()),
            Err(AccountError::InvalidCredentials)
        );
        assert_eq!(dir.authenticate("", "x", Local::now()), Err(AccountError::InvalidCredentials));
    }

    #[test]
    fn custom_admins_are_sanitized_and_deduplicated() {
        let custom = json!([
            {"username": " ana ", "password": "1", "displayName": " "},
            {"username": "", "password": "x"},
            {"username": "bob"},
            "garbage",
            {"username": "ANA", "password": "2", "permissions": {"clearOrders": true}},
        ]);
        let dir = admins(custom, json!(null));

        assert_eq!(dir.custom_accounts().len(), 1);
        let ana = &dir.custom_accounts()[0];
        assert_eq!(ana.username, "ANA");
        assert_eq!(ana.display_name, "ANA");
        assert_eq!(ana.permissions, Permissions::CLEAR_ORDERS);
    }

    #[test]
    fn add_admin_rejects_duplicates() {
        let mut dir = admins(json!(null), json!(null));
        assert_eq!(dir.add("Martín", "x"), Err(AccountError::DuplicateAdmin));
        assert_eq!(dir.add(" ", "x"), Err(AccountError::MissingAdminName));
        assert_eq!(dir.add("ana", " "), Err(AccountError::MissingAdminPassword));

        let ana = dir.add(" Ana ", "pw").unwrap();
        assert_eq!(ana.username, "Ana");
        assert!(ana.permissions.is_empty());
        assert_eq!(dir.add("ana", "pw"), Err(AccountError::DuplicateAdmin));

        let stored = serde_json::to_value(dir.custom_accounts()).unwrap();
        assert_eq!(
            stored,
            json!([{"username": "Ana", "password": "pw", "displayName": "Ana", "permissions": {}}])
        );
    }

    #[test]
    fn password_updates_builtin_via_override() {
        let mut dir = admins(json!(null), json!([{"username": "franco", "password": "old"}]));
        assert!(dir.authenticate("franco", "old", Local::now()).is_ok());

        let (account, change) = dir.update_password("Franco", "nueva").unwrap();
        assert_eq!(change, PasswordChange::Override);
        assert_eq!(account.display_name, "Franco");
        assert_eq!(dir.overrides().len(), 1);
        assert!(dir.authenticate("franco", "nueva", Local::now()).is_ok());
        assert!(dir.authenticate("franco", "1234", Local::now()).is_err());
    }

    #[test]
    fn password_updates_custom_in_place() {
        let mut dir = admins(json!([{"username": "ana", "password": "1"}]), json!(null));
        let (_, change) = dir.update_password("ANA", "2").unwrap();
        assert_eq!(change, PasswordChange::CustomAccount);
        assert_eq!(dir.custom_accounts()[0].password, "2");
        assert!(dir.overrides().is_empty());

        assert_eq!(dir.update_password("zoe", "2"), Err(AccountError::AdminNotFound));
        assert_eq!(dir.update_password("ana", ""), Err(AccountError::MissingNewPassword));
        assert_eq!(dir.update_password("  ", "x"), Err(AccountError::MissingTarget));
    }

    #[test]
    fn delivery_accounts_are_unique_across_managers() {
        let mut dir = DeliveryDirectory::new(&builtin_managers(), &json!(null));
        let now = Local::now();

        assert_eq!(dir.add("martin", "x", now), Err(AccountError::DuplicateDelivery));
        assert_eq!(dir.add("", "x", now), Err(AccountError::MissingDeliveryCredentials));
        assert_eq!(dir.add("\u{0301}", "x", now), Err(AccountError::InvalidUsername));

        let pedro = dir.add("Pedro", "pw", now).unwrap();
        assert_eq!(pedro.role, DeliveryRole::Delivery);
        assert!(pedro.created_at.as_deref().is_some_and(|s| s.ends_with('Z')));
        assert_eq!(dir.add("pedro", "pw", now), Err(AccountError::DuplicateDelivery));

        let session = dir.authenticate("PEDRO", "pw", now).unwrap();
        assert_eq!(session.role, Role::Delivery);
        let manager = dir.authenticate("luca", "Luca-admin", now).unwrap();
        assert_eq!(manager.role, Role::Manager);
    }

    #[test]
    fn delivery_listing_order() {
        let stored = json!([
            {"username": "zeta", "password": "1"},
            {"username": "old", "password": "1", "createdAt": "2024-01-01T10:00:00.000Z"},
            {"username": "alfa", "password": "1"},
            {"username": "new", "password": "1", "createdAt": "2024-03-01T10:00:00.000Z"},
            {"username": 5, "password": "1"},
        ]);
        let dir = DeliveryDirectory::new(&builtin_managers(), &stored);
        let names: Vec<_> = dir.sorted_accounts().into_iter().map(|a| a.username).collect();
        assert_eq!(names, vec!["new", "old", "alfa", "zeta"]);
    }

    #[test]
    fn delivery_removal() {
        let stored = json!([{"username": "Pedro", "password": "1"}, {"username": "ana", "password": "1"}]);
        let mut dir = DeliveryDirectory::new(&builtin_managers(), &stored);

        let removed = dir.remove("pedro").unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(dir.accounts().len(), 1);
        assert_eq!(
            dir.remove("pedro"),
            Err(AccountError::DeliveryNotFound("pedro".into()))
        );
        // managers are not stored accounts
        assert!(dir.remove("luca").is_err());
    }
}
