//! frigorifico - crate orders, stock and payments from the command line
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization
//! - The ledger
//! - One subcommand per screen of the shop (order form, admin dashboard,
//!   delivery portal)

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use frigo_config::load_or_default;
use frigo_core::{
    format_currency, InventoryEdit, Ledger, OrderRequest, PaymentStatus, Session,
};
use frigo_store::{LogKind, SqliteStore, Store};
use frigo_util::{
    database_path, default_config_path, format_millis_es, week_boundaries, week_of_date, CrateId,
    OrderId, FRIGO_DATA_DIR_ENV,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// frigorifico - Crate orders, stock and payments for a meat packing shop
#[derive(Parser, Debug)]
#[command(name = "frigorifico")]
#[command(about = "Crate orders, stock and payments for a meat packing shop", long_about = None)]
struct Cli {
    /// Configuration file path (default: ~/.config/frigorifico/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set FRIGO_DATA_DIR env var)
    #[arg(short, long, env = FRIGO_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stock and prices
    #[command(subcommand)]
    Inventory(InventoryCommand),
    /// Customer order form
    #[command(subcommand)]
    Order(OrderCommand),
    /// Order history
    #[command(subcommand)]
    Orders(OrdersCommand),
    /// Weekly payment collection
    #[command(subcommand)]
    Payments(PaymentsCommand),
    /// Audit logs
    #[command(subcommand)]
    Logs(LogsCommand),
    /// Admin accounts
    #[command(subcommand)]
    Admins(AdminsCommand),
    /// Delivery portal
    #[command(subcommand)]
    Delivery(DeliveryCommand),
}

#[derive(Args, Debug)]
struct AdminLogin {
    /// Admin username
    #[arg(long)]
    admin: String,
    #[arg(long)]
    password: String,
}

#[derive(Args, Debug)]
struct ManagerLogin {
    /// Delivery-portal manager username
    #[arg(long)]
    manager: String,
    #[arg(long)]
    password: String,
}

#[derive(Args, Debug)]
struct OrderForm {
    /// Store name
    #[arg(long = "store")]
    store_name: String,
    /// Store address
    #[arg(long = "address")]
    store_address: String,
    /// Crate id (X, 6, 7, 8, 9, 10)
    #[arg(long = "crate")]
    crate_id: String,
    #[arg(long)]
    quantity: String,
}

impl From<OrderForm> for OrderRequest {
    fn from(form: OrderForm) -> Self {
        OrderRequest {
            store_name: form.store_name,
            store_address: form.store_address,
            crate_id: form.crate_id,
            quantity: form.quantity,
        }
    }
}

#[derive(Subcommand, Debug)]
enum InventoryCommand {
    /// Show current stock and prices
    Show,
    /// Change stock and/or price of one crate
    Set {
        #[command(flatten)]
        login: AdminLogin,
        #[arg(long = "crate")]
        crate_id: CrateId,
        #[arg(long)]
        stock: Option<String>,
        #[arg(long)]
        price: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum OrderCommand {
    /// Check an order against current stock without placing it
    Review(OrderForm),
    /// Place an order
    Place(OrderForm),
}

#[derive(Subcommand, Debug)]
enum OrdersCommand {
    /// Orders grouped by week
    History,
    /// Delete the whole order history
    Clear(AdminLogin),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct StatusChoice {
    #[arg(long)]
    paid: bool,
    #[arg(long)]
    pending: bool,
}

impl StatusChoice {
    fn status(&self) -> PaymentStatus {
        if self.paid {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Pending
        }
    }
}

#[derive(Subcommand, Debug)]
enum PaymentsCommand {
    /// Weeks with orders, most recent first
    Weeks,
    /// Unpaid orders of a week
    Pending {
        /// Any day of the week (default: this week)
        #[arg(long)]
        week: Option<NaiveDate>,
    },
    /// Mark an order as paid or pending
    Mark {
        #[command(flatten)]
        login: AdminLogin,
        #[arg(long)]
        order: OrderId,
        #[command(flatten)]
        status: StatusChoice,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogName {
    Actions,
    Payments,
    Logins,
}

impl From<LogName> for LogKind {
    fn from(name: LogName) -> Self {
        match name {
            LogName::Actions => LogKind::AdminActions,
            LogName::Payments => LogKind::Payments,
            LogName::Logins => LogKind::Logins,
        }
    }
}

#[derive(Subcommand, Debug)]
enum LogsCommand {
    /// Admin action log
    Actions,
    /// Payment log
    Payments,
    /// Admin login history
    Logins,
    /// Reset a log
    Clear {
        log: LogName,
        #[command(flatten)]
        login: AdminLogin,
    },
}

#[derive(Subcommand, Debug)]
enum AdminsCommand {
    /// Open an admin session and record it
    Login(AdminLogin),
    /// Record the end of an admin session
    Logout(AdminLogin),
    /// List admin accounts
    List(AdminLogin),
    /// Create an admin account
    Add {
        #[command(flatten)]
        login: AdminLogin,
        #[arg(long)]
        name: String,
        #[arg(long)]
        new_password: String,
    },
    /// Change an admin's password
    Passwd {
        #[command(flatten)]
        login: AdminLogin,
        #[arg(long)]
        target: String,
        #[arg(long)]
        new_password: String,
    },
}

#[derive(Subcommand, Debug)]
enum DeliveryCommand {
    /// List courier accounts
    List(ManagerLogin),
    /// Register a courier
    Add {
        #[command(flatten)]
        login: ManagerLogin,
        #[arg(long)]
        username: String,
        #[arg(long)]
        new_password: String,
    },
    /// Remove a courier
    Remove {
        #[command(flatten)]
        login: ManagerLogin,
        #[arg(long)]
        username: String,
    },
    /// Print the delivery receipt of an order
    Receipt {
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        order: OrderId,
    },
}

fn status_label(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Paid => "pagado",
        PaymentStatus::Pending => "pendiente",
    }
}

struct App {
    ledger: Ledger,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let config = load_or_default(&cli.config)
            .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

        let data_dir = cli
            .data_dir
            .clone()
            .unwrap_or_else(|| config.settings.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = database_path(&data_dir);
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );
        info!(db_path = %db_path.display(), "Store initialized");

        Ok(Self {
            ledger: Ledger::new(config, store),
        })
    }

    fn admin(&self, login: &AdminLogin, now: DateTime<Local>) -> Result<Session> {
        Ok(self.ledger.authenticate_admin(&login.admin, &login.password, now)?)
    }

    fn manager(&self, login: &ManagerLogin, now: DateTime<Local>) -> Result<Session> {
        Ok(self
            .ledger
            .authenticate_delivery(&login.manager, &login.password, now)?)
    }

    fn run(&self, command: Command) -> Result<()> {
        let now = frigo_util::now();
        debug!(?command, "Running command");

        match command {
            Command::Inventory(cmd) => self.inventory(cmd, now),
            Command::Order(cmd) => self.order(cmd, now),
            Command::Orders(cmd) => self.orders(cmd, now),
            Command::Payments(cmd) => self.payments(cmd, now),
            Command::Logs(cmd) => self.logs(cmd, now),
            Command::Admins(cmd) => self.admins(cmd, now),
            Command::Delivery(cmd) => self.delivery(cmd, now),
        }
    }

    fn inventory(&self, cmd: InventoryCommand, now: DateTime<Local>) -> Result<()> {
        match cmd {
            InventoryCommand::Show => {
                println!("Precios en {}", self.ledger.config().settings.currency);
                for item in self.ledger.inventory()? {
                    println!(
                        "{:<4} {:<22} stock {:>5}  {}",
                        item.id.as_str(),
                        item.label,
                        item.stock,
                        format_currency(item.price)
                    );
                }
            }
            InventoryCommand::Set {
                login,
                crate_id,
                stock,
                price,
            } => {
                let session = self.admin(&login, now)?;
                let edit = InventoryEdit {
                    stock: stock.map(Value::String),
                    price: price.map(Value::String),
                };
                let update = self.ledger.save_inventory(&session, &[(crate_id, edit)], now)?;
                if update.changes.is_empty() {
                    println!("Inventario guardado sin cambios.");
                } else {
                    for change in &update.changes {
                        println!("{}", change);
                    }
                }
            }
        }
        Ok(())
    }

    fn order(&self, cmd: OrderCommand, now: DateTime<Local>) -> Result<()> {
        match cmd {
            OrderCommand::Review(form) => {
                let review = self.ledger.review_order(&form.into())?;
                println!("Comercio:  {}", review.store_name);
                println!("Dirección: {}", review.store_address);
                println!("Detalle:   {} × {}", review.quantity, review.item.label);
                println!("Precio:    {}", format_currency(review.unit_price));
                println!("Total:     {}", format_currency(review.total_price));
            }
            OrderCommand::Place(form) => {
                let order = self.ledger.confirm_order(&form.into(), now)?;
                let id = order
                    .identifier()
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                println!("Pedido confirmado: {}", id);
                println!("Total: {}", format_currency(order.total_price));
            }
        }
        Ok(())
    }

    fn orders(&self, cmd: OrdersCommand, now: DateTime<Local>) -> Result<()> {
        match cmd {
            OrdersCommand::History => {
                let groups = self.ledger.history()?;
                if groups.is_empty() {
                    println!("Aún no hay pedidos registrados.");
                }
                for group in groups {
                    println!("{}", group.title());
                    for order in &group.orders {
                        println!(
                            "  {}  {} - {}  {}",
                            format_millis_es(order.timestamp),
                            order.display_store_name(),
                            order.quantity_label("Pedido sin detalle"),
                            format_currency(order.total_price)
                        );
                    }
                }
            }
            OrdersCommand::Clear(login) => {
                let session = self.admin(&login, now)?;
                let count = self.ledger.clear_orders(&session, now)?;
                println!("Se borraron {} pedidos.", count);
            }
        }
        Ok(())
    }

    fn payments(&self, cmd: PaymentsCommand, now: DateTime<Local>) -> Result<()> {
        match cmd {
            PaymentsCommand::Weeks => {
                for week in self.ledger.payment_weeks(&now)? {
                    println!("{}  {}", week.key(), week.label());
                }
            }
            PaymentsCommand::Pending { week } => {
                let week = week.map(week_of_date).unwrap_or_else(|| week_boundaries(&now));
                let pending = self.ledger.pending_payments(&week)?;
                println!("{}", week.label());
                if pending.is_empty() {
                    println!("  No hay pagos pendientes para esta semana.");
                }
                for payment in pending {
                    println!(
                        "  {}  {} - {}  {}",
                        payment.id,
                        payment.order.display_store_name(),
                        payment.order.quantity_label("Pedido sin detalle"),
                        format_currency(payment.order.total_price)
                    );
                }
            }
            PaymentsCommand::Mark {
                login,
                order,
                status,
            } => {
                let session = self.admin(&login, now)?;
                let desired = status.status();
                if self.ledger.set_payment_status(&session, &order, desired, now)? {
                    println!("Pedido {} marcado como {}.", order, status_label(desired));
                } else {
                    println!("El pedido {} ya estaba {}.", order, status_label(desired));
                }
            }
        }
        Ok(())
    }

    fn logs(&self, cmd: LogsCommand, now: DateTime<Local>) -> Result<()> {
        match cmd {
            LogsCommand::Actions => self.print_action_log(LogKind::AdminActions)?,
            LogsCommand::Payments => self.print_action_log(LogKind::Payments)?,
            LogsCommand::Logins => {
                for entry in self.ledger.login_history()?.iter().rev() {
                    println!("{}  {}", format_millis_es(Some(entry.timestamp)), entry.name);
                }
            }
            LogsCommand::Clear { log, login } => {
                let session = self.admin(&login, now)?;
                self.ledger.clear_log(&session, log.into(), now)?;
                println!("Registro reiniciado.");
            }
        }
        Ok(())
    }

    /// Newest entries first, as the dashboard shows them
    fn print_action_log(&self, kind: LogKind) -> Result<()> {
        for entry in self.ledger.action_log(kind)?.iter().rev() {
            println!(
                "{}  {}  {}",
                format_millis_es(Some(entry.timestamp)),
                entry.admin,
                entry.action
            );
        }
        Ok(())
    }

    fn admins(&self, cmd: AdminsCommand, now: DateTime<Local>) -> Result<()> {
        match cmd {
            AdminsCommand::Login(login) => {
                let session = self.admin(&login, now)?;
                self.ledger.record_login(&session, now);
                println!("Bienvenido, {}.", session.display_name);
            }
            AdminsCommand::Logout(login) => {
                let session = self.admin(&login, now)?;
                self.ledger.record_logout(&session, now);
                println!("Sesión cerrada.");
            }
            AdminsCommand::List(login) => {
                self.admin(&login, now)?;
                for account in self.ledger.admin_directory()?.all() {
                    println!("{:<16} {:<16} {}", account.username, account.display_name, account.permissions);
                }
            }
            AdminsCommand::Add {
                login,
                name,
                new_password,
            } => {
                let session = self.admin(&login, now)?;
                let account = self.ledger.add_admin(&session, &name, &new_password, now)?;
                println!("Administrador {} agregado.", account.username);
            }
            AdminsCommand::Passwd {
                login,
                target,
                new_password,
            } => {
                let session = self.admin(&login, now)?;
                let account = self
                    .ledger
                    .update_admin_password(&session, &target, &new_password, now)?;
                println!("Contraseña de {} actualizada.", account.display_name);
            }
        }
        Ok(())
    }

    fn delivery(&self, cmd: DeliveryCommand, now: DateTime<Local>) -> Result<()> {
        match cmd {
            DeliveryCommand::List(login) => {
                let session = self.manager(&login, now)?;
                let accounts = self.ledger.delivery_accounts(&session)?;
                if accounts.is_empty() {
                    println!("No hay repartidores registrados.");
                }
                for account in accounts {
                    println!("{:<16} {}", account.username, account.created_label());
                }
            }
            DeliveryCommand::Add {
                login,
                username,
                new_password,
            } => {
                let session = self.manager(&login, now)?;
                let account = self
                    .ledger
                    .add_delivery_account(&session, &username, &new_password, now)?;
                println!("Repartidor {} registrado.", account.username);
            }
            DeliveryCommand::Remove { login, username } => {
                let session = self.manager(&login, now)?;
                self.ledger.remove_delivery_account(&session, &username)?;
                println!("Repartidor {} eliminado.", username.trim());
            }
            DeliveryCommand::Receipt {
                user,
                password,
                order,
            } => {
                let session = self.ledger.authenticate_delivery(&user, &password, now)?;
                print!("{}", self.ledger.delivery_receipt(&session, &order, now)?);
            }
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "frigorifico starting");
    if frigo_util::is_mock_time_active() {
        warn!(now = %frigo_util::now(), "Mock time is active");
    }

    let app = App::new(&cli)?;
    app.run(cli.command)
}
