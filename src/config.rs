use crate::domain::order::{DEFAULT_LIST_LIMIT, OrderFilter, OrderStatus};
use crate::infrastructure::gateway_stub::DEFAULT_GATEWAY_URL;
use clap::Parser;
use std::path::PathBuf;

/// Replays a journal of payment requests and webhooks, then prints the orders.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Input request journal (JSON Lines)
    pub input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "PAYPORTAL_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Base URL of the simulated gateway's redirect targets
    #[arg(long, env = "PAYPORTAL_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    pub gateway_url: String,

    /// Only print orders for this customer email
    #[arg(long)]
    pub email: Option<String>,

    /// Only print orders with this status
    #[arg(long)]
    pub status: Option<String>,

    /// Maximum number of orders to print
    #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
    pub limit: usize,

    /// Write the webhook audit log to this file as JSON Lines
    #[arg(long, env = "PAYPORTAL_AUDIT_OUT")]
    pub audit_out: Option<PathBuf>,

    /// Default log filter; RUST_LOG takes precedence
    #[arg(long, env = "PAYPORTAL_LOG", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "PAYPORTAL_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn order_filter(&self) -> OrderFilter {
        OrderFilter {
            email: self.email.clone(),
            status: self.status.as_deref().map(OrderStatus::from),
            limit: self.limit,
        }
    }
}
