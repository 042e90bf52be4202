use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of orders returned by a listing when the caller gives no limit.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// A positive payment amount.
///
/// Wraps `rust_decimal::Decimal` so an order can never carry a zero or
/// negative quantity, even when built outside the validation layer.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationRejected(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Status of an order as last reported by the gateway.
///
/// The gateway is trusted, so any reported value is accepted; values outside
/// the well-known set are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    #[default]
    Pending,
    Success,
    Failed,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Success => "success",
            OrderStatus::Failed => "failed",
            OrderStatus::Other(value) => value,
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => OrderStatus::Pending,
            "success" => OrderStatus::Success,
            "failed" => OrderStatus::Failed,
            other => OrderStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" | "success" | "failed" => OrderStatus::from(value.as_str()),
            _ => OrderStatus::Other(value),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(OrderStatus::from(s))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_currency() -> String {
    "INR".to_string()
}

/// A creation request that has already passed the boundary validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Amount,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// The transaction record of a single payment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Process-unique opaque identifier.
    pub id: Uuid,
    /// Human-facing business identifier, unique for the store's lifetime.
    pub order_id: String,
    pub amount: Amount,
    pub currency: String,
    pub customer_email: String,
    /// Opaque reference handed out by the payment gateway.
    pub gateway_reference: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a fresh `pending` order.
    pub fn new(
        order_id: String,
        request: &PaymentRequest,
        gateway_reference: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            amount: request.amount,
            currency: request.currency.clone(),
            customer_email: request.customer_email.clone(),
            gateway_reference,
            status: OrderStatus::Pending,
            created_at,
            updated_at: created_at,
        }
    }

    /// Applies a gateway-reported status.
    ///
    /// Reapplying the current status is a no-op and leaves `updated_at`
    /// untouched. Returns whether the status actually changed.
    pub fn apply_status(&mut self, status: OrderStatus, observed_at: DateTime<Utc>) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        // updated_at never goes below created_at, whatever the caller's clock says
        self.updated_at = observed_at.max(self.created_at);
        true
    }
}

/// Outcome of `TransactionStore::apply_status`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub previous: OrderStatus,
    /// Snapshot of the order after the update.
    pub order: Order,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.previous != self.order.status
    }
}

/// Filters for listing orders. All present filters must match exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFilter {
    pub email: Option<String>,
    pub status: Option<OrderStatus>,
    pub limit: usize,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            email: None,
            status: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl OrderFilter {
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<OrderStatus>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.email
            .as_deref()
            .is_none_or(|email| order.customer_email == email)
            && self
                .status
                .as_ref()
                .is_none_or(|status| &order.status == status)
    }

    /// Filters orders (given in insertion order) into a page.
    ///
    /// `count` is the number of matches before truncation to `limit`.
    pub fn page<'a>(&self, orders: impl IntoIterator<Item = &'a Order>) -> OrderPage {
        let mut count = 0;
        let mut page = Vec::new();
        for order in orders.into_iter().filter(|order| self.matches(order)) {
            if page.len() < self.limit {
                page.push(order.clone());
            }
            count += 1;
        }
        OrderPage {
            count,
            orders: page,
        }
    }
}

/// Result of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPage {
    pub count: usize,
    pub orders: Vec<Order>,
}
