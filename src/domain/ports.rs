use super::order::{Amount, Order, OrderFilter, OrderPage, OrderStatus, StatusChange};
use super::webhook::{AuditEntry, AuditFilter, WebhookEvent};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Authoritative table of orders.
///
/// Implementations serialise `insert` and `apply_status` against each other,
/// and readers never observe a half-applied update.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Claims `order_id` for a creation still in flight.
    ///
    /// Fails with `DuplicateOrderId` if the id is recorded or already claimed.
    async fn reserve(&self, order_id: &str) -> Result<()>;
    /// Drops a claim that will never be inserted. Unknown ids are ignored.
    async fn release(&self, order_id: &str) -> Result<()>;
    /// Fails with `DuplicateOrderId` if the `order_id` was ever inserted.
    /// Inserting a claimed id consumes the claim.
    async fn insert(&self, order: Order) -> Result<()>;
    /// Fails with `OrderNotFound` if no order carries `order_id`.
    async fn apply_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        observed_at: DateTime<Utc>,
    ) -> Result<StatusChange>;
    async fn list(&self, filter: &OrderFilter) -> Result<OrderPage>;
    async fn get_by_order_id(&self, order_id: &str) -> Result<Order>;
    async fn len(&self) -> Result<usize>;
}

/// Append-only record of inbound webhooks.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, event: WebhookEvent) -> Result<AuditEntry>;
    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>>;
    async fn len(&self) -> Result<usize>;
}

/// What the gateway is told about a new order.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOrderRequest {
    pub order_id: String,
    pub amount: Amount,
    pub currency: String,
    pub customer_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    pub reference: String,
    pub status: String,
    pub redirect_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder>;
}

pub type TransactionStoreRef = Arc<dyn TransactionStore>;
pub type AuditLogRef = Arc<dyn AuditLog>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
