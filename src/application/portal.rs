use super::payment_service::{OrderCreationResult, PaymentService};
use super::reconciler::{WebhookReconciler, WebhookResult};
use crate::domain::events::{PaymentEvent, PaymentEvents};
use crate::domain::order::{Order, OrderFilter, OrderPage, PaymentRequest};
use crate::domain::ports::{AuditLogRef, PaymentGatewayRef, TransactionStoreRef};
use crate::domain::webhook::{AuditEntry, AuditFilter};
use crate::error::Result;
use crate::infrastructure::gateway_stub::GatewayStub;
use crate::infrastructure::in_memory::{InMemoryAuditLog, InMemoryTransactionStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub transactions_count: usize,
    pub webhooks_count: usize,
}

/// Composition root of the payment core.
///
/// Owns one order store and one audit log and hands them to the payment
/// service and the webhook reconciler. Every operation a boundary layer needs
/// is exposed here.
pub struct PaymentPortal {
    payments: PaymentService,
    reconciler: WebhookReconciler,
    store: TransactionStoreRef,
    audit: AuditLogRef,
    events: PaymentEvents,
}

impl PaymentPortal {
    pub fn new(store: TransactionStoreRef, audit: AuditLogRef, gateway: PaymentGatewayRef) -> Self {
        let events = PaymentEvents::default();
        Self {
            payments: PaymentService::new(store.clone(), gateway).with_events(events.clone()),
            reconciler: WebhookReconciler::new(store.clone(), audit.clone())
                .with_events(events.clone()),
            store,
            audit,
            events,
        }
    }

    /// Fresh in-memory store and audit log in front of the gateway stub.
    pub fn in_memory() -> Self {
        Self::in_memory_with_gateway(Arc::new(GatewayStub::default()))
    }

    /// Fresh in-memory store and audit log in front of `gateway`.
    pub fn in_memory_with_gateway(gateway: PaymentGatewayRef) -> Self {
        Self::new(
            Arc::new(InMemoryTransactionStore::new()),
            Arc::new(InMemoryAuditLog::new()),
            gateway,
        )
    }

    pub async fn create_order(&self, request: PaymentRequest) -> Result<OrderCreationResult> {
        self.payments.create_order(request).await
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<OrderPage> {
        self.store.list(filter).await
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        self.store.get_by_order_id(order_id).await
    }

    pub async fn handle_webhook(&self, payload: Value) -> Result<WebhookResult> {
        self.reconciler.handle(payload).await
    }

    pub async fn handle_webhook_raw(&self, body: &[u8]) -> Result<WebhookResult> {
        self.reconciler.handle_raw(body).await
    }

    pub async fn audit_log(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        self.audit.query(filter).await
    }

    pub async fn health(&self) -> Result<HealthSnapshot> {
        Ok(HealthSnapshot {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            transactions_count: self.store.len().await?,
            webhooks_count: self.audit.len().await?,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaymentEvent> {
        self.events.subscribe()
    }
}
