use super::{Clock, system_clock};
use crate::domain::events::{PaymentEvent, PaymentEvents};
use crate::domain::order::OrderStatus;
use crate::domain::ports::{AuditLogRef, TransactionStoreRef};
use crate::domain::webhook::{DEFAULT_APPLIED_STATUS, PayloadExtractor, WebhookEvent};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Acknowledgement returned for every webhook with an extractable order id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookResult {
    pub accepted: bool,
    pub order_id: String,
    /// Whether a stored order carried `order_id` when the event was applied.
    pub matched: bool,
    pub applied_status: OrderStatus,
    pub audit_sequence: u64,
    pub message: String,
}

/// Applies gateway webhooks to stored orders.
///
/// Every event with an order id is appended to the audit log before the store
/// is touched, and is acknowledged even when no order matches; the gateway
/// would otherwise keep redelivering it. Concurrent events for one order are
/// last-write-wins in the order the store serialises them.
pub struct WebhookReconciler {
    store: TransactionStoreRef,
    audit: AuditLogRef,
    extractor: PayloadExtractor,
    events: Option<PaymentEvents>,
    clock: Clock,
}

impl WebhookReconciler {
    pub fn new(store: TransactionStoreRef, audit: AuditLogRef) -> Self {
        Self {
            store,
            audit,
            extractor: PayloadExtractor::default(),
            events: None,
            clock: system_clock(),
        }
    }

    pub fn with_extractor(mut self, extractor: PayloadExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_events(mut self, events: PaymentEvents) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Parses a raw request body and handles it.
    ///
    /// A body that is not JSON fails with `InvalidPayload` and leaves no trace.
    pub async fn handle_raw(&self, body: &[u8]) -> Result<WebhookResult> {
        let payload: Value = serde_json::from_slice(body)?;
        self.handle(payload).await
    }

    pub async fn handle(&self, payload: Value) -> Result<WebhookResult> {
        let fields = self.extractor.extract(&payload).inspect_err(|_| {
            warn!("Webhook rejected: no order id in payload");
        })?;

        let received_at = (self.clock)();
        let applied_status = OrderStatus::from(
            fields
                .status
                .as_deref()
                .unwrap_or(DEFAULT_APPLIED_STATUS),
        );

        let entry = self
            .audit
            .append(WebhookEvent::new(&fields, payload, received_at))
            .await?;
        debug!(order_id = %fields.order_id, sequence = entry.sequence, event = %fields.event, "Webhook audited");

        let matched = match self
            .store
            .apply_status(&fields.order_id, applied_status.clone(), received_at)
            .await
        {
            Ok(change) if change.changed() => {
                info!(order_id = %fields.order_id, from = %change.previous, to = %change.order.status, "Order status updated");
                if let Some(events) = &self.events {
                    events.publish(PaymentEvent::OrderStatusChanged {
                        order_id: fields.order_id.clone(),
                        from: change.previous,
                        to: change.order.status,
                        at: change.order.updated_at,
                    });
                }
                true
            }
            Ok(_) => {
                debug!(order_id = %fields.order_id, status = %applied_status, "Status unchanged");
                true
            }
            Err(PaymentError::OrderNotFound(_)) => {
                warn!(order_id = %fields.order_id, sequence = entry.sequence, "Webhook for unknown order acknowledged");
                false
            }
            Err(e) => return Err(e),
        };

        Ok(WebhookResult {
            accepted: true,
            order_id: fields.order_id,
            matched,
            applied_status,
            audit_sequence: entry.sequence,
            message: "Webhook processed successfully".to_string(),
        })
    }
}
