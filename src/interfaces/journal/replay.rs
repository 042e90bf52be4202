use super::request_reader::JournalRequest;
use crate::application::portal::PaymentPortal;
use crate::error::{PaymentError, Result};
use serde_json::Value;
use tracing::debug;

/// What a single journal line produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOutcome {
    Created { order_id: String },
    Acknowledged { order_id: String, matched: bool },
}

/// Feeds journal requests to a portal, remembering the ids of created orders
/// so later webhook lines can refer to them by position.
#[derive(Debug, Default)]
pub struct JournalReplayer {
    /// One slot per `create_order` line; `None` when that creation failed.
    created: Vec<Option<String>>,
}

impl JournalReplayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn apply(
        &mut self,
        portal: &PaymentPortal,
        request: JournalRequest,
    ) -> Result<ReplayOutcome> {
        match request {
            JournalRequest::CreateOrder(request) => {
                let slot = self.created.len();
                self.created.push(None);
                let result = portal.create_order(request).await?;
                self.created[slot] = Some(result.order_id.clone());
                Ok(ReplayOutcome::Created {
                    order_id: result.order_id,
                })
            }
            JournalRequest::Webhook { payload, order_ref } => {
                let payload = match order_ref {
                    Some(position) => self.resolve(payload, position)?,
                    None => payload,
                };
                let result = portal.handle_webhook(payload).await?;
                Ok(ReplayOutcome::Acknowledged {
                    order_id: result.order_id,
                    matched: result.matched,
                })
            }
        }
    }

    fn resolve(&self, mut payload: Value, position: usize) -> Result<Value> {
        let order_id = position
            .checked_sub(1)
            .and_then(|index| self.created.get(index))
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                PaymentError::ValidationRejected(format!(
                    "order_ref {position} does not name a created order"
                ))
            })?;
        let object = payload.as_object_mut().ok_or_else(|| {
            PaymentError::ValidationRejected("webhook payload must be a JSON object".to_string())
        })?;
        debug!(order_ref = position, order_id = %order_id, "Resolved order reference");
        object.insert("order_id".to_string(), Value::String(order_id.clone()));
        Ok(payload)
    }
}
