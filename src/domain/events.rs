//! Advisory notifications about order lifecycle changes.
//!
//! Subscribers receive events through a `tokio` broadcast channel. Nothing in
//! the core depends on delivery: publishing without subscribers is fine and a
//! lagging subscriber only loses its own copies.

use super::order::{Amount, OrderStatus};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    PaymentCreated {
        order_id: String,
        amount: Amount,
        currency: String,
        at: DateTime<Utc>,
    },
    OrderStatusChanged {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    },
}

impl PaymentEvent {
    pub fn order_id(&self) -> &str {
        match self {
            PaymentEvent::PaymentCreated { order_id, .. }
            | PaymentEvent::OrderStatusChanged { order_id, .. } => order_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentEvents {
    sender: broadcast::Sender<PaymentEvent>,
}

impl Default for PaymentEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PaymentEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaymentEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: PaymentEvent) {
        if self.sender.send(event).is_err() {
            trace!("No subscribers for payment event");
        }
    }
}
