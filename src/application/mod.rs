//! Application layer containing the core business logic orchestration.
//!
//! `PaymentService` turns validated creation requests into pending orders,
//! `WebhookReconciler` applies gateway callbacks to them, and `PaymentPortal`
//! wires both to one shared store and audit log.

use chrono::{DateTime, Utc};
use std::sync::Arc;

pub mod payment_service;
pub mod portal;
pub mod reconciler;

/// Source of "now" for creation and receipt timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}
