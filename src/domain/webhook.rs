use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name recorded when the payload carries none.
pub const DEFAULT_EVENT: &str = "payment_captured";
/// Status applied to the order when the payload reports none.
pub const DEFAULT_APPLIED_STATUS: &str = "completed";

/// Where to look for a field inside a webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    /// A top-level object key.
    Key(String),
    /// A JSON pointer (RFC 6901), e.g. `/payload/payment/entity/order_id`.
    Pointer(String),
}

impl FieldPath {
    pub fn key(name: impl Into<String>) -> Self {
        FieldPath::Key(name.into())
    }

    pub fn pointer(path: impl Into<String>) -> Self {
        FieldPath::Pointer(path.into())
    }

    /// Only non-empty strings count as a match.
    pub fn lookup<'a>(&self, payload: &'a Value) -> Option<&'a str> {
        let value = match self {
            FieldPath::Key(name) => payload.get(name),
            FieldPath::Pointer(path) => payload.pointer(path),
        };
        value.and_then(Value::as_str).filter(|s| !s.is_empty())
    }
}

fn first_match<'a>(paths: &[FieldPath], payload: &'a Value) -> Option<&'a str> {
    paths.iter().find_map(|path| path.lookup(payload))
}

/// Fields pulled out of a webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFields {
    pub order_id: String,
    pub event: String,
    /// Status as reported; `None` when the payload has none.
    pub status: Option<String>,
}

/// Ordered extraction strategies for webhook payloads.
///
/// Each field has a list of paths tried in sequence; the first path yielding a
/// non-empty string wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadExtractor {
    pub order_id: Vec<FieldPath>,
    pub status: Vec<FieldPath>,
    pub event: Vec<FieldPath>,
}

impl Default for PayloadExtractor {
    fn default() -> Self {
        Self {
            order_id: vec![
                FieldPath::key("order_id"),
                FieldPath::pointer("/payload/payment/entity/order_id"),
            ],
            status: vec![
                FieldPath::key("status"),
                FieldPath::pointer("/payload/payment/entity/status"),
            ],
            event: vec![FieldPath::key("event")],
        }
    }
}

impl PayloadExtractor {
    pub fn extract(&self, payload: &Value) -> Result<ExtractedFields> {
        let order_id = first_match(&self.order_id, payload).ok_or(PaymentError::MissingOrderId)?;
        Ok(ExtractedFields {
            order_id: order_id.to_string(),
            event: first_match(&self.event, payload)
                .unwrap_or(DEFAULT_EVENT)
                .to_string(),
            status: first_match(&self.status, payload).map(str::to_string),
        })
    }
}

/// An inbound webhook as it was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub order_id: String,
    pub event: String,
    pub status: Option<String>,
    pub raw_payload: Value,
    pub received_at: DateTime<Utc>,
}

impl WebhookEvent {
    pub fn new(fields: &ExtractedFields, raw_payload: Value, received_at: DateTime<Utc>) -> Self {
        Self {
            order_id: fields.order_id.clone(),
            event: fields.event.clone(),
            status: fields.status.clone(),
            raw_payload,
            received_at,
        }
    }
}

/// A webhook event once appended to the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in receipt order, starting at 1.
    pub sequence: u64,
    #[serde(flatten)]
    pub event: WebhookEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub order_id: Option<String>,
    pub event: Option<String>,
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn for_order(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.order_id
            .as_deref()
            .is_none_or(|id| entry.event.order_id == id)
            && self
                .event
                .as_deref()
                .is_none_or(|event| entry.event.event == event)
    }

    /// Filters entries (given in receipt order) and applies the limit.
    pub fn select<'a>(&self, entries: impl IntoIterator<Item = &'a AuditEntry>) -> Vec<AuditEntry> {
        entries
            .into_iter()
            .filter(|entry| self.matches(entry))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}
