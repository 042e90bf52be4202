use crate::domain::order::{Order, OrderFilter, OrderPage, OrderStatus, StatusChange};
use crate::domain::ports::{AuditLog, TransactionStore};
use crate::domain::webhook::{AuditEntry, AuditFilter, WebhookEvent};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct OrderTable {
    /// Orders in insertion order.
    rows: Vec<Order>,
    /// `order_id` -> position in `rows`.
    index: HashMap<String, usize>,
    /// Ids claimed by creations that have not inserted yet.
    reserved: HashSet<String>,
}

/// A thread-safe in-memory order table.
///
/// A single `RwLock` guards both the rows and the id index, so every insert
/// and status update is serialised and listings see a consistent snapshot.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    orders: Arc<RwLock<OrderTable>>,
}

impl InMemoryTransactionStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn reserve(&self, order_id: &str) -> Result<()> {
        let mut table = self.orders.write().await;
        if table.index.contains_key(order_id) || !table.reserved.insert(order_id.to_string()) {
            return Err(PaymentError::DuplicateOrderId(order_id.to_string()));
        }
        Ok(())
    }

    async fn release(&self, order_id: &str) -> Result<()> {
        self.orders.write().await.reserved.remove(order_id);
        Ok(())
    }

    async fn insert(&self, order: Order) -> Result<()> {
        let mut table = self.orders.write().await;
        if table.index.contains_key(&order.order_id) {
            return Err(PaymentError::DuplicateOrderId(order.order_id));
        }
        table.reserved.remove(&order.order_id);
        let position = table.rows.len();
        table.index.insert(order.order_id.clone(), position);
        table.rows.push(order);
        Ok(())
    }

    async fn apply_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        observed_at: DateTime<Utc>,
    ) -> Result<StatusChange> {
        let mut table = self.orders.write().await;
        let position = *table
            .index
            .get(order_id)
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))?;
        let order = &mut table.rows[position];
        let previous = order.status.clone();
        order.apply_status(status, observed_at);
        Ok(StatusChange {
            previous,
            order: order.clone(),
        })
    }

    async fn list(&self, filter: &OrderFilter) -> Result<OrderPage> {
        let table = self.orders.read().await;
        Ok(filter.page(&table.rows))
    }

    async fn get_by_order_id(&self, order_id: &str) -> Result<Order> {
        let table = self.orders.read().await;
        table
            .index
            .get(order_id)
            .map(|&position| table.rows[position].clone())
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.orders.read().await.rows.len())
    }
}

/// A thread-safe in-memory audit log.
///
/// Entries are only ever pushed; the write lock makes each append atomic and
/// assigns sequence numbers in receipt order.
#[derive(Default, Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    /// Creates a new, empty in-memory audit log.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, event: WebhookEvent) -> Result<AuditEntry> {
        let mut entries = self.entries.write().await;
        let entry = AuditEntry {
            sequence: entries.len() as u64 + 1,
            event,
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.read().await;
        Ok(filter.select(entries.iter()))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Amount, PaymentRequest};
    use crate::domain::webhook::PayloadExtractor;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn order(order_id: &str, email: &str) -> Order {
        let request = PaymentRequest {
            amount: Amount::new(dec!(100.0)).unwrap(),
            currency: "INR".to_string(),
            customer_name: "Test".to_string(),
            customer_email: email.to_string(),
            description: None,
        };
        Order::new(order_id.to_string(), &request, "pay_test".to_string(), Utc::now())
    }

    fn event(payload: serde_json::Value) -> WebhookEvent {
        let fields = PayloadExtractor::default().extract(&payload).unwrap();
        WebhookEvent::new(&fields, payload, Utc::now())
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryTransactionStore::new();
        let order = order("ORD1", "a@x.com");

        store.insert(order.clone()).await.unwrap();
        let retrieved = store.get_by_order_id("ORD1").await.unwrap();
        assert_eq!(retrieved, order);

        assert!(matches!(
            store.get_by_order_id("ORD2").await,
            Err(PaymentError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_order_id_rejected() {
        let store = InMemoryTransactionStore::new();
        store.insert(order("ORD1", "a@x.com")).await.unwrap();

        let result = store.insert(order("ORD1", "b@x.com")).await;
        assert!(matches!(result, Err(PaymentError::DuplicateOrderId(id)) if id == "ORD1"));
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(
            store.get_by_order_id("ORD1").await.unwrap().customer_email,
            "a@x.com"
        );
    }

    #[tokio::test]
    async fn test_reserved_id_is_claimed_once() {
        let store = InMemoryTransactionStore::new();
        store.reserve("ORD1").await.unwrap();

        assert!(matches!(
            store.reserve("ORD1").await,
            Err(PaymentError::DuplicateOrderId(_))
        ));
        store.insert(order("ORD1", "a@x.com")).await.unwrap();
        assert!(matches!(
            store.reserve("ORD1").await,
            Err(PaymentError::DuplicateOrderId(_))
        ));

        store.reserve("ORD2").await.unwrap();
        store.release("ORD2").await.unwrap();
        store.reserve("ORD2").await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_apply_status_is_idempotent() {
        let store = InMemoryTransactionStore::new();
        store.insert(order("ORD1", "a@x.com")).await.unwrap();
        let at = Utc::now() + Duration::seconds(1);

        let first = store.apply_status("ORD1", OrderStatus::Success, at).await.unwrap();
        assert!(first.changed());
        assert_eq!(first.previous, OrderStatus::Pending);

        let second = store
            .apply_status("ORD1", OrderStatus::Success, at + Duration::seconds(1))
            .await
            .unwrap();
        assert!(!second.changed());
        assert_eq!(second.order.status, OrderStatus::Success);
        assert_eq!(
            store.get_by_order_id("ORD1").await.unwrap().status,
            OrderStatus::Success
        );
    }

    #[tokio::test]
    async fn test_apply_status_unknown_order() {
        let store = InMemoryTransactionStore::new();
        let result = store
            .apply_status("ORD-DOES-NOT-EXIST", OrderStatus::Success, Utc::now())
            .await;
        assert!(matches!(result, Err(PaymentError::OrderNotFound(_))));
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let store = InMemoryTransactionStore::new();
        for (id, email) in [("ORD1", "a@x.com"), ("ORD2", "b@x.com"), ("ORD3", "a@x.com")] {
            store.insert(order(id, email)).await.unwrap();
        }
        store
            .apply_status("ORD3", OrderStatus::Success, Utc::now())
            .await
            .unwrap();

        let all = store.list(&OrderFilter::default()).await.unwrap();
        let ids: Vec<_> = all.orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, ["ORD1", "ORD2", "ORD3"]);

        let by_email = store
            .list(&OrderFilter::default().with_email("a@x.com"))
            .await
            .unwrap();
        assert_eq!(by_email.count, 2);

        let successful = store
            .list(&OrderFilter::default().with_status("success"))
            .await
            .unwrap();
        assert_eq!(successful.count, 1);
        assert_eq!(successful.orders[0].order_id, "ORD3");

        let limited = store
            .list(&OrderFilter::default().with_limit(1))
            .await
            .unwrap();
        assert_eq!(limited.orders.len(), 1);
        assert_eq!(limited.count, 3);
    }

    #[tokio::test]
    async fn test_audit_log_appends_in_order() {
        let log = InMemoryAuditLog::new();
        let first = log.append(event(json!({"order_id": "ORD1"}))).await.unwrap();
        let second = log
            .append(event(json!({"order_id": "ORD2", "status": "failed"})))
            .await
            .unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(log.len().await.unwrap(), 2);

        let all = log.query(&AuditFilter::default()).await.unwrap();
        assert_eq!(all, vec![first, second.clone()]);

        let only_second = log.query(&AuditFilter::for_order("ORD2")).await.unwrap();
        assert_eq!(only_second, vec![second]);
    }
}
