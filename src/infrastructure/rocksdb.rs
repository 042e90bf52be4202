use crate::domain::order::{Order, OrderFilter, OrderPage, OrderStatus, StatusChange};
use crate::domain::ports::{AuditLog, TransactionStore};
use crate::domain::webhook::{AuditEntry, AuditFilter, WebhookEvent};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Column Family for order snapshots, keyed by `order_id`.
pub const CF_ORDERS: &str = "orders";
/// Column Family mapping insertion sequence (big-endian u64) to `order_id`.
pub const CF_ORDER_SEQUENCE: &str = "order_sequence";
/// Column Family for audit entries, keyed by sequence (big-endian u64).
pub const CF_AUDIT: &str = "audit";

/// A persistent store implementation using RocksDB.
///
/// Implements both `TransactionStore` and `AuditLog`. Sequence keys are
/// big-endian so iteration yields insertion (and receipt) order. Each mutation
/// is a single `WriteBatch` taken under an async mutex, which serialises
/// writers and keeps every order or audit write all-or-nothing.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    /// Number of orders inserted so far.
    orders: Arc<Mutex<u64>>,
    /// Ids claimed by in-flight creations. Not persisted; always locked after `orders`.
    reserved: Arc<Mutex<HashSet<String>>>,
    /// Number of audit entries appended so far.
    audit: Arc<Mutex<u64>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures the required column families exist and resumes the order and
    /// audit sequences from the last stored keys.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ORDERS, CF_ORDER_SEQUENCE, CF_AUDIT]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;
        let orders = last_sequence(&db, CF_ORDER_SEQUENCE)?;
        let audit = last_sequence(&db, CF_AUDIT)?;
        info!(orders, audit, "Opened RocksDB store");

        Ok(Self {
            db: Arc::new(db),
            orders: Arc::new(Mutex::new(orders)),
            reserved: Arc::new(Mutex::new(HashSet::new())),
            audit: Arc::new(Mutex::new(audit)),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        column_family(&self.db, name)
    }

    fn read_order(&self, order_id: &str) -> Result<Option<Order>> {
        let cf = self.cf(CF_ORDERS)?;
        match self.db.get_cf(&cf, order_id.as_bytes())? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }
}

fn column_family<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name).ok_or_else(|| {
        PaymentError::InternalError(Box::new(std::io::Error::other(format!(
            "{name} column family not found"
        ))))
    })
}

fn last_sequence(db: &DB, name: &str) -> Result<u64> {
    let cf = column_family(db, name)?;
    match db.iterator_cf(cf, IteratorMode::End).next() {
        Some(item) => {
            let (key, _) = item?;
            let bytes: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                PaymentError::InternalError(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Malformed sequence key in {name}"),
                )))
            })?;
            Ok(u64::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        PaymentError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        PaymentError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn reserve(&self, order_id: &str) -> Result<()> {
        let _guard = self.orders.lock().await;
        let mut reserved = self.reserved.lock().await;
        if self.read_order(order_id)?.is_some() || !reserved.insert(order_id.to_string()) {
            return Err(PaymentError::DuplicateOrderId(order_id.to_string()));
        }
        Ok(())
    }

    async fn release(&self, order_id: &str) -> Result<()> {
        self.reserved.lock().await.remove(order_id);
        Ok(())
    }

    async fn insert(&self, order: Order) -> Result<()> {
        let mut inserted = self.orders.lock().await;
        if self.read_order(&order.order_id)?.is_some() {
            return Err(PaymentError::DuplicateOrderId(order.order_id));
        }

        let sequence = *inserted + 1;
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_ORDERS)?, order.order_id.as_bytes(), encode(&order)?);
        batch.put_cf(
            self.cf(CF_ORDER_SEQUENCE)?,
            sequence.to_be_bytes(),
            order.order_id.as_bytes(),
        );
        self.db.write(batch)?;
        *inserted = sequence;
        self.reserved.lock().await.remove(&order.order_id);

        Ok(())
    }

    async fn apply_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        observed_at: DateTime<Utc>,
    ) -> Result<StatusChange> {
        let _guard = self.orders.lock().await;
        let mut order = self
            .read_order(order_id)?
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))?;

        let previous = order.status.clone();
        if order.apply_status(status, observed_at) {
            let cf = self.cf(CF_ORDERS)?;
            self.db.put_cf(&cf, order_id.as_bytes(), encode(&order)?)?;
        }

        Ok(StatusChange { previous, order })
    }

    async fn list(&self, filter: &OrderFilter) -> Result<OrderPage> {
        let _guard = self.orders.lock().await;
        let handle = self.cf(CF_ORDER_SEQUENCE)?;

        let mut orders = Vec::new();
        for item in self.db.iterator_cf(handle, IteratorMode::Start) {
            let (_sequence, order_id) = item?;
            let order_id = String::from_utf8_lossy(&order_id);
            let order = self.read_order(&order_id)?.ok_or_else(|| {
                PaymentError::InternalError(Box::new(std::io::Error::other(format!(
                    "Sequence entry without order: {order_id}"
                ))))
            })?;
            orders.push(order);
        }

        Ok(filter.page(&orders))
    }

    async fn get_by_order_id(&self, order_id: &str) -> Result<Order> {
        self.read_order(order_id)?
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))
    }

    async fn len(&self) -> Result<usize> {
        Ok(*self.orders.lock().await as usize)
    }
}

#[async_trait]
impl AuditLog for RocksDBStore {
    async fn append(&self, event: WebhookEvent) -> Result<AuditEntry> {
        let mut appended = self.audit.lock().await;
        let entry = AuditEntry {
            sequence: *appended + 1,
            event,
        };

        let cf = self.cf(CF_AUDIT)?;
        self.db
            .put_cf(&cf, entry.sequence.to_be_bytes(), encode(&entry)?)?;
        *appended = entry.sequence;

        Ok(entry)
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let handle = self.cf(CF_AUDIT)?;
        let limit = filter.limit.unwrap_or(usize::MAX);

        let mut entries = Vec::new();
        for item in self.db.iterator_cf(handle, IteratorMode::Start) {
            if entries.len() >= limit {
                break;
            }
            let (_key, value) = item?;
            let entry: AuditEntry = decode(&value)?;
            if filter.matches(&entry) {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    async fn len(&self) -> Result<usize> {
        Ok(*self.audit.lock().await as usize)
    }
}
