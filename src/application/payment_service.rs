use super::{Clock, system_clock};
use crate::domain::events::{PaymentEvent, PaymentEvents};
use crate::domain::order::{Amount, Order, PaymentRequest};
use crate::domain::order_id::OrderIdGenerator;
use crate::domain::ports::{GatewayOrderRequest, PaymentGatewayRef, TransactionStoreRef};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How many sequenced order ids are tried before giving up on a creation.
pub const DEFAULT_MAX_ID_ATTEMPTS: u32 = 100;

/// Successful outcome of `PaymentService::create_order`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderCreationResult {
    pub order_id: String,
    pub amount: Amount,
    pub currency: String,
    pub redirect_url: String,
    pub gateway_reference: String,
    pub message: String,
}

/// Creates payment orders.
///
/// For each request it claims an order id in the store, asks the gateway for a
/// reference and redirect target, and records a `pending` order. When the id
/// is taken (same customer, same second) it claims the next sequenced id, so
/// concurrent creations for one customer all succeed. The gateway only ever
/// hears about the id that was claimed, once per creation.
pub struct PaymentService {
    store: TransactionStoreRef,
    gateway: PaymentGatewayRef,
    generator: OrderIdGenerator,
    events: Option<PaymentEvents>,
    clock: Clock,
    max_id_attempts: u32,
}

impl PaymentService {
    pub fn new(store: TransactionStoreRef, gateway: PaymentGatewayRef) -> Self {
        Self {
            store,
            gateway,
            generator: OrderIdGenerator::new(),
            events: None,
            clock: system_clock(),
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
        }
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

    pub fn with_max_id_attempts(mut self, attempts: u32) -> Self {
        self.max_id_attempts = attempts.max(1);
        self
    }

    /// Creates a pending order for an already validated request.
    ///
    /// Every failure comes back as `PaymentCreationFailed` wrapping the cause.
    pub async fn create_order(&self, request: PaymentRequest) -> Result<OrderCreationResult> {
        self.try_create(&request).await.map_err(|e| {
            warn!(customer_email = %request.customer_email, error = %e, "Payment creation failed");
            PaymentError::creation_failed(e)
        })
    }

    async fn try_create(&self, request: &PaymentRequest) -> Result<OrderCreationResult> {
        let created_at = (self.clock)();
        let order_id = self.claim_order_id(request, created_at).await?;

        match self.record(order_id.clone(), request, created_at).await {
            Ok(result) => Ok(result),
            Err(e) => {
                if let Err(release) = self.store.release(&order_id).await {
                    warn!(order_id = %order_id, error = %release, "Failed to release order id");
                }
                Err(e)
            }
        }
    }

    /// Claims the first free id in the customer's sequence for `created_at`.
    async fn claim_order_id(
        &self,
        request: &PaymentRequest,
        created_at: DateTime<Utc>,
    ) -> Result<String> {
        let mut last_id = None;
        for sequence in 0..self.max_id_attempts {
            let order_id = self.generator.generate_with_sequence(
                &request.customer_email,
                created_at,
                sequence,
            );
            match self.store.reserve(&order_id).await {
                Ok(()) => return Ok(order_id),
                Err(PaymentError::DuplicateOrderId(taken)) => {
                    debug!(order_id = %taken, "Order id already taken, trying next sequence");
                    last_id = Some(taken);
                }
                Err(e) => return Err(e),
            }
        }

        Err(PaymentError::DuplicateOrderId(last_id.unwrap_or_else(|| {
            self.generator.generate(&request.customer_email, created_at)
        })))
    }

    /// Registers a claimed id with the gateway and stores the pending order.
    async fn record(
        &self,
        order_id: String,
        request: &PaymentRequest,
        created_at: DateTime<Utc>,
    ) -> Result<OrderCreationResult> {
        let gateway_order = self
            .gateway
            .create_order(&GatewayOrderRequest {
                order_id: order_id.clone(),
                amount: request.amount,
                currency: request.currency.clone(),
                customer_email: request.customer_email.clone(),
            })
            .await?;

        let order = Order::new(
            order_id.clone(),
            request,
            gateway_order.reference.clone(),
            created_at,
        );
        self.store.insert(order).await?;

        info!(order_id = %order_id, amount = %request.amount, currency = %request.currency, "Payment order created");
        if let Some(events) = &self.events {
            events.publish(PaymentEvent::PaymentCreated {
                order_id: order_id.clone(),
                amount: request.amount,
                currency: request.currency.clone(),
                at: created_at,
            });
        }

        Ok(OrderCreationResult {
            message: format!("Payment order created. Order ID: {order_id}"),
            order_id,
            amount: request.amount,
            currency: request.currency.clone(),
            redirect_url: gateway_order.redirect_url,
            gateway_reference: gateway_order.reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use crate::domain::ports::{GatewayOrder, PaymentGateway, TransactionStore};
    use crate::infrastructure::gateway_stub::GatewayStub;
    use crate::infrastructure::in_memory::InMemoryTransactionStore;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    struct UnreachableGateway;

    #[async_trait]
    impl PaymentGateway for UnreachableGateway {
        async fn create_order(&self, _request: &GatewayOrderRequest) -> Result<GatewayOrder> {
            Err(PaymentError::GatewayUnavailable("connection refused".to_string()))
        }
    }

    /// Forwards to the stub and remembers every order id it was asked about.
    /// Fails the first `failures` calls.
    #[derive(Default)]
    struct RecordingGateway {
        inner: GatewayStub,
        failures: usize,
        seen: std::sync::Mutex<Vec<String>>,
    }

    impl RecordingGateway {
        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder> {
            let calls = {
                let mut seen = self.seen.lock().unwrap();
                seen.push(request.order_id.clone());
                seen.len()
            };
            if calls <= self.failures {
                return Err(PaymentError::GatewayUnavailable("timeout".to_string()));
            }
            self.inner.create_order(request).await
        }
    }

    fn request(email: &str) -> PaymentRequest {
        PaymentRequest {
            amount: Amount::new(dec!(100)).unwrap(),
            currency: "INR".to_string(),
            customer_name: "Asha".to_string(),
            customer_email: email.to_string(),
            description: Some("Payment for services".to_string()),
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    fn service(store: &InMemoryTransactionStore) -> PaymentService {
        PaymentService::new(Arc::new(store.clone()), Arc::new(GatewayStub::default()))
            .with_clock(fixed_time)
    }

    #[tokio::test]
    async fn test_create_order_records_pending_order() {
        let store = InMemoryTransactionStore::new();
        let result = service(&store).create_order(request("a@x.com")).await.unwrap();

        assert!(OrderIdGenerator::is_well_formed(&result.order_id));
        assert_eq!(result.amount, Amount::new(dec!(100)).unwrap());
        assert_eq!(result.currency, "INR");
        assert!(result.redirect_url.ends_with(&result.order_id));
        assert_eq!(
            result.message,
            format!("Payment order created. Order ID: {}", result.order_id)
        );

        let order = store.get_by_order_id(&result.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.gateway_reference, result.gateway_reference);
        assert_eq!(order.created_at, fixed_time());
    }

    #[tokio::test]
    async fn test_same_second_same_customer_gets_sequenced_ids() {
        let store = InMemoryTransactionStore::new();
        let service = service(&store);

        let first = service.create_order(request("a@x.com")).await.unwrap();
        let second = service.create_order(request("a@x.com")).await.unwrap();
        let third = service.create_order(request("a@x.com")).await.unwrap();

        let base = OrderIdGenerator::new().generate("a@x.com", fixed_time());
        assert_eq!(first.order_id, base);
        assert_eq!(second.order_id, format!("{base}-01"));
        assert_eq!(third.order_id, format!("{base}-02"));
        assert_eq!(store.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_gateway_called_once_per_creation_with_final_id() {
        let store = InMemoryTransactionStore::new();
        let gateway = Arc::new(RecordingGateway::default());
        let service = PaymentService::new(Arc::new(store.clone()), gateway.clone())
            .with_clock(fixed_time);

        let mut created = Vec::new();
        for _ in 0..3 {
            created.push(service.create_order(request("a@x.com")).await.unwrap().order_id);
        }

        assert_eq!(gateway.seen(), created);
        for order_id in &created {
            assert!(store.get_by_order_id(order_id).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_gateway_failure_releases_claimed_id() {
        let store = InMemoryTransactionStore::new();
        let gateway = Arc::new(RecordingGateway {
            failures: 1,
            ..RecordingGateway::default()
        });
        let service = PaymentService::new(Arc::new(store.clone()), gateway.clone())
            .with_clock(fixed_time);

        assert!(service.create_order(request("a@x.com")).await.is_err());
        let retried = service.create_order(request("a@x.com")).await.unwrap();

        let base = OrderIdGenerator::new().generate("a@x.com", fixed_time());
        assert_eq!(retried.order_id, base);
        assert_eq!(gateway.seen(), [base.clone(), base]);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_fail_creation() {
        let store = InMemoryTransactionStore::new();
        let service = service(&store).with_max_id_attempts(2);

        service.create_order(request("a@x.com")).await.unwrap();
        service.create_order(request("a@x.com")).await.unwrap();
        let result = service.create_order(request("a@x.com")).await;

        match result {
            Err(PaymentError::PaymentCreationFailed(cause)) => {
                assert!(matches!(*cause, PaymentError::DuplicateOrderId(_)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_gateway_failure_records_nothing() {
        let store = InMemoryTransactionStore::new();
        let service = PaymentService::new(Arc::new(store.clone()), Arc::new(UnreachableGateway));

        let result = service.create_order(request("a@x.com")).await;
        match result {
            Err(PaymentError::PaymentCreationFailed(cause)) => {
                assert!(matches!(*cause, PaymentError::GatewayUnavailable(_)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_payment_created_event_published() {
        let store = InMemoryTransactionStore::new();
        let events = PaymentEvents::default();
        let mut rx = events.subscribe();
        let service = service(&store).with_events(events);

        let result = service.create_order(request("a@x.com")).await.unwrap();

        match rx.recv().await.unwrap() {
            PaymentEvent::PaymentCreated { order_id, at, .. } => {
                assert_eq!(order_id, result.order_id);
                assert_eq!(at, fixed_time());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
