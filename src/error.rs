use thiserror::Error;

/// Failure kinds surfaced by the payment core.
///
/// Each variant is distinct so that a boundary layer can map it to its own
/// client-visible response. `OrderNotFound` raised during webhook
/// reconciliation never reaches a caller: the reconciler acknowledges the
/// event and keeps the audit entry as the only evidence.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation rejected: {0}")]
    ValidationRejected(String),
    #[error("Duplicate order id: {0}")]
    DuplicateOrderId(String),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Order ID not found in webhook payload")]
    MissingOrderId,
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Payment creation failed: {0}")]
    PaymentCreationFailed(#[source] Box<PaymentError>),
    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

impl PaymentError {
    /// Wraps an error raised while creating an order.
    pub fn creation_failed(cause: PaymentError) -> Self {
        match cause {
            already @ PaymentError::PaymentCreationFailed(_) => already,
            other => PaymentError::PaymentCreationFailed(Box::new(other)),
        }
    }

    /// True for failures caused by the request itself rather than by the service.
    pub fn is_client_error(&self) -> bool {
        match self {
            PaymentError::ValidationRejected(_)
            | PaymentError::MissingOrderId
            | PaymentError::InvalidPayload(_)
            | PaymentError::OrderNotFound(_) => true,
            PaymentError::PaymentCreationFailed(cause) => cause.is_client_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
