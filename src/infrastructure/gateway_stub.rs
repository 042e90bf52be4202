use crate::domain::ports::{GatewayOrder, GatewayOrderRequest, PaymentGateway};
use crate::error::Result;
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_GATEWAY_URL: &str = "https://payment-gateway-demo.com/pay";

/// Simulated payment gateway.
///
/// Always succeeds immediately: fabricates a `pay_` reference and a redirect
/// target under `base_url`. Keeps no state between calls.
#[derive(Debug, Clone)]
pub struct GatewayStub {
    base_url: String,
}

impl Default for GatewayStub {
    fn default() -> Self {
        Self::new(DEFAULT_GATEWAY_URL)
    }
}

impl GatewayStub {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }
}

#[async_trait]
impl PaymentGateway for GatewayStub {
    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder> {
        let mut reference = Uuid::new_v4().simple().to_string();
        reference.truncate(10);
        debug!(order_id = %request.order_id, amount = %request.amount, "Simulated gateway order");
        Ok(GatewayOrder {
            reference: format!("pay_{reference}"),
            status: "created".to_string(),
            redirect_url: format!("{}/{}", self.base_url, request.order_id),
        })
    }
}
