use crate::gateway::error::GatewayResult;
use crate::gateway::types::{CaptureRequest, GatewayDriver, GatewayOutcome};
use async_trait::async_trait;

/// Capability wrapping a remote payment processor.
///
/// The payment flow is polymorphic over any processor that can express the
/// three-outcome initiate contract; it never looks at processor-specific
/// fields.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate(&self, request: CaptureRequest) -> GatewayResult<GatewayOutcome>;

    fn driver(&self) -> GatewayDriver;
}
