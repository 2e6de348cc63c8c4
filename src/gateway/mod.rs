pub mod adapter;
pub mod drivers;
pub mod error;
pub mod http;
pub mod types;

pub use adapter::PaymentGateway;
pub use error::{GatewayError, GatewayResult};
pub use types::{CaptureRequest, CardAction, GatewayDriver, GatewayOutcome, Money, PayerName};
