pub mod payment_flow;

pub use payment_flow::{CallbackRedirect, PaymentFlow, PaymentFlowError, StartOutcome};
