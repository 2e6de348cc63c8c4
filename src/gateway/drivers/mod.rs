pub mod paypal_express;

pub use paypal_express::{PaypalExpressConfig, PaypalExpressGateway};
