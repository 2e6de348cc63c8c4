//! Merchant-side backend for a redirect-based payment capture flow.
//!
//! A payment is started against a remote processor through the
//! [`gateway::PaymentGateway`] capability, the payer is sent off to the
//! processor's hosted page, and the processor redirects back to the public
//! return/cancel endpoints in [`api`]. The [`services::PaymentFlow`]
//! orchestrator owns the invoice state machine and the append-only attempt
//! log that makes every transition auditable.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod services;
