//! Return and cancel callback verification tests.
//!
//! Every input here simulates what a payer's browser (or an attacker) can
//! send: invoice hash in the path, token and processor params in the query.

mod support;

use payflow_backend::services::{PaymentFlow, PaymentFlowError};
use serde_json::json;
use std::sync::Arc;
use support::{test_callback_config, test_invoice, test_method, MemoryBackend, ScriptedGateway};
use uuid::Uuid;

fn build_flow(backend: &MemoryBackend) -> PaymentFlow {
    PaymentFlow::new(
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(ScriptedGateway::unreachable()),
        test_callback_config(),
    )
}

/// Seed one invoice mid-flight: reference TOK1 recorded, not yet processed.
fn seed_in_flight(backend: &MemoryBackend) -> (Uuid, Uuid) {
    let method = test_method();
    let mut invoice = test_invoice(method.id, "abc123");
    invoice.external_reference = Some("TOK1".to_string());
    let ids = (invoice.id, method.id);
    backend.insert_method(method);
    backend.insert_invoice(invoice);
    ids
}

#[tokio::test]
async fn valid_return_marks_paid_and_redirects_to_success_page() {
    let backend = MemoryBackend::new();
    let (invoice_id, _) = seed_in_flight(&backend);
    let flow = build_flow(&backend);

    let params = json!({"token": "TOK1", "PayerID": "PAYER7"});
    let redirect = flow
        .handle_return("abc123", Some("TOK1"), &params)
        .await
        .unwrap();
    assert_eq!(
        redirect.url,
        "https://shop.example.com/checkout/success?hash=abc123"
    );

    let stored = backend.invoice(invoice_id);
    assert!(stored.payment_processed);
    assert_eq!(stored.status, "paid");

    let attempts = backend.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].message, "Successful payment");
    assert!(attempts[0].is_successful);
    assert_eq!(attempts[0].external_actor_id.as_deref(), Some("PAYER7"));
    assert_eq!(
        attempts[0].response_snapshot.as_ref().unwrap()["PayerID"],
        "PAYER7"
    );
}

#[tokio::test]
async fn duplicate_return_degrades_to_cancel_page() {
    let backend = MemoryBackend::new();
    seed_in_flight(&backend);
    let flow = build_flow(&backend);

    let params = json!({"token": "TOK1"});
    flow.handle_return("abc123", Some("TOK1"), &params)
        .await
        .unwrap();

    // Replay of the same callback: not an error to the payer, but audited
    // as an invalid notification and sent to the cancel page.
    let redirect = flow
        .handle_return("abc123", Some("TOK1"), &params)
        .await
        .unwrap();
    assert_eq!(
        redirect.url,
        "https://shop.example.com/checkout/cancel?hash=abc123"
    );

    let attempts = backend.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1].message, "Invalid payment notification");
    assert!(!attempts[1].is_successful);
}

#[tokio::test]
async fn wrong_token_is_rejected_and_audited() {
    let backend = MemoryBackend::new();
    let (invoice_id, _) = seed_in_flight(&backend);
    let flow = build_flow(&backend);

    let params = json!({"token": "TOK2"});
    let err = flow
        .handle_return("abc123", Some("TOK2"), &params)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentFlowError::InvalidToken));

    // Invoice untouched, but the rejected callback leaves an audit entry.
    let stored = backend.invoice(invoice_id);
    assert!(!stored.payment_processed);

    let attempts = backend.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].message, "Invalid token");
    assert!(!attempts[0].is_successful);
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let backend = MemoryBackend::new();
    seed_in_flight(&backend);
    let flow = build_flow(&backend);

    let err = flow
        .handle_return("abc123", None, &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentFlowError::InvalidToken));
}

#[tokio::test]
async fn unknown_hash_produces_not_found_without_audit() {
    let backend = MemoryBackend::new();
    seed_in_flight(&backend);
    let flow = build_flow(&backend);

    let err = flow
        .handle_return("deadbeef", Some("TOK1"), &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentFlowError::NotFound));

    // No invoice resolved, so nothing to attach an audit entry to.
    assert!(backend.attempts().is_empty());
}

#[tokio::test]
async fn empty_hash_produces_not_found() {
    let backend = MemoryBackend::new();
    seed_in_flight(&backend);
    let flow = build_flow(&backend);

    let err = flow
        .handle_return("  ", Some("TOK1"), &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentFlowError::NotFound));
    assert!(backend.attempts().is_empty());
}

#[tokio::test]
async fn foreign_gateway_method_is_rejected() {
    let backend = MemoryBackend::new();
    let mut method = test_method();
    method.gateway_driver = "stripe".to_string();
    let mut invoice = test_invoice(method.id, "abc123");
    invoice.external_reference = Some("TOK1".to_string());
    let invoice_id = invoice.id;
    backend.insert_method(method);
    backend.insert_invoice(invoice);
    let flow = build_flow(&backend);

    let err = flow
        .handle_return("abc123", Some("TOK1"), &json!({"token": "TOK1"}))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentFlowError::MismatchedGateway { .. }));

    let stored = backend.invoice(invoice_id);
    assert!(!stored.payment_processed);

    let attempts = backend.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].message, "Invalid payment method");
}

#[tokio::test]
async fn missing_method_is_a_configuration_fault() {
    let backend = MemoryBackend::new();
    let mut invoice = test_invoice(Uuid::new_v4(), "abc123");
    invoice.external_reference = Some("TOK1".to_string());
    backend.insert_invoice(invoice);
    let flow = build_flow(&backend);

    let err = flow
        .handle_return("abc123", Some("TOK1"), &json!({}))
        .await
        .unwrap_err();
    match err {
        PaymentFlowError::Configuration { message } => {
            assert_eq!(message, "Payment method not found")
        }
        other => panic!("expected Configuration, got {:?}", other),
    }

    let attempts = backend.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].message, "Payment method not found");
}

#[tokio::test]
async fn cancel_leaves_invoice_pending_and_logs_cancellation() {
    let backend = MemoryBackend::new();
    let (invoice_id, _) = seed_in_flight(&backend);
    let flow = build_flow(&backend);

    let redirect = flow.handle_cancel("abc123", &json!({})).await.unwrap();
    assert_eq!(
        redirect.url,
        "https://shop.example.com/checkout/cancel?hash=abc123"
    );

    // Cancellation is informational: the invoice can still be paid later.
    let stored = backend.invoice(invoice_id);
    assert!(!stored.payment_processed);
    assert_eq!(stored.status, "pending");

    let attempts = backend.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].message, "Payment cancelled by payer");
    assert!(!attempts[0].is_successful);
}

#[tokio::test]
async fn cancel_with_unknown_hash_is_not_found() {
    let backend = MemoryBackend::new();
    seed_in_flight(&backend);
    let flow = build_flow(&backend);

    let err = flow.handle_cancel("deadbeef", &json!({})).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::NotFound));
    assert!(backend.attempts().is_empty());
}
