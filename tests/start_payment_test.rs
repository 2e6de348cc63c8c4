//! Start-payment flow tests against in-memory stores and a scripted gateway.

mod support;

use payflow_backend::gateway::{GatewayError, GatewayOutcome};
use payflow_backend::services::{PaymentFlow, PaymentFlowError, StartOutcome};
use std::sync::Arc;
use support::{test_callback_config, test_invoice, test_method, MemoryBackend, ScriptedGateway};

fn build_flow(backend: &MemoryBackend, gateway: Arc<ScriptedGateway>) -> PaymentFlow {
    PaymentFlow::new(
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        gateway,
        test_callback_config(),
    )
}

#[tokio::test]
async fn redirect_outcome_records_reference_and_started_attempt() {
    let backend = MemoryBackend::new();
    let method = test_method();
    let invoice = test_invoice(method.id, "abc123");
    backend.insert_method(method.clone());
    backend.insert_invoice(invoice.clone());

    let gateway = Arc::new(ScriptedGateway::with_outcome(Ok(
        GatewayOutcome::RedirectRequired {
            redirect_url: "https://www.sandbox.paypal.com/cgi-bin/webscr?cmd=_express-checkout&token=TOK1"
                .to_string(),
            transaction_reference: "TOK1".to_string(),
            message: None,
        },
    )));
    let flow = build_flow(&backend, gateway.clone());

    let outcome = flow.start_payment(&invoice, &method).await.unwrap();
    match outcome {
        StartOutcome::RedirectTo { url } => assert!(url.contains("token=TOK1")),
        other => panic!("expected redirect, got {:?}", other),
    }

    // Reference is persisted for later token matching; invoice stays pending.
    let stored = backend.invoice(invoice.id);
    assert_eq!(stored.external_reference.as_deref(), Some("TOK1"));
    assert!(!stored.payment_processed);
    assert_eq!(stored.status, "pending");

    let attempts = backend.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].message, "Started payment");
    assert!(!attempts[0].is_successful);
    assert!(attempts[0].request_snapshot.is_some());

    // The callback URLs handed to the processor carry the invoice hash.
    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].return_url.ends_with("/return/abc123"));
    assert!(requests[0].cancel_url.ends_with("/cancel/abc123"));
}

#[tokio::test]
async fn inline_paid_outcome_completes_the_invoice() {
    let backend = MemoryBackend::new();
    let method = test_method();
    let invoice = test_invoice(method.id, "abc123");
    backend.insert_method(method.clone());
    backend.insert_invoice(invoice.clone());

    let gateway = Arc::new(ScriptedGateway::with_outcome(Ok(GatewayOutcome::Paid {
        transaction_reference: "TXN-1".to_string(),
    })));
    let flow = build_flow(&backend, gateway);

    let outcome = flow.start_payment(&invoice, &method).await.unwrap();
    assert_eq!(outcome, StartOutcome::Completed);

    let stored = backend.invoice(invoice.id);
    assert!(stored.payment_processed);
    assert_eq!(stored.status, "paid");
    assert_eq!(stored.external_reference.as_deref(), Some("TXN-1"));

    let attempts = backend.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].message, "Successful payment");
    assert!(attempts[0].is_successful);
}

#[tokio::test]
async fn rejected_outcome_logs_the_processor_message() {
    let backend = MemoryBackend::new();
    let method = test_method();
    let invoice = test_invoice(method.id, "abc123");
    backend.insert_method(method.clone());
    backend.insert_invoice(invoice.clone());

    let gateway = Arc::new(ScriptedGateway::with_outcome(Ok(GatewayOutcome::Failed {
        message: "This transaction cannot be processed.".to_string(),
    })));
    let flow = build_flow(&backend, gateway);

    let err = flow.start_payment(&invoice, &method).await.unwrap_err();
    match err {
        PaymentFlowError::GatewayRejected { message } => {
            assert_eq!(message, "This transaction cannot be processed.")
        }
        other => panic!("expected GatewayRejected, got {:?}", other),
    }

    let stored = backend.invoice(invoice.id);
    assert!(!stored.payment_processed);
    assert!(stored.external_reference.is_none());

    let attempts = backend.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].message, "This transaction cannot be processed.");
    assert!(!attempts[0].is_successful);
}

#[tokio::test]
async fn transport_failure_surfaces_as_rejection() {
    let backend = MemoryBackend::new();
    let method = test_method();
    let invoice = test_invoice(method.id, "abc123");
    backend.insert_method(method.clone());
    backend.insert_invoice(invoice.clone());

    let gateway = Arc::new(ScriptedGateway::with_outcome(Err(
        GatewayError::NetworkError {
            message: "connection reset".to_string(),
        },
    )));
    let flow = build_flow(&backend, gateway);

    let err = flow.start_payment(&invoice, &method).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::GatewayRejected { .. }));

    // The failure is still audited.
    let attempts = backend.attempts();
    assert_eq!(attempts.len(), 1);
    assert!(!attempts[0].is_successful);
}
