mod common;

use std::time::Duration;

use common::{create_request, harness, FakeGateway, VerifyBehavior};
use payment_engine::models::PaymentStatus;
use payment_engine::worker::{ReconciliationWorker, WorkerConfig};
use tokio::sync::watch;

fn fast_config() -> WorkerConfig {
    WorkerConfig {
        poll_interval_secs: 1,
        batch_size: 10,
        recheck_delay_secs: 0,
        unavailable_backoff_secs: 0,
        lease_secs: 0,
    }
}

#[tokio::test]
async fn test_bounded_retries_fail_after_exactly_max_attempts() {
    let h = harness(FakeGateway::pending(), 20);
    let worker = ReconciliationWorker::new(
        h.service.clone(),
        h.queue.clone(),
        h.store.clone(),
        fast_config(),
    );

    let record = h
        .service
        .create_payment(create_request(42, 7, 5000))
        .await
        .unwrap();
    let reference = record.external_reference.clone();

    // Polls 1..=19: still pending, entry rescheduled, nothing resolved.
    for poll in 1..20 {
        let processed = worker.tick().await.unwrap();
        assert_eq!(processed, 1, "poll {poll} should process the entry");
        assert_eq!(
            h.store.status_of(&reference),
            Some(PaymentStatus::Pending),
            "poll {poll} must not resolve the payment"
        );
        assert_eq!(h.queue.entry(&reference).unwrap().attempts, poll);
    }

    // Poll 20: attempts exhausted, payment FAILED, entry removed.
    worker.tick().await.unwrap();
    assert_eq!(h.store.status_of(&reference), Some(PaymentStatus::Failed));
    assert!(h.queue.entry(&reference).is_none());
    assert_eq!(h.gateway.verify_calls(), 20);

    // Nothing left to do.
    assert_eq!(worker.tick().await.unwrap(), 0);
}

#[tokio::test]
async fn test_worker_applies_accepted_verification() {
    let h = harness(FakeGateway::accepting(), 20);
    let worker = ReconciliationWorker::new(
        h.service.clone(),
        h.queue.clone(),
        h.store.clone(),
        fast_config(),
    );

    let record = h
        .service
        .create_payment(create_request(42, 7, 5000))
        .await
        .unwrap();

    worker.tick().await.unwrap();
    assert_eq!(
        h.store.status_of(&record.external_reference),
        Some(PaymentStatus::Accepted)
    );
    assert!(h.queue.entry(&record.external_reference).is_none());
}

#[tokio::test]
async fn test_gateway_outage_reschedules_without_mutating_status() {
    let h = harness(FakeGateway::unavailable(), 20);
    let worker = ReconciliationWorker::new(
        h.service.clone(),
        h.queue.clone(),
        h.store.clone(),
        fast_config(),
    );

    let record = h
        .service
        .create_payment(create_request(42, 7, 5000))
        .await
        .unwrap();
    let reference = record.external_reference.clone();

    worker.tick().await.unwrap();
    assert_eq!(h.store.status_of(&reference), Some(PaymentStatus::Pending));
    let entry = h.queue.entry(&reference).expect("entry must survive the outage");
    assert_eq!(entry.attempts, 1);

    // Recovery: the gateway comes back and the payment resolves.
    h.gateway.set_verify(VerifyBehavior::Accepted);
    worker.tick().await.unwrap();
    assert_eq!(h.store.status_of(&reference), Some(PaymentStatus::Accepted));
}

#[tokio::test]
async fn test_permanent_outage_still_terminates() {
    let h = harness(FakeGateway::unavailable(), 3);
    let worker = ReconciliationWorker::new(
        h.service.clone(),
        h.queue.clone(),
        h.store.clone(),
        fast_config(),
    );

    let record = h
        .service
        .create_payment(create_request(42, 7, 5000))
        .await
        .unwrap();
    let reference = record.external_reference.clone();

    for _ in 0..3 {
        worker.tick().await.unwrap();
    }

    // A gateway that never answers cannot leave a payment PENDING forever.
    assert_eq!(h.store.status_of(&reference), Some(PaymentStatus::Failed));
    assert!(h.queue.entry(&reference).is_none());
}

#[tokio::test]
async fn test_orphan_queue_entry_is_dropped() {
    let h = harness(FakeGateway::accepting(), 20);
    let worker = ReconciliationWorker::new(
        h.service.clone(),
        h.queue.clone(),
        h.store.clone(),
        fast_config(),
    );

    use payment_engine::queue::ReconciliationQueue;
    h.queue
        .enqueue("CINETPAY_9_9_19700101000000000", Duration::from_secs(0))
        .await
        .unwrap();

    worker.tick().await.unwrap();
    assert_eq!(h.queue.len(), 0);
}

#[tokio::test]
async fn test_rebuild_queue_recovers_pending_rows() {
    let h = harness(FakeGateway::pending(), 20);
    let worker = ReconciliationWorker::new(
        h.service.clone(),
        h.queue.clone(),
        h.store.clone(),
        fast_config(),
    );

    let record = h
        .service
        .create_payment(create_request(42, 7, 5000))
        .await
        .unwrap();
    let reference = record.external_reference.clone();

    // Simulate losing the queue store entirely.
    use payment_engine::queue::ReconciliationQueue;
    h.queue.remove(&reference).await.unwrap();
    assert_eq!(h.queue.len(), 0);

    let added = worker.rebuild_queue().await.unwrap();
    assert_eq!(added, 1);
    let entry = h.queue.entry(&reference).unwrap();
    assert_eq!(entry.attempts, 0);

    // Already-present entries are not re-enqueued.
    assert_eq!(worker.rebuild_queue().await.unwrap(), 0);
}

#[tokio::test]
async fn test_graceful_shutdown_stops_the_loop() {
    let h = harness(FakeGateway::pending(), 20);
    let worker = ReconciliationWorker::new(
        h.service.clone(),
        h.queue.clone(),
        h.store.clone(),
        fast_config(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        worker.run(shutdown_rx).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("worker did not stop after shutdown signal")
        .expect("worker task panicked");
}
