use event_bus::{EventBus, InMemoryBus, RetryPolicy};
use order_flow::config::Config;
use order_flow::health::ProbeStatus;
use order_flow::intake::{AdmissionPolicy, Admitted, IntakeError, ValidationError};
use order_flow::lifecycle::OrderSystem;
use order_flow::model::{InventoryDelta, LineItem, Order, OrderRequest, OrderStatus, OrderStatusEvent, Sku};
use std::sync::Arc;
use std::time::Duration;

fn test_config(policy: AdmissionPolicy) -> Config {
    Config {
        retry: RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5)),
        processing_delay: Duration::from_millis(150),
        shutdown_grace: Duration::from_secs(2),
        admission_policy: policy,
        ..Config::default()
    }
}

fn request(sku: &str, qty: u32) -> OrderRequest {
    OrderRequest {
        user_id: "user-1".to_string(),
        items: vec![LineItem::new(sku, qty)],
        total: 10.0 * f64::from(qty),
        currency: "USD".to_string(),
    }
}

async fn start(policy: AdmissionPolicy) -> (OrderSystem, InMemoryBus) {
    let bus = InMemoryBus::new(3);
    let system = OrderSystem::start(test_config(policy), Arc::new(bus.clone()))
        .await
        .expect("system starts");
    (system, bus)
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// Full end-to-end flow: admit, process, stream, and update inventory.
#[tokio::test]
async fn test_admitted_order_is_paid_streamed_and_counted() {
    let (system, bus) = start(AdmissionPolicy::Snapshot).await;

    let order_id = system.intake.admit(request("S1", 2)).await.expect("admitted");
    let mut viewer = system.broker.subscribe(order_id);

    // Creation event keyed by the minted id
    let created = bus.log_snapshot("orders.created");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].key, order_id.to_string());
    let order: Order = created[0].json().unwrap();
    assert_eq!(order.order_id, order_id);
    assert_eq!(order.items, vec![LineItem::new("S1", 2)]);

    // Exactly one PAID update reaches the viewer
    let payload = tokio::time::timeout(Duration::from_secs(2), viewer.recv())
        .await
        .expect("status within deadline")
        .expect("stream open");
    let event: OrderStatusEvent = serde_json::from_str(&payload).unwrap();
    assert_eq!(event.order_id, order_id);
    assert_eq!(event.status, OrderStatus::Paid);
    assert!(
        tokio::time::timeout(Duration::from_millis(200), viewer.recv())
            .await
            .is_err(),
        "no second status event"
    );

    // Stock updater decremented the ledger and recorded the delta
    let ledger = system.ledger.clone();
    let mut s1 = 0;
    for _ in 0..200 {
        s1 = ledger.snapshot().await.unwrap()[&Sku::from("S1")];
        if s1 == 48 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(s1, 48);
    drop(ledger);

    eventually(|| bus.log_snapshot("inventory.updated").len() == 1).await;
    let delta: InventoryDelta = bus.log_snapshot("inventory.updated")[0].json().unwrap();
    assert_eq!(delta.sku, Sku::from("S1"));
    assert_eq!(delta.delta, -2);
    assert_eq!(delta.new_quantity, 48);
    assert_eq!(delta.order_id, order_id);

    drop(viewer);
    system.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_oversized_order_is_rejected_without_bus_write() {
    let (system, bus) = start(AdmissionPolicy::Snapshot).await;

    let err = system.intake.admit(request("S4", 20)).await.unwrap_err();
    match &err {
        IntakeError::Validation(ValidationError::InsufficientStock {
            sku,
            requested,
            available,
        }) => {
            assert_eq!(sku, &Sku::from("S4"));
            assert_eq!(*requested, 20);
            assert_eq!(*available, 15);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(err.status_code(), 409);

    assert!(bus.log_snapshot("orders.created").is_empty());
    assert_eq!(system.ledger.snapshot().await.unwrap()[&Sku::from("S4")], 15);

    system.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_reserve_policy_admits_only_what_is_in_stock() {
    let (system, bus) = start(AdmissionPolicy::Reserve).await;

    let first = system.intake.clone();
    let second = system.intake.clone();
    let (a, b) = tokio::join!(
        first.admit(request("S4", 10)),
        second.admit(request("S4", 10)),
    );
    drop((first, second));

    assert_eq!(
        [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
        1,
        "exactly one of two competing orders fits"
    );
    assert_eq!(bus.log_snapshot("orders.created").len(), 1);

    // The stock updater records the delta but does not decrement a second time
    eventually(|| bus.log_snapshot("inventory.updated").len() == 1).await;
    assert_eq!(system.ledger.snapshot().await.unwrap()[&Sku::from("S4")], 5);

    system.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_undeliverable_order_fails_and_releases_reservation() {
    let (system, bus) = start(AdmissionPolicy::Reserve).await;
    bus.fail_next_produces(100);

    let err = system.intake.admit(request("S2", 5)).await.unwrap_err();
    assert!(matches!(err, IntakeError::Delivery(_)));
    assert_eq!(err.status_code(), 500);
    assert_eq!(system.ledger.snapshot().await.unwrap()[&Sku::from("S2")], 30);

    bus.fail_next_produces(0);
    system.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_json_boundary_status_codes() {
    let (system, _bus) = start(AdmissionPolicy::Snapshot).await;

    let bad = system.intake.handle_json(b"{ not json").await;
    assert_eq!(bad.status, 400);
    assert!(bad.body["error"].as_str().unwrap().contains("invalid JSON"));

    let empty = system
        .intake
        .handle_json(br#"{"userId":"u","items":[],"total":0,"currency":"USD"}"#)
        .await;
    assert_eq!(empty.status, 400);

    let unknown = system
        .intake
        .handle_json(br#"{"userId":"u","items":[{"sku":"S9","qty":1}],"total":1,"currency":"USD"}"#)
        .await;
    assert_eq!(unknown.status, 409);
    assert_eq!(unknown.body["error"], "product S9 does not exist");

    let ok = system
        .intake
        .handle_json(br#"{"userId":"u","items":[{"sku":"S3","qty":1}],"total":9.5,"currency":"EUR"}"#)
        .await;
    assert_eq!(ok.status, 201);
    let admitted: Admitted = serde_json::from_value(ok.body).unwrap();
    assert!(!admitted.order_id.to_string().is_empty());

    system.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_probes_and_shutdown() {
    let bus = InMemoryBus::new(3);
    bus.set_ready(false);
    let shared: Arc<dyn EventBus> = Arc::new(bus.clone());
    let system = OrderSystem::start(test_config(AdmissionPolicy::Snapshot), shared)
        .await
        .unwrap();

    assert_eq!(system.health.liveness(), ProbeStatus::Ok);
    assert_eq!(system.health.readiness(), ProbeStatus::Unavailable);
    bus.set_ready(true);
    assert_eq!(system.health.readiness(), ProbeStatus::Ok);

    let token = system.cancellation_token();
    tokio::time::timeout(Duration::from_secs(3), system.shutdown())
        .await
        .expect("shutdown within grace")
        .expect("clean shutdown");
    assert!(token.is_cancelled());
}
