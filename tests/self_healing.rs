//! End-to-end self-healing tests against a running service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sre_probes::config::DependencyConfig;
use sre_probes::health::verify::build_verifier;

mod common;

use common::{client, spawn_service, switch_verifier, test_config, wait_for_status};

#[tokio::test]
async fn test_critical_fault_flips_readiness_until_recovery() {
    let healthy = Arc::new(AtomicBool::new(false));
    let service = spawn_service(test_config(), switch_verifier(healthy.clone())).await;
    let client = client();

    let res = client.get(service.url("/readyz")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .get(service.url("/work?fault=DB_FAIL%20connection%20reset"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body = res.text().await.unwrap();
    assert!(body.contains("incident"), "fault text should be hidden: {body}");
    assert!(!body.contains("connection reset"));

    let res = client.get(service.url("/readyz")).send().await.unwrap();
    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "DB_FAIL");

    // Liveness is unaffected by readiness faults
    let res = client.get(service.url("/livez")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    // Dependency still down: several ticks pass, readiness stays down
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!service.state.is_ready());

    healthy.store(true, Ordering::SeqCst);
    assert!(
        wait_for_status(&client, &service.url("/readyz"), 200, Duration::from_secs(5)).await,
        "readiness was not restored"
    );
    let res = client.get(service.url("/readyz")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "Healthy");

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_transient_fault_keeps_service_ready() {
    let service =
        spawn_service(test_config(), switch_verifier(Arc::new(AtomicBool::new(true)))).await;
    let client = client();

    let res = client.get(service.url("/work?fault=cache%20miss")).send().await.unwrap();
    assert_eq!(res.status(), 500);

    let res = client.get(service.url("/readyz")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_dependency_fault_names_dependency() {
    let service =
        spawn_service(test_config(), switch_verifier(Arc::new(AtomicBool::new(false)))).await;
    let client = client();

    let res = client.get(service.url("/work?dependency=postgres")).send().await.unwrap();
    assert_eq!(res.status(), 500);

    let res = client.get(service.url("/readyz")).send().await.unwrap();
    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "postgres");

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_panic_is_contained() {
    let service =
        spawn_service(test_config(), switch_verifier(Arc::new(AtomicBool::new(true)))).await;
    let client = client();

    let res = client.get(service.url("/panic")).send().await.unwrap();
    assert_eq!(res.status(), 500);

    let res = client.get(service.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");
    assert!(service.state.is_ready());

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_exposed_messages_reach_client() {
    let mut config = test_config();
    config.fault_trap.expose_messages = true;
    let service = spawn_service(config, switch_verifier(Arc::new(AtomicBool::new(true)))).await;

    let res = client()
        .get(service.url("/work?fault=quota%20exceeded"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "quota exceeded");

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let service =
        spawn_service(test_config(), switch_verifier(Arc::new(AtomicBool::new(true)))).await;

    let res = client().get(service.url("/livez")).send().await.unwrap();
    let id = res.headers().get("x-request-id").expect("missing request id");
    assert!(uuid::Uuid::parse_str(id.to_str().unwrap()).is_ok());

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_disabled_fault_trap_leaves_readiness_alone() {
    let mut config = test_config();
    config.fault_trap.enabled = false;
    let service = spawn_service(config, switch_verifier(Arc::new(AtomicBool::new(true)))).await;
    let client = client();

    let res = client.get(service.url("/work?fault=DB_FAIL")).send().await.unwrap();
    assert_eq!(res.status(), 500);

    let res = client.get(service.url("/readyz")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_disabled_probes_are_not_routed() {
    let mut config = test_config();
    config.probes.enabled = false;
    let service = spawn_service(config, switch_verifier(Arc::new(AtomicBool::new(true)))).await;

    let res = client().get(service.url("/readyz")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_custom_probe_paths() {
    let mut config = test_config();
    config.probes.liveness_path = "/healthz/live".to_string();
    config.probes.readiness_path = "/healthz/ready".to_string();
    let service = spawn_service(config, switch_verifier(Arc::new(AtomicBool::new(true)))).await;
    let client = client();

    let res = client.get(service.url("/healthz/live")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let res = client.get(service.url("/healthz/ready")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_disabled_recovery_keeps_service_unready() {
    let mut config = test_config();
    config.recovery.enabled = false;
    let service = spawn_service(config, switch_verifier(Arc::new(AtomicBool::new(true)))).await;
    let client = client();

    client.get(service.url("/work?fault=DB_FAIL")).send().await.unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let res = client.get(service.url("/readyz")).send().await.unwrap();
    assert_eq!(res.status(), 503);

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_http_dependency_drives_recovery() {
    let dependency_up = Arc::new(AtomicBool::new(false));
    let flag = dependency_up.clone();
    let dependency = common::start_programmable_backend(move || {
        let flag = flag.clone();
        async move {
            if flag.load(Ordering::SeqCst) {
                (200, "up".to_string())
            } else {
                (503, "down".to_string())
            }
        }
    })
    .await;

    let mut config = test_config();
    config.recovery.dependencies = vec![DependencyConfig::Http {
        name: "inventory".to_string(),
        url: format!("http://{dependency}/health"),
    }];
    let verifier = build_verifier(&config.recovery).unwrap();
    let service = spawn_service(config, verifier).await;
    let client = client();

    client.get(service.url("/work?fault=DB_FAIL")).send().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let res = client.get(service.url("/readyz")).send().await.unwrap();
    assert_eq!(res.status(), 503);

    dependency_up.store(true, Ordering::SeqCst);
    assert!(
        wait_for_status(&client, &service.url("/readyz"), 200, Duration::from_secs(5)).await,
        "readiness was not restored after dependency came back"
    );

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_listener() {
    let service =
        spawn_service(test_config(), switch_verifier(Arc::new(AtomicBool::new(true)))).await;
    let url = service.url("/livez");

    service.stop().await.unwrap();

    assert!(client().get(url).send().await.is_err());
}
