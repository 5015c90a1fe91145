//! Registration with a scheduler registry over HTTP.

use std::sync::Arc;
use std::time::Duration;

use agentd::registry::{self, HttpRegistrar, Registrar, Registration};
use agentd::rpc::PingDispatcher;
use agentd::{AgentError, LifecycleController, LifecycleState};

mod common;

#[tokio::test]
async fn posts_registration_json() {
    let (addr, mut bodies) = common::start_mock_registry(200).await;
    let registrar = HttpRegistrar::new(format!("http://{}/agents", addr), Duration::from_secs(5)).unwrap();

    registrar.register(Registration::new(1577, 4242)).await.unwrap();

    let body: serde_json::Value = serde_json::from_str(&bodies.recv().await.unwrap()).unwrap();
    assert_eq!(body["port"], 1577);
    assert_eq!(body["pid"], 4242);
}

#[tokio::test]
async fn server_error_is_reported() {
    let (addr, _bodies) = common::start_mock_registry(503).await;
    let registrar = HttpRegistrar::new(format!("http://{}/agents", addr), Duration::from_secs(5)).unwrap();

    let err = registrar.register(Registration::new(1, 1)).await.unwrap_err();
    assert!(matches!(err, AgentError::Registration(_)));
}

#[tokio::test]
async fn failed_registration_does_not_fail_start() {
    let home = tempfile::tempdir().unwrap();
    let (addr, mut bodies) = common::start_mock_registry(500).await;

    let mut config = common::test_config(home.path());
    config.registry.url = Some(format!("http://{}/agents", addr));
    let registrar = registry::from_config(&config.registry).unwrap();
    let mut agent = LifecycleController::new(config, Arc::new(PingDispatcher), registrar);

    agent.init().unwrap();
    agent.start().await.unwrap();
    assert_eq!(agent.state(), LifecycleState::Running);
    assert!(agent.is_serving());

    let body: serde_json::Value = serde_json::from_str(&bodies.recv().await.unwrap()).unwrap();
    assert_eq!(body["port"], agent.rpc_addr().unwrap().port());

    agent.stop();
}
