use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use domain::{
    Event, HandlerConfig, HandlerMessage, PluginConfig, ResourceCommand, ResourceData,
    ResourceEvent, State, StatusType, topics,
};
use mc_bus::Bus;
use mc_handler::{
    DelayedAction, HANDLER_NOOP, HANDLER_RESOURCE, Handler, HandlerContext, HandlerData,
    HandlerError, HandlerRegistry, HandlerService, ResourceHandler, persistence_path,
};
use mc_resource::{ResourceError, ResourceManager};
use mc_scheduler::Scheduler;
use mc_storage::Stores;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn handler_config(id: &str, handler_type: &str) -> HandlerConfig {
    HandlerConfig {
        id: id.to_string(),
        enabled: true,
        spec: PluginConfig::with_type(handler_type),
        ..Default::default()
    }
}

fn envelope(yaml: &str) -> String {
    serde_json::json!({
        "type": "resource",
        "disabled": false,
        "data": STANDARD.encode(yaml),
    })
    .to_string()
}

struct FailingHandler;

#[async_trait]
impl Handler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    async fn start(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn post(&self, _data: &HandlerData) -> Result<(), HandlerError> {
        Err(HandlerError::Post("smtp unreachable".to_string()))
    }
}

async fn wait_for_status(service: &HandlerService, id: &str, status: StatusType) -> bool {
    for _ in 0..200 {
        if service.state(id).map(|state| state.status) == Some(status)
            && service
                .state(id)
                .map(|state| state.message != "started successfully")
                .unwrap_or(false)
        {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn bus_messages_reach_loaded_handler() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bus = Bus::embedded();
    let stores = Stores::in_memory();
    stores
        .handlers
        .save(handler_config("notify", HANDLER_NOOP))
        .await
        .expect("save");
    let service = HandlerService::new(
        HandlerRegistry::with_builtin(),
        bus.clone(),
        Scheduler::new(),
        stores.clone(),
        dir.path(),
    );
    service.start().await.expect("start");
    service
        .load(handler_config("notify", HANDLER_NOOP))
        .await
        .expect("load");

    let mut data = BTreeMap::new();
    data.insert("subject".to_string(), "hello".to_string());
    bus.publish(
        topics::MESSAGE_NOTIFY_HANDLER,
        &HandlerMessage {
            id: "notify".to_string(),
            data,
        },
    )
    .expect("publish");

    assert!(wait_for_status(&service, "notify", StatusType::Up).await);
    let state = service.state("notify").expect("state");
    assert!(state.message.starts_with("time taken"));
    let stored = stores.handlers.get("notify").await.expect("get").expect("config");
    assert_eq!(stored.state.status, StatusType::Up);

    service.stop().await;
    assert!(service.loaded_ids().is_empty());
}

#[tokio::test]
async fn failing_handler_reports_error_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bus = Bus::embedded();
    let registry = HandlerRegistry::with_builtin();
    registry.register(
        "failing",
        Arc::new(|_ctx: HandlerContext| {
            let handler: Arc<dyn Handler> = Arc::new(FailingHandler);
            Ok(handler)
        }),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(topics::EVENT_HANDLER, move |data| {
        if let Ok(event) = data.decode::<Event>() {
            let _ = tx.send(event);
        }
    })
    .expect("subscribe");

    let service = HandlerService::new(registry, bus.clone(), Scheduler::new(), Stores::in_memory(), dir.path());
    service
        .load(handler_config("mailer", "failing"))
        .await
        .expect("load");
    service
        .post(HandlerMessage {
            id: "mailer".to_string(),
            data: BTreeMap::new(),
        })
        .await;

    let state = service.state("mailer").expect("state");
    assert_eq!(state.status, StatusType::Error);
    assert!(state.message.contains("smtp unreachable"));

    let mut statuses = Vec::new();
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event in time")
            .expect("event");
        statuses.push(event.entity["status"].as_str().unwrap_or_default().to_string());
    }
    assert_eq!(statuses, vec!["up", "error"]);
}

struct DegradedHandler;

#[async_trait]
impl Handler for DegradedHandler {
    fn name(&self) -> &str {
        "degraded"
    }

    async fn start(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn post(&self, _data: &HandlerData) -> Result<(), HandlerError> {
        Ok(())
    }

    fn state(&self) -> Option<State> {
        Some(State::new(StatusType::Down, "relay offline"))
    }
}

#[tokio::test]
async fn handler_reported_state_takes_precedence() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = HandlerRegistry::with_builtin();
    registry.register(
        "degraded",
        Arc::new(|_ctx: HandlerContext| {
            let handler: Arc<dyn Handler> = Arc::new(DegradedHandler);
            Ok(handler)
        }),
    );
    let service = HandlerService::new(
        registry,
        Bus::embedded(),
        Scheduler::new(),
        Stores::in_memory(),
        dir.path(),
    );
    service
        .load(handler_config("relay", "degraded"))
        .await
        .expect("load");
    service
        .load(handler_config("quiet", HANDLER_NOOP))
        .await
        .expect("load");

    let state = service.state("relay").expect("state");
    assert_eq!(state.status, StatusType::Down);
    assert_eq!(state.message, "relay offline");

    let noop = service.state("quiet").expect("state");
    assert_eq!(noop.status, StatusType::Up);
    assert_eq!(noop.message, "started successfully");
}

#[tokio::test]
async fn unknown_handler_type_fails_to_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = HandlerService::new(
        HandlerRegistry::with_builtin(),
        Bus::embedded(),
        Scheduler::new(),
        Stores::in_memory(),
        dir.path(),
    );
    let err = service
        .load(handler_config("sms", "carrier-pigeon"))
        .await
        .expect_err("unknown");
    assert!(matches!(err, ResourceError::Load(_)));
    assert!(service.loaded_ids().is_empty());
}

#[tokio::test]
async fn messages_for_unknown_ids_are_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = HandlerService::new(
        HandlerRegistry::with_builtin(),
        Bus::embedded(),
        Scheduler::new(),
        Stores::in_memory(),
        dir.path(),
    );
    service
        .post(HandlerMessage {
            id: "ghost".to_string(),
            data: BTreeMap::new(),
        })
        .await;
    assert!(service.state("ghost").is_none());
}

#[tokio::test]
async fn resource_handler_publishes_immediately() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bus = Bus::embedded();
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(topics::SERVICE_GATEWAY, move |data| {
        if let Ok(event) = data.decode::<ResourceEvent>() {
            let _ = tx.send(event);
        }
    })
    .expect("subscribe");

    let handler = ResourceHandler::new("res", bus.clone(), Scheduler::new(), dir.path());
    handler.start().await.expect("start");
    let mut data = BTreeMap::new();
    data.insert(
        "stop_gateway".to_string(),
        envelope("resourceType: gateway\nresourceId: gw-1\ncommand: stop\n"),
    );
    data.insert("note".to_string(), "plain text".to_string());
    handler.post(&data).await.expect("post");

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event in time")
        .expect("event");
    assert_eq!(event.command, ResourceCommand::Stop);
    assert_eq!(event.id.as_deref(), Some("gw-1"));
    assert!(handler.pending().await.is_empty());
}

#[tokio::test]
async fn disabled_envelope_is_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let handler = ResourceHandler::new("res", Bus::embedded(), Scheduler::new(), dir.path());
    let mut data = BTreeMap::new();
    data.insert(
        "later".to_string(),
        serde_json::json!({
            "type": "resource",
            "disabled": true,
            "data": STANDARD.encode("resourceType: gateway\ncommand: stop\npreDelay: 1h\n"),
        })
        .to_string(),
    );
    handler.post(&data).await.expect("post");
    assert!(handler.pending().await.is_empty());
}

#[tokio::test]
async fn delayed_action_is_persisted_and_restored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bus = Bus::embedded();
    let scheduler = Scheduler::new();
    let handler = ResourceHandler::new("res", bus.clone(), scheduler.clone(), dir.path());
    handler.start().await.expect("start");

    let mut data = BTreeMap::new();
    data.insert(
        "reload".to_string(),
        envelope("resourceType: scheduler\nresourceId: s1\ncommand: reload\npreDelay: 1h\n"),
    );
    handler.post(&data).await.expect("post");
    assert_eq!(handler.pending().await.len(), 1);
    let path = persistence_path(dir.path(), "res");
    assert!(path.exists());
    handler.close().await.expect("close");
    assert!(scheduler.job_names().is_empty());

    let restored = ResourceHandler::new("res", bus, scheduler.clone(), dir.path());
    restored.start().await.expect("restart");
    let pending = restored.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].data.resource_id, "s1");
    assert_eq!(scheduler.job_names().len(), 1);
    scheduler.close().await;
}

#[tokio::test]
async fn overdue_action_runs_on_start() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bus = Bus::embedded();
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(topics::SERVICE_GATEWAY, move |data| {
        if let Ok(event) = data.decode::<ResourceEvent>() {
            let _ = tx.send(event);
        }
    })
    .expect("subscribe");

    let action = DelayedAction {
        name: "a1".to_string(),
        data: ResourceData {
            resource_type: "gateway".to_string(),
            resource_id: "gw-9".to_string(),
            command: ResourceCommand::Start,
            payload: serde_json::Value::Null,
            pre_delay: "1h".to_string(),
        },
        delay: "1h".to_string(),
        created_at: chrono::Utc::now() - chrono::TimeDelta::hours(2),
    };
    let mut pending = BTreeMap::new();
    pending.insert(action.name.clone(), action);
    let path = persistence_path(dir.path(), "res");
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&path, serde_yaml::to_string(&pending).expect("yaml")).expect("write");

    let handler = ResourceHandler::new("res", bus, Scheduler::new(), dir.path());
    handler.start().await.expect("start");

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event in time")
        .expect("event");
    assert_eq!(event.id.as_deref(), Some("gw-9"));
    assert!(handler.pending().await.is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn short_delay_fires_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bus = Bus::embedded();
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(topics::SERVICE_GATEWAY, move |data| {
        if let Ok(event) = data.decode::<ResourceEvent>() {
            let _ = tx.send(event);
        }
    })
    .expect("subscribe");

    let handler = ResourceHandler::new("res", bus, Scheduler::new(), dir.path());
    let mut data = BTreeMap::new();
    data.insert(
        "soon".to_string(),
        envelope("resourceType: gateway\nresourceId: gw-2\ncommand: start\npreDelay: 100ms\n"),
    );
    handler.post(&data).await.expect("post");

    let event = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("event in time")
        .expect("event");
    assert_eq!(event.id.as_deref(), Some("gw-2"));
    assert!(
        tokio::time::timeout(Duration::from_millis(400), rx.recv())
            .await
            .is_err()
    );
    assert!(!persistence_path(dir.path(), "res").exists());
}
