use domain::message::ACTION_AWAKE;
use domain::{
    Event, GatewayConfig, Message, MessageType, Payload, PluginConfig, ResourceEvent, StatusType,
    topics,
};
use mc_bus::Bus;
use mc_gateway::{
    GatewayError, GatewayManager, GatewayService, LifecycleState, PROVIDER_VIRTUAL, Provider,
    ProviderContext, ProviderRegistry, VirtualProvider,
};
use mc_resource::ResourceManager;
use mc_scheduler::Scheduler;
use mc_storage::Stores;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn gateway(id: &str) -> GatewayConfig {
    GatewayConfig {
        id: id.to_string(),
        enabled: true,
        provider: PluginConfig::with_type(PROVIDER_VIRTUAL),
        ..Default::default()
    }
}

fn registry_with(provider: Arc<VirtualProvider>) -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    registry.register(
        PROVIDER_VIRTUAL,
        Arc::new(move |_ctx: ProviderContext| {
            let provider: Arc<dyn Provider> = provider.clone();
            Ok(provider)
        }),
    );
    registry
}

fn set_message(node: &str, key: &str, value: &str) -> Message {
    let mut message = Message::new("gw-1", node, "1", MessageType::Set)
        .with_payload(Payload::new(key, value));
    message.is_sleep_node = true;
    message
}

fn awake(node: &str) -> Message {
    Message::new("gw-1", node, "", MessageType::Action).with_payload(Payload::new(ACTION_AWAKE, ""))
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn sleeping_node_messages_flush_on_awake() {
    let bus = Bus::embedded();
    let provider = Arc::new(VirtualProvider::new("gw-1"));
    let service = GatewayService::new(
        gateway("gw-1"),
        &registry_with(provider.clone()),
        bus.clone(),
        Scheduler::new(),
    )
    .expect("service");
    service.start().await.expect("start");

    let topic = topics::to_provider("gw-1");
    bus.publish(&topic, &set_message("5", "V_STATUS", "1"))
        .expect("publish");
    bus.publish(&topic, &set_message("5", "V_DIMMER", "40"))
        .expect("publish");
    bus.publish(&topic, &set_message("5", "V_STATUS", "0"))
        .expect("publish");

    assert!(wait_until(|| service.sleeping().len("5") == 2).await);
    assert!(provider.posted().is_empty());

    bus.publish(&topic, &awake("5")).expect("awake");
    assert!(wait_until(|| provider.posted().len() == 2).await);

    let posted = provider.posted();
    assert_eq!(posted[0].payloads[0].key, "V_STATUS");
    assert_eq!(posted[0].payloads[0].value, "0");
    assert_eq!(posted[1].payloads[0].key, "V_DIMMER");
    assert_eq!(service.sleeping().len("5"), 0);

    service.stop().await.expect("stop");
}

#[tokio::test]
async fn failed_post_is_queued_when_enabled() {
    let bus = Bus::embedded();
    let provider = Arc::new(VirtualProvider::new("gw-1"));
    provider.set_fail_posts(true);
    let mut config = gateway("gw-1");
    config.queue_failed_message = true;
    let service = GatewayService::new(
        config,
        &registry_with(provider.clone()),
        bus.clone(),
        Scheduler::new(),
    )
    .expect("service");
    service.start().await.expect("start");

    let mut message = set_message("7", "V_STATUS", "1");
    message.is_sleep_node = false;
    service.enqueue(message).await.expect("enqueue");
    assert!(wait_until(|| service.sleeping().len("7") == 1).await);

    provider.set_fail_posts(false);
    service.enqueue(awake("7")).await.expect("awake");
    assert!(wait_until(|| provider.posted().len() == 1).await);

    service.stop().await.expect("stop");
}

#[tokio::test]
async fn received_messages_are_stamped_and_forwarded() {
    let bus = Bus::embedded();
    let provider = Arc::new(VirtualProvider::new("gw-1"));
    let service = GatewayService::new(
        gateway("gw-1"),
        &registry_with(provider.clone()),
        bus.clone(),
        Scheduler::new(),
    )
    .expect("service");

    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(topics::MESSAGE_TO_SERVER, move |data| {
        if let Ok(message) = data.decode::<Message>() {
            let _ = tx.send(message);
        }
    })
    .expect("subscribe");

    service.start().await.expect("start");
    let unstamped = Message::new("", "5", "1", MessageType::Set)
        .with_payload(Payload::new("V_TEMP", "21.5"));
    let stamped = Message::new("gw-bridge", "6", "1", MessageType::Set)
        .with_payload(Payload::new("V_TEMP", "19"));
    provider.inject_message(&unstamped).expect("inject");
    provider.inject_message(&stamped).expect("inject");

    let mut forwarded = Vec::new();
    for _ in 0..2 {
        let message = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("forwarded in time")
            .expect("message");
        assert!(message.is_received);
        forwarded.push((message.node_id, message.gateway_id));
    }
    forwarded.sort();
    assert_eq!(
        forwarded,
        vec![
            ("5".to_string(), "gw-1".to_string()),
            ("6".to_string(), "gw-bridge".to_string()),
        ]
    );

    service.stop().await.expect("stop");
}

#[tokio::test]
async fn loopback_echoes_posted_messages() {
    let bus = Bus::embedded();
    let mut config = gateway("gw-1");
    config
        .provider
        .insert("loopback", serde_json::Value::Bool(true));
    let service = GatewayService::new(
        config,
        &ProviderRegistry::with_builtin(),
        bus.clone(),
        Scheduler::new(),
    )
    .expect("service");

    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(topics::MESSAGE_TO_SERVER, move |data| {
        if let Ok(message) = data.decode::<Message>() {
            let _ = tx.send(message);
        }
    })
    .expect("subscribe");
    service.start().await.expect("start");

    let mut message = set_message("3", "V_STATUS", "1");
    message.is_sleep_node = false;
    bus.publish(&topics::to_provider("gw-1"), &message)
        .expect("publish");

    let echoed = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("echo in time")
        .expect("message");
    assert_eq!(echoed.node_id, "3");
    assert!(echoed.is_received);

    service.stop().await.expect("stop");
}

#[tokio::test]
async fn unknown_provider_is_rejected() {
    let mut config = gateway("gw-x");
    config.provider = PluginConfig::with_type("mystery");
    let err = GatewayService::new(
        config,
        &ProviderRegistry::with_builtin(),
        Bus::embedded(),
        Scheduler::new(),
    )
    .err()
    .expect("unknown provider");
    assert_eq!(err, GatewayError::UnknownProvider("mystery".to_string()));
}

#[tokio::test]
async fn start_and_stop_publish_state_events() {
    let bus = Bus::embedded();
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(topics::EVENT_GATEWAY, move |data| {
        if let Ok(event) = data.decode::<Event>() {
            let _ = tx.send(event);
        }
    })
    .expect("subscribe");

    let service = GatewayService::new(
        gateway("gw-1"),
        &ProviderRegistry::with_builtin(),
        bus.clone(),
        Scheduler::new(),
    )
    .expect("service");
    service.start().await.expect("start");
    assert_eq!(service.lifecycle().await, LifecycleState::Running);
    service.stop().await.expect("stop");
    service.stop().await.expect("second stop");
    assert_eq!(service.lifecycle().await, LifecycleState::Stopped);

    let mut statuses = Vec::new();
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event in time")
            .expect("event");
        assert_eq!(event.entity_id, "gw-1");
        statuses.push(event.entity["status"].as_str().unwrap_or_default().to_string());
    }
    assert_eq!(statuses, vec!["up", "down"]);
}

#[tokio::test]
async fn stop_removes_provider_jobs() {
    let scheduler = Scheduler::new();
    let service = GatewayService::new(
        gateway("gw-1"),
        &ProviderRegistry::with_builtin(),
        Bus::embedded(),
        scheduler.clone(),
    )
    .expect("service");
    service.start().await.expect("start");
    scheduler
        .add_func("gateway_gw-1_keepalive", "@every 1h", || async {})
        .expect("job");
    scheduler
        .add_func("gateway_gw-2_keepalive", "@every 1h", || async {})
        .expect("job");

    service.stop().await.expect("stop");
    assert_eq!(scheduler.job_names(), vec!["gateway_gw-2_keepalive"]);
    scheduler.close().await;
}

#[tokio::test]
async fn manager_loads_from_events_and_persists_state() {
    let bus = Bus::embedded();
    let stores = Stores::in_memory();
    stores.gateways.save(gateway("gw-1")).await.expect("save");
    let manager = GatewayManager::new(
        ProviderRegistry::with_builtin(),
        bus.clone(),
        Scheduler::new(),
        stores.clone(),
    );

    let filter = domain::ServiceFilter::default();
    let event = ResourceEvent::new("gateway", domain::ResourceCommand::LoadAll);
    mc_resource::handle_event::<GatewayConfig>(&manager, &filter, &event)
        .await
        .expect("load all");
    assert_eq!(manager.loaded_ids(), vec!["gw-1"]);
    let stored = stores.gateways.get("gw-1").await.expect("get").expect("stored");
    assert_eq!(stored.state.status, StatusType::Up);

    manager.disable("gw-1").await.expect("disable");
    assert!(manager.loaded_ids().is_empty());
    let stored = stores.gateways.get("gw-1").await.expect("get").expect("stored");
    assert!(!stored.enabled);
    assert_eq!(stored.state.status, StatusType::Down);
}
