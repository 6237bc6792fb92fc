use async_trait::async_trait;
use chrono::{Datelike, Local, Timelike};
use domain::{
    CustomVariable, Event, Field, FieldValue, Frequency, HandlerMessage, ResourceCommand,
    ResourceEvent, ScheduleConfig, ScheduleSpec, ScheduleType, topics,
};
use mc_bus::Bus;
use mc_resource::ResourceManager;
use mc_schedule::{ScheduleService, job_name};
use mc_scheduler::Scheduler;
use mc_script::{ScriptEngine, ScriptError};
use mc_storage::Stores;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn schedule(id: &str, schedule_type: ScheduleType, spec: ScheduleSpec) -> ScheduleConfig {
    ScheduleConfig {
        id: id.to_string(),
        enabled: true,
        schedule_type,
        spec,
        handlers: vec!["notify".to_string()],
        ..Default::default()
    }
}

fn on_date(id: &str, date: &str) -> ScheduleConfig {
    schedule(
        id,
        ScheduleType::Simple,
        ScheduleSpec {
            frequency: Frequency::OnDate,
            time: "08:00:00".to_string(),
            date: date.to_string(),
            ..Default::default()
        },
    )
}

fn handler_messages(bus: &Bus) -> mpsc::UnboundedReceiver<HandlerMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    bus.subscribe(topics::MESSAGE_NOTIFY_HANDLER, move |data| {
        if let Ok(message) = data.decode::<HandlerMessage>() {
            let _ = tx.send(message);
        }
    })
    .expect("subscribe handler");
    rx
}

fn resource_events(bus: &Bus) -> mpsc::UnboundedReceiver<ResourceEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    bus.subscribe(topics::SERVICE_SCHEDULER, move |data| {
        if let Ok(event) = data.decode::<ResourceEvent>() {
            let _ = tx.send(event);
        }
    })
    .expect("subscribe service");
    rx
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("message in time")
        .expect("message")
}

struct FixedScript(Value);

#[async_trait]
impl ScriptEngine for FixedScript {
    async fn execute(&self, _script: &str, _input: &Value) -> Result<Value, ScriptError> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn on_date_schedule_is_pinned_to_its_date() {
    let scheduler = Scheduler::new();
    let service = ScheduleService::new(Bus::embedded(), scheduler.clone(), Stores::in_memory(), None);

    service.schedule(on_date("once", "2099-01-05")).expect("schedule");

    let next = scheduler.next_run(&job_name("once")).expect("next run");
    assert_eq!((next.year(), next.month(), next.day()), (2099, 1, 5));
    assert_eq!((next.hour(), next.minute(), next.second()), (8, 0, 0));

    let registered = service.get("once").expect("registered");
    assert!(registered.validity.enabled);
    assert_eq!(registered.validity.date.from, "2099-01-05");
    assert_eq!(registered.validity.date.to, "2099-01-05");

    scheduler.close().await;
}

#[tokio::test]
async fn on_date_trigger_notifies_handlers_and_disables_itself() {
    let bus = Bus::embedded();
    let scheduler = Scheduler::new();
    let mut messages = handler_messages(&bus);
    let mut events = resource_events(&bus);
    let service = ScheduleService::new(bus.clone(), scheduler.clone(), Stores::in_memory(), None);

    let today = Local::now().format("%Y-%m-%d").to_string();
    service.schedule(on_date("today", &today)).expect("schedule");
    service.trigger("today").await;

    let message = recv(&mut messages).await;
    assert_eq!(message.id, "notify");

    let event = recv(&mut events).await;
    assert_eq!(event.command, ResourceCommand::Disable);
    assert_eq!(event.id.as_deref(), Some("today"));
    assert!(!scheduler.contains(&job_name("today")));

    scheduler.close().await;
}

#[tokio::test]
async fn on_date_outside_validity_does_not_fire() {
    let bus = Bus::embedded();
    let scheduler = Scheduler::new();
    let mut messages = handler_messages(&bus);
    let service = ScheduleService::new(bus.clone(), scheduler.clone(), Stores::in_memory(), None);

    service.schedule(on_date("future", "2099-01-05")).expect("schedule");
    service.trigger("future").await;

    let state = service.get("future").expect("registered").state;
    assert_eq!(state.executed_count, 0);
    assert!(
        tokio::time::timeout(Duration::from_millis(100), messages.recv())
            .await
            .is_err()
    );

    scheduler.close().await;
}

#[tokio::test]
async fn repeat_count_is_never_exceeded() {
    let bus = Bus::embedded();
    let scheduler = Scheduler::new();
    let mut messages = handler_messages(&bus);
    let mut events = resource_events(&bus);
    let stores = Stores::in_memory();
    let config = schedule(
        "blink",
        ScheduleType::Repeat,
        ScheduleSpec {
            repeat_interval: "20ms".to_string(),
            repeat_count: 3,
            ..Default::default()
        },
    );
    stores.schedules.save(config.clone()).await.expect("save");
    let service = ScheduleService::new(bus.clone(), scheduler.clone(), stores.clone(), None);
    service.schedule(config).expect("schedule");

    let event = recv(&mut events).await;
    assert_eq!(event.command, ResourceCommand::Disable);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut delivered = 0;
    while messages.try_recv().is_ok() {
        delivered += 1;
    }
    assert_eq!(delivered, 3);
    assert!(!scheduler.contains(&job_name("blink")));

    let stored = stores.schedules.get("blink").await.expect("get").expect("config");
    assert_eq!(stored.state.executed_count, 3);
    assert!(stored.state.message.contains("repeat count"));

    scheduler.close().await;
}

#[tokio::test]
async fn handler_parameters_are_rendered_with_variables() {
    let bus = Bus::embedded();
    let scheduler = Scheduler::new();
    let mut messages = handler_messages(&bus);
    let stores = Stores::in_memory();
    let mut field = Field::new("gw", "1", "2", "temp");
    field.shift_value(FieldValue::F64(22.5), true, chrono::Utc::now());
    stores.fields.save_field(field).await.expect("save field");

    let mut config = schedule(
        "report",
        ScheduleType::Cron,
        ScheduleSpec {
            cron_expression: "0 0 0 1 1 *".to_string(),
            ..Default::default()
        },
    );
    config.variables = BTreeMap::from([("temp".to_string(), "field:gw.1.2.temp".to_string())]);
    config.handler_parameters = BTreeMap::from([
        ("text".to_string(), "temperature {{ .temp.current.value }}".to_string()),
        ("by".to_string(), "{{ .schedule.id }}".to_string()),
    ]);
    let service = ScheduleService::new(bus.clone(), scheduler.clone(), stores, None);
    service.schedule(config).expect("schedule");
    service.trigger("report").await;

    let message = recv(&mut messages).await;
    assert_eq!(message.data.get("text").map(String::as_str), Some("temperature 22.5"));
    assert_eq!(message.data.get("by").map(String::as_str), Some("report"));

    let state = service.get("report").expect("registered").state;
    assert!(state.last_status);
    assert!(state.message.starts_with("time taken"));

    scheduler.close().await;
}

#[tokio::test]
async fn javascript_custom_variable_is_merged() {
    let bus = Bus::embedded();
    let scheduler = Scheduler::new();
    let mut messages = handler_messages(&bus);
    let mut config = schedule(
        "scripted",
        ScheduleType::Cron,
        ScheduleSpec {
            cron_expression: "0 0 0 1 1 *".to_string(),
            ..Default::default()
        },
    );
    config.custom_variable = CustomVariable::Javascript("({greeting: 'hi'})".to_string());
    config.handler_parameters =
        BTreeMap::from([("text".to_string(), "{{ .greeting }} there".to_string())]);
    let service = ScheduleService::new(bus.clone(), scheduler.clone(), Stores::in_memory(), None)
        .with_script_engine(Arc::new(FixedScript(json!({"greeting": "hi"}))));
    service.schedule(config).expect("schedule");
    service.trigger("scripted").await;

    let message = recv(&mut messages).await;
    assert_eq!(message.data.get("text").map(String::as_str), Some("hi there"));

    scheduler.close().await;
}

#[tokio::test]
async fn invalid_config_publishes_error_state() {
    let bus = Bus::embedded();
    let scheduler = Scheduler::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(topics::EVENT_SCHEDULE, move |data| {
        if let Ok(event) = data.decode::<Event>() {
            let _ = tx.send(event);
        }
    })
    .expect("subscribe");
    let service = ScheduleService::new(bus.clone(), scheduler.clone(), Stores::in_memory(), None);

    let sunrise = schedule("dawn", ScheduleType::Sunrise, ScheduleSpec::default());
    let err = service.load(sunrise).await.expect_err("no location");
    assert!(err.to_string().contains("location"));
    assert!(service.loaded_ids().is_empty());

    let event = recv(&mut rx).await;
    assert_eq!(event.entity_id, "dawn");
    assert_eq!(event.entity["lastStatus"], json!(false));
    assert!(!scheduler.contains(&job_name("dawn")));

    scheduler.close().await;
}

#[tokio::test]
async fn disable_persists_and_unschedules() {
    let stores = Stores::in_memory();
    let scheduler = Scheduler::new();
    let config = schedule(
        "nightly",
        ScheduleType::Cron,
        ScheduleSpec {
            cron_expression: "0 0 3 * * *".to_string(),
            ..Default::default()
        },
    );
    stores.schedules.save(config.clone()).await.expect("save");
    let service = ScheduleService::new(Bus::embedded(), scheduler.clone(), stores.clone(), None);
    service.load(config).await.expect("load");
    assert_eq!(service.loaded_ids(), vec!["nightly".to_string()]);

    service.disable("nightly").await.expect("disable");
    assert!(service.loaded_ids().is_empty());
    assert!(!scheduler.contains(&job_name("nightly")));
    let stored = stores.schedules.get("nightly").await.expect("get").expect("config");
    assert!(!stored.enabled);

    scheduler.close().await;
}
