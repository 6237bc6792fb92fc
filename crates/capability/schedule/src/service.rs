use crate::cron_spec::build_cron_spec;
use crate::error::ScheduleError;
use crate::validity::{is_valid_schedule, pin_on_date};
use crate::variables::load_webhook_variables;
use async_trait::async_trait;
use chrono::{Local, Utc};
use domain::resource::RESOURCE_SCHEDULE;
use domain::{
    CustomVariable, Event, EventType, GeoLocation, HandlerMessage, ResourceCommand, ResourceEvent,
    ScheduleConfig, ScheduleState, ScheduleType, topics,
};
use mc_bus::Bus;
use mc_resource::{ResourceError, ResourceManager};
use mc_scheduler::Scheduler;
use mc_script::{PassthroughEngine, ScriptEngine, load_variables, render_map};
use mc_storage::Stores;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 用户调度任务名前缀。
pub const JOB_PREFIX: &str = "user_schedule_";
/// 每日刷新日出/日落时间的任务名。
pub const SUN_REFRESH_JOB: &str = "schedule_sun_refresh";

const SUN_REFRESH_SPEC: &str = "5 0 0 * * *";
const ENTITY_SCHEDULE_STATE: &str = "schedule_state";
/// 发布禁用事件后等待状态发布完成。
const DISABLE_SETTLE_DELAY: Duration = Duration::from_millis(50);

pub fn job_name(id: &str) -> String {
    format!("{JOB_PREFIX}{id}")
}

struct Shared {
    bus: Bus,
    scheduler: Scheduler,
    stores: Stores,
    script: Arc<dyn ScriptEngine>,
    http: reqwest::Client,
    location: Option<GeoLocation>,
    schedules: RwLock<HashMap<String, ScheduleConfig>>,
}

/// 已注册的用户调度。
#[derive(Clone)]
pub struct ScheduleService {
    shared: Arc<Shared>,
}

impl ScheduleService {
    pub fn new(
        bus: Bus,
        scheduler: Scheduler,
        stores: Stores,
        location: Option<GeoLocation>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                bus,
                scheduler,
                stores,
                script: Arc::new(PassthroughEngine),
                http: reqwest::Client::new(),
                location,
                schedules: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// 仅在首次启动前调用有效。
    pub fn with_script_engine(self, script: Arc<dyn ScriptEngine>) -> Self {
        match Arc::try_unwrap(self.shared) {
            Ok(mut shared) => {
                shared.script = script;
                Self {
                    shared: Arc::new(shared),
                }
            }
            Err(shared) => Self { shared },
        }
    }

    /// 注册每日日出/日落刷新任务。
    pub fn start(&self) -> Result<(), ScheduleError> {
        let service = self.clone();
        self.shared
            .scheduler
            .add_func(SUN_REFRESH_JOB, SUN_REFRESH_SPEC, move || {
                let service = service.clone();
                async move { service.refresh_sun_schedules() }
            })?;
        info!(target: "mc.schedule", "schedule_service_started");
        Ok(())
    }

    pub fn stop(&self) {
        self.shared.scheduler.remove_func(SUN_REFRESH_JOB);
        self.unload_all();
        info!(target: "mc.schedule", "schedule_service_stopped");
    }

    /// 注册调度；同 ID 的旧任务先被移除。失败信息写入状态并发布。
    pub fn schedule(&self, mut config: ScheduleConfig) -> Result<(), ScheduleError> {
        self.unschedule(&config.id);
        let registered = pin_on_date(&mut config).and_then(|()| {
            let spec = build_cron_spec(
                &config,
                self.shared.location.as_ref(),
                Local::now().date_naive(),
            )?;
            self.shared.register_job(&config.id, &spec)?;
            Ok(spec)
        });

        match registered {
            Ok(spec) => {
                let next = self.shared.scheduler.next_run(&job_name(&config.id));
                config.state.message = match next {
                    Some(next) => format!("scheduled: {spec}, next run: {}", next.to_rfc3339()),
                    None => format!("scheduled: {spec}"),
                };
                info!(target: "mc.schedule", schedule = %config.id, spec = %spec, "schedule_registered");
                let state = config.state.clone();
                let id = config.id.clone();
                if let Ok(mut schedules) = self.shared.schedules.write() {
                    schedules.insert(id.clone(), config);
                }
                self.shared.publish_state(&id, &state);
                Ok(())
            }
            Err(err) => {
                warn!(target: "mc.schedule", schedule = %config.id, error = %err, "schedule_register_failed");
                config.state.last_status = false;
                config.state.message = err.to_string();
                self.shared.publish_state(&config.id, &config.state);
                Err(err)
            }
        }
    }

    /// 移除调度；执行中的触发会继续完成。
    pub fn unschedule(&self, id: &str) -> bool {
        let removed_job = self.shared.scheduler.remove_func(&job_name(id));
        let removed = self
            .shared
            .schedules
            .write()
            .map(|mut schedules| schedules.remove(id).is_some())
            .unwrap_or(false);
        if removed || removed_job {
            debug!(target: "mc.schedule", schedule = %id, "schedule_removed");
        }
        removed || removed_job
    }

    pub fn reload(&self, config: ScheduleConfig) -> Result<(), ScheduleError> {
        self.schedule(config)
    }

    pub fn unload_all(&self) -> usize {
        let removed = self.shared.scheduler.remove_with_prefix(JOB_PREFIX);
        if let Ok(mut schedules) = self.shared.schedules.write() {
            schedules.clear();
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<ScheduleConfig> {
        self.shared
            .schedules
            .read()
            .ok()
            .and_then(|schedules| schedules.get(id).cloned())
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .shared
            .schedules
            .read()
            .map(|schedules| schedules.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// 立即执行一次触发（与定时触发走相同流程）。
    pub async fn trigger(&self, id: &str) {
        Arc::clone(&self.shared).trigger(id).await;
    }

    /// 按当天日期重新计算日出/日落调度。
    pub fn refresh_sun_schedules(&self) {
        let solar: Vec<ScheduleConfig> = self
            .shared
            .schedules
            .read()
            .map(|schedules| {
                schedules
                    .values()
                    .filter(|config| {
                        matches!(
                            config.schedule_type,
                            ScheduleType::Sunrise | ScheduleType::Sunset
                        )
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for config in solar {
            let id = config.id.clone();
            if let Err(err) = self.schedule(config) {
                warn!(target: "mc.schedule", schedule = %id, error = %err, "sun_schedule_refresh_failed");
            }
        }
    }
}

impl Shared {
    fn register_job(self: &Arc<Self>, id: &str, spec: &str) -> Result<(), ScheduleError> {
        let shared = Arc::clone(self);
        let schedule_id = id.to_string();
        self.scheduler.add_func(&job_name(id), spec, move || {
            let shared = Arc::clone(&shared);
            let schedule_id = schedule_id.clone();
            async move { shared.trigger(&schedule_id).await }
        })?;
        Ok(())
    }

    /// 预占一次执行：达到重复次数上限时返回 None。
    fn reserve(&self, id: &str) -> Option<ScheduleConfig> {
        let mut schedules = self.schedules.write().ok()?;
        let config = schedules.get_mut(id)?;
        if config.schedule_type == ScheduleType::Repeat
            && config.spec.repeat_count > 0
            && config.state.executed_count >= config.spec.repeat_count
        {
            return None;
        }
        config.state.executed_count += 1;
        config.state.last_run = Some(Utc::now());
        Some(config.clone())
    }

    async fn trigger(self: Arc<Self>, id: &str) {
        let Some(current) = self
            .schedules
            .read()
            .ok()
            .and_then(|schedules| schedules.get(id).cloned())
        else {
            return;
        };
        match is_valid_schedule(&current, Local::now()) {
            Ok(true) => {}
            Ok(false) => {
                debug!(target: "mc.schedule", schedule = %id, "schedule_outside_validity");
                return;
            }
            Err(err) => {
                warn!(target: "mc.schedule", schedule = %id, error = %err, "schedule_validity_invalid");
                return;
            }
        }
        let Some(config) = self.reserve(id) else {
            debug!(target: "mc.schedule", schedule = %id, "schedule_repeat_limit_reached");
            return;
        };
        mc_telemetry::record_schedule_trigger();

        let started = Instant::now();
        let result = self.execute(&config).await;
        let mut state = config.state.clone();
        state.last_status = result.is_ok();
        state.message = match &result {
            Ok(()) => format!("time taken: {:?}", started.elapsed()),
            Err(err) => {
                warn!(target: "mc.schedule", schedule = %id, error = %err, "schedule_execution_failed");
                err.to_string()
            }
        };

        let mut disable = false;
        if config.schedule_type == ScheduleType::Repeat
            && config.spec.repeat_count > 0
            && state.executed_count >= config.spec.repeat_count
        {
            self.scheduler.remove_func(&job_name(id));
            self.publish_disable(id);
            tokio::time::sleep(DISABLE_SETTLE_DELAY).await;
            state.message = format!(
                "reached the repeat count {}, schedule disabled",
                config.spec.repeat_count
            );
            disable = true;
        } else if config.is_on_date() {
            self.scheduler.remove_func(&job_name(id));
            self.publish_disable(id);
            disable = true;
        }
        debug!(target: "mc.schedule", schedule = %id, executed = state.executed_count, disable, "schedule_triggered");

        if let Ok(mut schedules) = self.schedules.write()
            && let Some(entry) = schedules.get_mut(id)
        {
            entry.state.last_status = state.last_status;
            entry.state.message = state.message.clone();
            state = entry.state.clone();
        }
        self.save_state(id, &state).await;
        self.publish_state(id, &state);
    }

    /// 变量 → 自定义变量 → 渲染参数 → 逐个处理器发布。
    async fn execute(&self, config: &ScheduleConfig) -> Result<(), ScheduleError> {
        let mut variables = load_variables(&self.stores, &config.variables).await?;
        variables.insert(
            "schedule".to_string(),
            serde_json::to_value(config).unwrap_or(Value::Null),
        );

        match &config.custom_variable {
            CustomVariable::None => {}
            CustomVariable::Javascript(script) => {
                let input = Value::Object(variables.clone());
                if let Value::Object(extra) = self.script.execute(script, &input).await? {
                    variables.extend(extra);
                }
            }
            CustomVariable::Webhook(webhook) => {
                let extra = load_webhook_variables(&self.http, webhook, &variables).await?;
                variables.extend(extra);
            }
        }

        let data = render_map(&config.handler_parameters, &Value::Object(variables));
        for handler in &config.handlers {
            let message = HandlerMessage {
                id: handler.clone(),
                data: data.clone(),
            };
            self.bus.publish(topics::MESSAGE_NOTIFY_HANDLER, &message)?;
        }
        Ok(())
    }

    fn publish_disable(&self, id: &str) {
        let event = ResourceEvent::new(RESOURCE_SCHEDULE, ResourceCommand::Disable).with_id(id);
        if let Err(err) = self.bus.publish(topics::SERVICE_SCHEDULER, &event) {
            warn!(target: "mc.schedule", schedule = %id, error = %err, "disable_publish_failed");
        }
    }

    async fn save_state(&self, id: &str, state: &ScheduleState) {
        match self.stores.schedules.get(id).await {
            Ok(Some(mut stored)) => {
                stored.state = state.clone();
                if let Err(err) = self.stores.schedules.save(stored).await {
                    warn!(target: "mc.schedule", schedule = %id, error = %err, "schedule_state_save_failed");
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(target: "mc.schedule", schedule = %id, error = %err, "schedule_state_load_failed");
            }
        }
    }

    fn publish_state(&self, id: &str, state: &ScheduleState) {
        let event = Event::new(EventType::Update, ENTITY_SCHEDULE_STATE, id, state);
        if let Err(err) = self.bus.publish(topics::EVENT_SCHEDULE, &event) {
            warn!(target: "mc.schedule", schedule = %id, error = %err, "state_publish_failed");
        }
    }
}

#[async_trait]
impl ResourceManager<ScheduleConfig> for ScheduleService {
    fn resource_type(&self) -> &str {
        RESOURCE_SCHEDULE
    }

    async fn list_configs(&self) -> Result<Vec<ScheduleConfig>, ResourceError> {
        Ok(self.shared.stores.schedules.list().await?)
    }

    async fn get_config(&self, id: &str) -> Result<Option<ScheduleConfig>, ResourceError> {
        Ok(self.shared.stores.schedules.get(id).await?)
    }

    async fn load(&self, config: ScheduleConfig) -> Result<(), ResourceError> {
        self.schedule(config)
            .map_err(|err| ResourceError::Load(err.to_string()))
    }

    async fn unload(&self, id: &str) -> Result<(), ResourceError> {
        self.unschedule(id);
        Ok(())
    }

    fn loaded_ids(&self) -> Vec<String> {
        self.ids()
    }

    async fn disable(&self, id: &str) -> Result<(), ResourceError> {
        self.unschedule(id);
        let mut config = self
            .shared
            .stores
            .schedules
            .get(id)
            .await?
            .ok_or_else(|| ResourceError::NotFound(id.to_string()))?;
        config.enabled = false;
        self.shared.stores.schedules.save(config).await?;
        info!(target: "mc.schedule", schedule = %id, "schedule_disabled");
        Ok(())
    }
}
