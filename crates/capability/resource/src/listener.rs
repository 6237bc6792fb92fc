use crate::dispatch::handle_event;
use crate::error::ResourceError;
use crate::manager::ResourceManager;
use domain::{Resource, ResourceEvent, ServiceFilter};
use mc_bus::{Bus, SubscriptionId};
use mc_queue::{BoundedQueue, QueueConfig, consumer_fn};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{info, warn};

/// 每个监听器的事件队列容量。
const LISTENER_QUEUE_CAPACITY: usize = 100;

/// 订阅 `service.<type>`，经单 worker 队列串行执行资源事件。
pub struct ServiceListener {
    name: String,
    topic: String,
    bus: Bus,
    subscription: SubscriptionId,
    queue: BoundedQueue<ResourceEvent>,
}

impl ServiceListener {
    pub fn start<C>(
        bus: &Bus,
        topic: &str,
        filter: ServiceFilter,
        manager: Arc<dyn ResourceManager<C>>,
    ) -> Result<Self, ResourceError>
    where
        C: Resource + DeserializeOwned + Send + Sync + 'static,
    {
        let name = format!("resource_listener_{}", manager.resource_type());
        let filter = Arc::new(filter);
        let consumer_manager = Arc::clone(&manager);
        let queue = BoundedQueue::new(
            QueueConfig::new(name.clone(), LISTENER_QUEUE_CAPACITY, 1),
            Arc::new(consumer_fn(move |event: ResourceEvent| {
                let manager = Arc::clone(&consumer_manager);
                let filter = Arc::clone(&filter);
                async move {
                    if let Err(err) = handle_event(manager.as_ref(), &filter, &event).await {
                        warn!(
                            target: "mc.resource",
                            resource = %manager.resource_type(),
                            command = ?event.command,
                            id = ?event.id,
                            error = %err,
                            "resource_event_failed"
                        );
                    }
                    Ok(())
                }
            })),
            |event: ResourceEvent| {
                warn!(
                    target: "mc.resource",
                    command = ?event.command,
                    id = ?event.id,
                    "resource_event_dropped"
                );
            },
        );

        let producer = queue.clone();
        let subscription = bus.subscribe(topic, move |data| match data.decode::<ResourceEvent>() {
            Ok(event) => {
                producer.produce(event);
            }
            Err(err) => {
                warn!(target: "mc.resource", error = %err, "resource_event_decode_failed");
            }
        })?;
        info!(target: "mc.resource", listener = %name, topic = %topic, "resource_listener_started");

        Ok(Self {
            name,
            topic: topic.to_string(),
            bus: bus.clone(),
            subscription,
            queue,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 取消订阅并等待队列退出。
    pub async fn stop(&self) {
        if let Err(err) = self.bus.unsubscribe(&self.topic, self.subscription) {
            warn!(target: "mc.resource", listener = %self.name, error = %err, "unsubscribe_failed");
        }
        self.queue.stop().await;
        info!(target: "mc.resource", listener = %self.name, "resource_listener_stopped");
    }
}
