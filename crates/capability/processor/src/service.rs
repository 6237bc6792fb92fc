use crate::error::ProcessorError;
use crate::processor::MessageProcessor;
use domain::{Message, topics};
use mc_bus::{Bus, SubscriptionId};
use mc_queue::{BoundedQueue, QueueConfig, QueueError, consumer_fn};
use std::sync::Arc;
use tracing::{info, warn};

/// 处理器队列容量。
pub const PROCESSOR_QUEUE_CAPACITY: usize = 1000;

const QUEUE_NAME: &str = "gateway_message_processor";

/// 订阅 `message.to_server`，经单 worker 队列调用 [`MessageProcessor`]。
pub struct ProcessorService {
    bus: Bus,
    subscription: SubscriptionId,
    queue: BoundedQueue<Message>,
}

impl ProcessorService {
    pub fn start(bus: &Bus, processor: Arc<MessageProcessor>) -> Result<Self, ProcessorError> {
        let queue = BoundedQueue::new(
            QueueConfig::new(QUEUE_NAME, PROCESSOR_QUEUE_CAPACITY, 1),
            Arc::new(consumer_fn(move |message: Message| {
                let processor = Arc::clone(&processor);
                async move {
                    mc_telemetry::record_processor_message();
                    if let Err(err) = processor.process(&message).await {
                        mc_telemetry::record_processor_failed();
                        warn!(
                            target: "mc.processor",
                            gateway = %message.gateway_id,
                            node = %message.node_id,
                            source = %message.source_id,
                            error = %err,
                            "message_process_failed"
                        );
                    }
                    Ok::<(), QueueError>(())
                }
            })),
            |message: Message| {
                warn!(
                    target: "mc.processor",
                    gateway = %message.gateway_id,
                    node = %message.node_id,
                    "message_dropped"
                );
            },
        );

        let producer = queue.clone();
        let subscription = bus.subscribe(topics::MESSAGE_TO_SERVER, move |data| {
            match data.decode::<Message>() {
                Ok(message) => {
                    producer.produce(message);
                }
                Err(err) => {
                    warn!(target: "mc.processor", error = %err, "message_decode_failed");
                }
            }
        })?;
        info!(target: "mc.processor", topic = topics::MESSAGE_TO_SERVER, capacity = PROCESSOR_QUEUE_CAPACITY, "processor_started");

        Ok(Self {
            bus: bus.clone(),
            subscription,
            queue,
        })
    }

    pub fn queue_size(&self) -> usize {
        self.queue.size()
    }

    pub async fn stop(&self) {
        if let Err(err) = self
            .bus
            .unsubscribe(topics::MESSAGE_TO_SERVER, self.subscription)
        {
            warn!(target: "mc.processor", error = %err, "unsubscribe_failed");
        }
        self.queue.stop().await;
        info!(target: "mc.processor", "processor_stopped");
    }
}
