use crate::error::GatewayError;
use domain::gateway::MIN_ACK_TIMEOUT;
use domain::topics;
use mc_bus::{Bus, SubscriptionId};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 单次 ACK 等待：先订阅 `message.raw_message_acknowledgement.<gw>.<msg>`，再下发消息。
///
/// 无论结果如何，订阅在等待结束（或 drop）时释放。
pub struct AckWaiter {
    bus: Bus,
    topic: String,
    gateway_id: String,
    msg_id: String,
    subscription: Option<SubscriptionId>,
    receiver: Option<oneshot::Receiver<()>>,
}

impl AckWaiter {
    pub fn register(bus: &Bus, gateway_id: &str, msg_id: &str) -> Result<Self, GatewayError> {
        let topic = topics::raw_ack(gateway_id, msg_id);
        let (sender, receiver) = oneshot::channel();
        let sender = Arc::new(Mutex::new(Some(sender)));
        let subscription = bus.subscribe(&topic, move |_data| {
            if let Some(sender) = sender.lock().ok().and_then(|mut slot| slot.take()) {
                let _ = sender.send(());
            }
        })?;
        Ok(Self {
            bus: bus.clone(),
            topic,
            gateway_id: gateway_id.to_string(),
            msg_id: msg_id.to_string(),
            subscription: Some(subscription),
            receiver: Some(receiver),
        })
    }

    /// 等待 ACK；超时小于 10ms 时按 10ms 处理。
    pub async fn wait(
        mut self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), GatewayError> {
        let timeout = timeout.max(MIN_ACK_TIMEOUT);
        let Some(receiver) = self.receiver.take() else {
            return Err(GatewayError::Cancelled);
        };
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(GatewayError::Cancelled),
            received = tokio::time::timeout(timeout, receiver) => match received {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => Err(GatewayError::Cancelled),
                Err(_) => Err(GatewayError::AckTimeout {
                    gateway_id: self.gateway_id.clone(),
                    msg_id: self.msg_id.clone(),
                }),
            },
        };
        match &result {
            Ok(()) => debug!(target: "mc.gateway", gateway = %self.gateway_id, msg_id = %self.msg_id, "ack_received"),
            Err(err) => warn!(target: "mc.gateway", gateway = %self.gateway_id, msg_id = %self.msg_id, error = %err, "ack_wait_failed"),
        }
        self.release();
        result
    }

    fn release(&mut self) {
        if let Some(id) = self.subscription.take() {
            let _ = self.bus.unsubscribe(&self.topic, id);
        }
    }
}

impl Drop for AckWaiter {
    fn drop(&mut self) {
        self.release();
    }
}

/// 注册 ACK 订阅、执行下发，再等待 ACK。
pub async fn wait_for_ack<F, Fut>(
    bus: &Bus,
    gateway_id: &str,
    msg_id: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    send: F,
) -> Result<(), GatewayError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), GatewayError>>,
{
    let waiter = AckWaiter::register(bus, gateway_id, msg_id)?;
    send().await?;
    waiter.wait(timeout, cancel).await
}

/// Provider 收到设备 ACK 后调用。
pub fn publish_ack(bus: &Bus, gateway_id: &str, msg_id: &str) -> Result<(), GatewayError> {
    bus.publish(&topics::raw_ack(gateway_id, msg_id), &msg_id.to_string())?;
    Ok(())
}
