use crate::backend::{BusBackend, BusHandler, SubscriptionId};
use crate::data::BusData;
use crate::error::BusError;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, warn};

struct Subscription {
    group: Option<String>,
    sender: mpsc::UnboundedSender<BusData>,
}

#[derive(Default)]
struct EmbeddedState {
    topics: HashMap<String, Vec<SubscriptionId>>,
    subs: HashMap<SubscriptionId, Subscription>,
    counter: SubscriptionId,
    /// 队列组轮询游标：(topic, group) → 下一个成员下标。
    cursors: HashMap<(String, String), usize>,
    closed: bool,
}

/// 嵌入式后端。
///
/// 单把锁保护 topic 表与订阅表；发布时在锁内取快照、锁外发送。
/// 每个订阅拥有独立的发送队列与派发任务，保证 (topic, 订阅者) 维度有序。
#[derive(Default)]
pub struct EmbeddedBackend {
    state: Mutex<EmbeddedState>,
}

impl EmbeddedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, EmbeddedState>, BusError> {
        self.state.lock().map_err(|_| BusError::Lock)
    }

    fn register(
        &self,
        topic: &str,
        group: Option<&str>,
        handler: BusHandler,
    ) -> Result<SubscriptionId, BusError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|err| BusError::Runtime(err.to_string()))?;
        let (sender, mut receiver) = mpsc::unbounded_channel::<BusData>();

        let id = {
            let mut state = self.lock()?;
            if state.closed {
                return Err(BusError::Closed);
            }
            state.counter += 1;
            let id = state.counter;
            state.topics.entry(topic.to_string()).or_default().push(id);
            state.subs.insert(
                id,
                Subscription {
                    group: group.map(str::to_string),
                    sender,
                },
            );
            id
        };

        let topic_name = topic.to_string();
        runtime.spawn(async move {
            while let Some(data) = receiver.recv().await {
                if catch_unwind(AssertUnwindSafe(|| handler(data))).is_err() {
                    warn!(
                        target: "mc.bus",
                        topic = %topic_name,
                        subscription = id,
                        "subscriber_panicked"
                    );
                }
            }
        });
        debug!(target: "mc.bus", topic = %topic, subscription = id, group = ?group, "subscribed");
        Ok(id)
    }
}

impl BusBackend for EmbeddedBackend {
    fn publish(&self, data: BusData) -> Result<(), BusError> {
        let targets: Vec<mpsc::UnboundedSender<BusData>> = {
            let mut guard = self.lock()?;
            let state = &mut *guard;
            if state.closed {
                return Err(BusError::Closed);
            }
            let Some(ids) = state.topics.get(&data.topic) else {
                return Ok(());
            };
            let mut targets = Vec::with_capacity(ids.len());
            let mut groups: HashMap<&str, Vec<SubscriptionId>> = HashMap::new();
            for id in ids {
                let Some(sub) = state.subs.get(id) else {
                    continue;
                };
                match sub.group.as_deref() {
                    Some(group) => groups.entry(group).or_default().push(*id),
                    None => targets.push(sub.sender.clone()),
                }
            }
            for (group, members) in groups {
                let cursor = state
                    .cursors
                    .entry((data.topic.clone(), group.to_string()))
                    .or_insert(0);
                let chosen = members[*cursor % members.len()];
                *cursor = cursor.wrapping_add(1);
                if let Some(sub) = state.subs.get(&chosen) {
                    targets.push(sub.sender.clone());
                }
            }
            targets
        };

        for target in targets {
            // 接收端已退订时忽略。
            let _ = target.send(data.clone());
        }
        Ok(())
    }

    fn subscribe(&self, topic: &str, handler: BusHandler) -> Result<SubscriptionId, BusError> {
        self.register(topic, None, handler)
    }

    fn queue_subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: BusHandler,
    ) -> Result<SubscriptionId, BusError> {
        self.register(topic, Some(group), handler)
    }

    fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> Result<(), BusError> {
        let mut state = self.lock()?;
        if let Some(ids) = state.topics.get_mut(topic) {
            ids.retain(|item| *item != id);
            if ids.is_empty() {
                state.topics.remove(topic);
            }
        }
        state.subs.remove(&id);
        debug!(target: "mc.bus", topic = %topic, subscription = id, "unsubscribed");
        Ok(())
    }

    fn unsubscribe_all(&self, topic: &str) -> Result<(), BusError> {
        let mut state = self.lock()?;
        if let Some(ids) = state.topics.remove(topic) {
            for id in ids {
                state.subs.remove(&id);
            }
        }
        state.cursors.retain(|(item, _), _| item != topic);
        Ok(())
    }

    fn close(&self) -> Result<(), BusError> {
        let mut state = self.lock()?;
        state.closed = true;
        state.topics.clear();
        state.subs.clear();
        state.cursors.clear();
        Ok(())
    }
}
