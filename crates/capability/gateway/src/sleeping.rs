use domain::Message;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};

/// 每个节点最多缓存的消息数。
pub const SLEEPING_QUEUE_PER_NODE_LIMIT: usize = 20;

struct Entry {
    logical_id: String,
    message: Message,
}

/// 休眠节点待发消息缓存，按节点 ID 分槽。
///
/// 同逻辑 ID 的消息原位替换；超出上限时丢弃最旧的条目。
pub struct SleepingQueue {
    limit: usize,
    nodes: RwLock<HashMap<String, Vec<Entry>>>,
}

impl Default for SleepingQueue {
    fn default() -> Self {
        Self::new(SLEEPING_QUEUE_PER_NODE_LIMIT)
    }
}

impl SleepingQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// 加入缓存，返回因超限丢弃的条目数。
    pub fn add(&self, message: Message) -> usize {
        let logical_id = message.logical_id();
        let node_id = message.node_id.clone();
        let Ok(mut nodes) = self.nodes.write() else {
            warn!(target: "mc.gateway", node = %node_id, "sleeping_queue_lock_failed");
            return 0;
        };
        let entries = nodes.entry(node_id.clone()).or_default();
        match entries
            .iter_mut()
            .find(|entry| entry.logical_id == logical_id)
        {
            Some(entry) => entry.message = message,
            None => entries.push(Entry {
                logical_id,
                message,
            }),
        }

        let dropped = entries.len().saturating_sub(self.limit);
        if dropped > 0 {
            entries.drain(..dropped);
            warn!(
                target: "mc.gateway",
                node = %node_id,
                dropped,
                limit = self.limit,
                "sleeping_queue_truncated"
            );
            mc_telemetry::record_sleeping_dropped(dropped as u64);
        }
        debug!(target: "mc.gateway", node = %node_id, size = entries.len(), "sleeping_message_queued");
        dropped
    }

    /// 取出并清空节点的全部缓存，保持入队顺序。
    pub fn take(&self, node_id: &str) -> Vec<Message> {
        self.nodes
            .write()
            .ok()
            .and_then(|mut nodes| nodes.remove(node_id))
            .map(|entries| entries.into_iter().map(|entry| entry.message).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, node_id: &str) -> usize {
        self.nodes
            .read()
            .ok()
            .and_then(|nodes| nodes.get(node_id).map(Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes
            .read()
            .map(|nodes| nodes.values().all(Vec::is_empty))
            .unwrap_or(true)
    }

    /// 某节点缓存的快照。
    pub fn messages(&self, node_id: &str) -> Vec<Message> {
        self.nodes
            .read()
            .ok()
            .and_then(|nodes| {
                nodes
                    .get(node_id)
                    .map(|entries| entries.iter().map(|entry| entry.message.clone()).collect())
            })
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut nodes) = self.nodes.write() {
            nodes.clear();
        }
    }
}
