//! 节点 / 源 / 字段内存存储

use super::table::Table;
use crate::error::StorageError;
use crate::traits::{FieldStore, NodeStore, SourceStore};
use domain::model::{field_key, node_key, source_key};
use domain::{Field, Node, Source};

/// 节点内存存储
pub struct InMemoryNodeStore {
    nodes: Table<Node>,
}

impl InMemoryNodeStore {
    pub fn new() -> Self {
        Self {
            nodes: Table::new(),
        }
    }
}

impl Default for InMemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NodeStore for InMemoryNodeStore {
    async fn get_node(
        &self,
        gateway_id: &str,
        node_id: &str,
    ) -> Result<Option<Node>, StorageError> {
        Ok(self.nodes.get(&node_key(gateway_id, node_id)))
    }

    async fn save_node(&self, node: Node) -> Result<(), StorageError> {
        if node.gateway_id.is_empty() || node.node_id.is_empty() {
            return Err(StorageError::new("node key is incomplete"));
        }
        self.nodes.put(node.key(), node)
    }

    async fn list_nodes(&self, gateway_id: Option<&str>) -> Result<Vec<Node>, StorageError> {
        Ok(self.nodes.list(|node| {
            gateway_id
                .map(|gateway_id| node.gateway_id == gateway_id)
                .unwrap_or(true)
        }))
    }

    async fn delete_node(&self, gateway_id: &str, node_id: &str) -> Result<bool, StorageError> {
        self.nodes.remove(&node_key(gateway_id, node_id))
    }
}

/// 源内存存储
pub struct InMemorySourceStore {
    sources: Table<Source>,
}

impl InMemorySourceStore {
    pub fn new() -> Self {
        Self {
            sources: Table::new(),
        }
    }
}

impl Default for InMemorySourceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SourceStore for InMemorySourceStore {
    async fn get_source(
        &self,
        gateway_id: &str,
        node_id: &str,
        source_id: &str,
    ) -> Result<Option<Source>, StorageError> {
        Ok(self
            .sources
            .get(&source_key(gateway_id, node_id, source_id)))
    }

    async fn save_source(&self, source: Source) -> Result<(), StorageError> {
        if source.gateway_id.is_empty() || source.node_id.is_empty() || source.source_id.is_empty()
        {
            return Err(StorageError::new("source key is incomplete"));
        }
        self.sources.put(source.key(), source)
    }

    async fn list_sources(
        &self,
        gateway_id: &str,
        node_id: &str,
    ) -> Result<Vec<Source>, StorageError> {
        Ok(self
            .sources
            .list(|source| source.gateway_id == gateway_id && source.node_id == node_id))
    }
}

/// 字段内存存储
pub struct InMemoryFieldStore {
    fields: Table<Field>,
}

impl InMemoryFieldStore {
    pub fn new() -> Self {
        Self {
            fields: Table::new(),
        }
    }
}

impl Default for InMemoryFieldStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FieldStore for InMemoryFieldStore {
    async fn get_field(
        &self,
        gateway_id: &str,
        node_id: &str,
        source_id: &str,
        field_id: &str,
    ) -> Result<Option<Field>, StorageError> {
        Ok(self
            .fields
            .get(&field_key(gateway_id, node_id, source_id, field_id)))
    }

    async fn save_field(&self, field: Field) -> Result<(), StorageError> {
        if field.field_id.is_empty() || field.source_id.is_empty() {
            return Err(StorageError::new("field key is incomplete"));
        }
        self.fields.put(field.key(), field)
    }

    async fn list_fields(
        &self,
        gateway_id: &str,
        node_id: &str,
        source_id: &str,
    ) -> Result<Vec<Field>, StorageError> {
        Ok(self.fields.list(|field| {
            field.gateway_id == gateway_id
                && field.node_id == node_id
                && field.source_id == source_id
        }))
    }
}
