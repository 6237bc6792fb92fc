//! 资源配置内存存储

use super::table::Table;
use crate::error::StorageError;
use crate::traits::ResourceStore;
use domain::Resource;

/// 资源配置内存存储，按 `resource_id` 寻址。
pub struct InMemoryResourceStore<T> {
    items: Table<T>,
}

impl<T: Clone> InMemoryResourceStore<T> {
    pub fn new() -> Self {
        Self {
            items: Table::new(),
        }
    }
}

impl<T: Clone> Default for InMemoryResourceStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<T> ResourceStore<T> for InMemoryResourceStore<T>
where
    T: Resource + Clone + Send + Sync + 'static,
{
    async fn get(&self, id: &str) -> Result<Option<T>, StorageError> {
        Ok(self.items.get(id))
    }

    async fn list(&self) -> Result<Vec<T>, StorageError> {
        Ok(self.items.list(|_| true))
    }

    async fn save(&self, item: T) -> Result<(), StorageError> {
        let id = item.resource_id().trim().to_string();
        if id.is_empty() {
            return Err(StorageError::new("resource id is empty"));
        }
        self.items.put(id, item)
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        self.items.remove(id)
    }
}
