use crate::error::StorageError;
use std::collections::HashMap;
use std::sync::RwLock;

/// `RwLock<HashMap>` 表。
pub(crate) struct Table<T> {
    rows: RwLock<HashMap<String, T>>,
}

impl<T: Clone> Table<T> {
    pub(crate) fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<T> {
        self.rows.read().ok().and_then(|map| map.get(key).cloned())
    }

    pub(crate) fn put(&self, key: String, row: T) -> Result<(), StorageError> {
        let mut map = self
            .rows
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        map.insert(key, row);
        Ok(())
    }

    pub(crate) fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut map = self
            .rows
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(map.remove(key).is_some())
    }

    /// 按过滤条件列出，按键排序。
    pub(crate) fn list(&self, filter: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .read()
            .map(|map| {
                let mut rows: Vec<(&String, &T)> =
                    map.iter().filter(|(_, row)| filter(row)).collect();
                rows.sort_by(|a, b| a.0.cmp(b.0));
                rows.into_iter().map(|(_, row)| row.clone()).collect()
            })
            .unwrap_or_default()
    }
}
