use std::collections::HashMap;
use std::sync::RwLock;
use async_trait::async_trait;
use anyhow::Result;

use super::{ObjectLocation, ObjectStore};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectLocation, StoredObject>>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn object(&self, container: &str, key: &str) -> Option<StoredObject> {
        let objects = self.objects.read().ok()?;
        objects.get(&ObjectLocation::new(container, key)).cloned()
    }

    /// Keys in `container` starting with `prefix`, sorted.
    pub fn keys_with_prefix(&self, container: &str, prefix: &str) -> Vec<String> {
        let Ok(objects) = self.objects.read() else {
            return Vec::new();
        };
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|loc| loc.container == container && loc.key.starts_with(prefix))
            .map(|loc| loc.key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.read().map_err(|e| anyhow::anyhow!(e.to_string()))?;
        objects
            .get(&ObjectLocation::new(container, key))
            .map(|obj| obj.body.clone())
            .ok_or_else(|| anyhow::anyhow!("Object not found: {}", ObjectLocation::new(container, key)))
    }

    async fn put(&self, container: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let mut objects = self.objects.write().map_err(|e| anyhow::anyhow!(e.to_string()))?;
        objects.insert(
            ObjectLocation::new(container, key),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
