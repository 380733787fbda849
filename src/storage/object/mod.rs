use async_trait::async_trait;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod local;
pub mod memory;

pub use local::LocalObjectStore;
pub use memory::InMemoryObjectStore;

pub const S3_SCHEME: &str = "s3://";

/// A container + key pair addressing one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub container: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }

    /// Fully qualified form, e.g. `s3://medrecs/calls/visit1.wav`.
    pub fn uri(&self) -> String {
        format!("{}{}/{}", S3_SCHEME, self.container, self.key)
    }

    pub fn parse_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix(S3_SCHEME)
            .ok_or_else(|| anyhow::anyhow!("Unsupported object uri: {}", uri))?;

        match rest.split_once('/') {
            Some((container, key)) if !container.is_empty() && !key.is_empty() => {
                Ok(Self::new(container, key))
            }
            _ => Err(anyhow::anyhow!("Object uri has no container or key: {}", uri)),
        }
    }

    /// Lower-cased text after the last `.` of the key's file name.
    pub fn extension(&self) -> Option<String> {
        let file_name = self.key.rsplit('/').next().unwrap_or(&self.key);
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

impl Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri())
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>>;
    async fn put(&self, container: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}
