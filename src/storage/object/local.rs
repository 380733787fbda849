use std::path::{Component, Path, PathBuf};
use async_trait::async_trait;
use anyhow::Result;
use tokio::fs;
use tracing::debug;

use super::{ObjectLocation, ObjectStore};

const CONTENT_TYPE_SUFFIX: &str = ".content-type";

/// Filesystem-backed store. Each container is a directory under `root`.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, container: &str, key: &str) -> Result<PathBuf> {
        check_segment(container)?;
        check_segment(key)?;
        // Those names hold the content type of their sibling object.
        if key.ends_with(CONTENT_TYPE_SUFFIX) {
            return Err(anyhow::anyhow!("Reserved key suffix {}: {}", CONTENT_TYPE_SUFFIX, key));
        }
        Ok(self.root.join(container).join(key))
    }

    pub async fn content_type(&self, container: &str, key: &str) -> Result<Option<String>> {
        let path = sidecar_path(&self.object_path(container, key)?);
        match fs::read_to_string(&path).await {
            Ok(content_type) => Ok(Some(content_type)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Failed to read {}: {}", path.display(), e)),
        }
    }
}

fn check_segment(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(anyhow::anyhow!("Empty container or key"));
    }
    let path = Path::new(value);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(anyhow::anyhow!("Invalid object path segment: {}", value));
    }
    Ok(())
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(CONTENT_TYPE_SUFFIX);
    PathBuf::from(name)
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(container, key)?;
        fs::read(&path).await.map_err(|e| {
            anyhow::anyhow!("Failed to read {}: {}", ObjectLocation::new(container, key), e)
        })
    }

    async fn put(&self, container: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let path = self.object_path(container, key)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create directory: {}", e))?;
        }

        debug!("Writing {} bytes to {}", body.len(), path.display());
        fs::write(&path, body)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write file: {}", e))?;
        fs::write(sidecar_path(&path), content_type)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write content type: {}", e))?;
        Ok(())
    }
}
