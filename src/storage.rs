use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use tracing::{info, instrument};

#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    #[error("{0} is outside the asset directory")]
    Outside(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] object_store::Error),

    #[error(transparent)]
    Path(#[from] object_store::path::Error),
}

/// Backing files of assets that live in the device's managed asset directory.
#[async_trait]
pub trait AssetFiles: Send + Sync {
    /// Whether `uri` points into the managed directory.
    fn manages(&self, uri: &str) -> bool;

    async fn remove(&self, uri: &str) -> Result<(), FilesError>;
}

/// [AssetFiles] on top of an [ObjectStore] whose root is the asset directory.
#[derive(Clone)]
pub struct ObjectStoreAssetFiles {
    object_store: Arc<dyn ObjectStore>,
    root: PathBuf,
}

impl ObjectStoreAssetFiles {
    pub fn new(object_store: Arc<dyn ObjectStore>, root: impl Into<PathBuf>) -> Self {
        Self {
            object_store,
            root: root.into(),
        }
    }

    /// Local filesystem store rooted at `root`, creating the directory if needed.
    pub fn local(root: impl AsRef<Path>) -> Result<Self, FilesError> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let root = root.canonicalize()?;

        let object_store = LocalFileSystem::new_with_prefix(&root)?;
        Ok(Self::new(Arc::new(object_store), root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn location(&self, uri: &str) -> Result<object_store::path::Path, FilesError> {
        let relative = Path::new(uri)
            .strip_prefix(&self.root)
            .map_err(|_| FilesError::Outside(uri.to_string()))?;
        let relative = relative
            .to_str()
            .ok_or_else(|| FilesError::Outside(uri.to_string()))?;

        Ok(object_store::path::Path::parse(relative)?)
    }
}

#[async_trait]
impl AssetFiles for ObjectStoreAssetFiles {
    fn manages(&self, uri: &str) -> bool {
        uri.starts_with('/') && Path::new(uri).starts_with(&self.root)
    }

    #[instrument(skip(self))]
    async fn remove(&self, uri: &str) -> Result<(), FilesError> {
        let location = self.location(uri)?;
        self.object_store.delete(&location).await?;

        info!(%location, "removed asset file");
        Ok(())
    }
}
