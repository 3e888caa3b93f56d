use directories::ProjectDirs;
use leafview_core::{SavedView, ViewerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_SCHEMA_VERSION: u32 = 1;
const VIEWS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigEnvelope {
    version: u32,
    config: ViewerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ViewsEnvelope {
    version: u32,
    /// Keyed by document path as given on open.
    views: BTreeMap<String, SavedView>,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "Leafview", "Leafview")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_config(&self) -> Result<ViewerConfig, StorageError> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(ViewerConfig::default());
        }

        let bytes = fs::read(path)?;
        let envelope: ConfigEnvelope = serde_json::from_slice(&bytes)?;

        Ok(envelope.config)
    }

    pub fn save_config(&self, config: &ViewerConfig) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope = ConfigEnvelope { version: CONFIG_SCHEMA_VERSION, config: config.clone() };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(self.config_path(), bytes)?;
        Ok(())
    }

    /// Saved view for `document`, if one was stored.
    pub fn load_view(&self, document: &Path) -> Result<Option<SavedView>, StorageError> {
        let views = self.read_views()?;
        Ok(views.views.get(&view_key(document)).copied())
    }

    pub fn save_view(&self, document: &Path, view: &SavedView) -> Result<(), StorageError> {
        let mut views = self.read_views()?;
        views.version = VIEWS_SCHEMA_VERSION;
        views.views.insert(view_key(document), *view);

        fs::create_dir_all(&self.root)?;
        let bytes = serde_json::to_vec_pretty(&views)?;
        fs::write(self.views_path(), bytes)?;

        tracing::debug!(
            document = %document.display(),
            page = view.page,
            zoom = view.zoom,
            "saved view"
        );
        Ok(())
    }

    fn read_views(&self) -> Result<ViewsEnvelope, StorageError> {
        let path = self.views_path();
        if !path.exists() {
            return Ok(ViewsEnvelope { version: VIEWS_SCHEMA_VERSION, views: BTreeMap::new() });
        }

        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    fn views_path(&self) -> PathBuf {
        self.root.join("views.json")
    }
}

fn view_key(document: &Path) -> String {
    document.to_string_lossy().into_owned()
}
