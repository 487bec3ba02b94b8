/// Configuration for the generator and archive browser
///
/// The default `model_id` points at `runwayml/stable-diffusion-v1-5`. That
/// repository is gone from the hub, so fresh installs should set
/// `"model_id": "stable-diffusion-v1-5/stable-diffusion-v1-5"` (the
/// mirror) in the config file or pass it with `--model-id`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::output::OutputDirs;
use crate::pipeline::stable_diffusion::DEFAULT_MODEL_ID;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Hub identifier of the pretrained pipeline; see
    /// [`V1_5_MIRROR_ID`](crate::pipeline::stable_diffusion::V1_5_MIRROR_ID)
    pub model_id: String,
    /// Directory receiving generated images
    pub images_dir: PathBuf,
    /// Directory receiving metadata records
    pub metadata_dir: PathBuf,
    /// Skip accelerator detection and run on CPU
    pub force_cpu: bool,
    /// Attention slice size; lowers peak memory at some speed cost
    pub sliced_attention_size: Option<usize>,
    /// Columns in the gallery grid
    pub gallery_columns: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            images_dir: PathBuf::from("images"),
            metadata_dir: PathBuf::from("metadata"),
            force_cpu: false,
            sliced_attention_size: None,
            gallery_columns: 3,
        }
    }
}

impl AppConfig {
    /// Load from `config_path`, or the default location when `None`
    ///
    /// A missing file gives the defaults; a file that fails to parse is an
    /// error.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => default_config_path(),
        };

        if !config_file.exists() {
            debug!("No config at {}, using defaults", config_file.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_file)?;
        let config = serde_json::from_str(&content)?;
        debug!("Loaded config from {}", config_file.display());
        Ok(config)
    }

    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content)?;
        Ok(())
    }

    pub fn output_dirs(&self) -> OutputDirs {
        OutputDirs::new(&self.images_dir, &self.metadata_dir)
    }
}

/// `<config dir>/sd-studio/config.json`, e.g. ~/.config/sd-studio/config.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sd-studio")
        .join("config.json")
}
