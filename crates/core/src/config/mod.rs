use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

use crate::Result;

/// Top-level media controller configuration.
///
/// `slides:` and `slide_player:` accept several shorthand forms, so they are
/// kept as raw YAML here and normalized by their own modules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct McConfig {
    pub displays: BTreeMap<String, DisplayConfig>,
    pub slides: Value,
    pub slide_player: Value,
    pub sound_system: SoundSystemConfig,
    pub sounds: BTreeMap<String, SoundConfig>,
    pub modes: BTreeMap<String, ModeConfig>,
    /// Directory sound files are resolved against. Set by [`McConfig::load`].
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl McConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&text)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        debug!(path = %path.display(), displays = config.displays.len(), modes = config.modes.len(), "loaded config");
        Ok(config)
    }

    /// Full path of a sound file named in a `sounds:` entry.
    pub fn sound_path(&self, file: &str) -> PathBuf {
        let file = Path::new(file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.base_dir.join("sounds").join(file)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    /// Marks the display that receives slides without an explicit target.
    /// When no display sets it, the first display by name is the default.
    pub default: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 32,
            default: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundSystemConfig {
    pub enabled: bool,
    pub tracks: BTreeMap<String, TrackConfig>,
}

impl Default for SoundSystemConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tracks: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub volume: f32,
    pub simultaneous_sounds: u32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            volume: 0.5,
            simultaneous_sounds: 1,
        }
    }
}

/// One `sounds:` entry as written. Defaults are applied when the
/// [`SoundAsset`](crate::SoundAsset) is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    pub file: Option<String>,
    pub track: Option<String>,
    pub volume: Option<f32>,
    pub max_queue_time: Option<Value>,
    pub loops: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    pub priority: i32,
    /// Display that this mode's slides go to when they name no target.
    pub target: Option<String>,
    pub start_events: Vec<String>,
    pub stop_events: Vec<String>,
    pub slides: Value,
    pub slide_player: Value,
}
