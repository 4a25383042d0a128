use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::{debug, error};

use super::{AssetId, AssetState};
use crate::{
    audio::{AudioInterface, SoundContainer, Track},
    config::SoundConfig,
    util::parse_optional_duration,
    McError, Result,
};

pub const DEFAULT_VOLUME: f32 = 0.5;
pub const DEFAULT_LOOPS: i32 = 0;

/// A single sound that can be played by the audio engine.
///
/// The decoded samples are only present while the asset is loaded. Loading
/// happens on the loader thread; the main thread hands the result over with
/// [`SoundAsset::finish_load`].
pub struct SoundAsset {
    id: AssetId,
    name: String,
    file: PathBuf,
    track: Track,
    volume: f32,
    /// `None` lets a queued sound wait forever.
    max_queue_time: Option<Duration>,
    loops: i32,
    state: AssetState,
    container: Option<SoundContainer>,
}

impl SoundAsset {
    /// Builds an unloaded asset. Fails if the configured track does not exist
    /// on `audio` or the file is not a format it can decode.
    pub fn new(
        name: &str,
        file: PathBuf,
        config: &SoundConfig,
        audio: &dyn AudioInterface,
    ) -> Result<Self> {
        let track = config
            .track
            .as_deref()
            .and_then(|track| audio.get_track_by_name(track))
            .ok_or_else(|| {
                error!(sound = name, track = ?config.track, "sound must have a valid track name");
                McError::audio(name, "sound must have a valid track name")
            })?;

        let extension = file
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !audio.supported_extensions().contains(&extension.as_str()) {
            return Err(McError::audio(
                name,
                format!("unsupported sound file `{}`", file.display()),
            ));
        }

        let max_queue_time =
            parse_optional_duration(&format!("sounds:{name}"), config.max_queue_time.as_ref())?;

        Ok(Self {
            id: AssetId::next(),
            name: name.to_string(),
            file,
            track,
            volume: config.volume.unwrap_or(DEFAULT_VOLUME),
            max_queue_time,
            loops: config.loops.unwrap_or(DEFAULT_LOOPS),
            state: AssetState::Unloaded,
            container: None,
        })
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn max_queue_time(&self) -> Option<Duration> {
        self.max_queue_time
    }

    pub fn loops(&self) -> i32 {
        self.loops
    }

    pub fn state(&self) -> AssetState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == AssetState::Loaded
    }

    pub fn container(&self) -> Option<&SoundContainer> {
        self.container.as_ref()
    }

    /// Marks the asset as queued for loading. Returns `false` when it is
    /// already loading or loaded.
    pub fn begin_load(&mut self) -> bool {
        if self.state != AssetState::Unloaded {
            return false;
        }
        self.state = AssetState::Loading;
        true
    }

    /// Takes the loader thread's result. A failed load returns the asset to
    /// `Unloaded` and passes the error on.
    pub fn finish_load(&mut self, result: Result<SoundContainer>) -> Result<()> {
        match result {
            Ok(container) => {
                self.container = Some(container);
                self.state = AssetState::Loaded;
                debug!("Loaded {} (Track {})", self.name, self.track);
                Ok(())
            }
            Err(err) => {
                self.state = AssetState::Unloaded;
                Err(McError::audio(&self.name, err.to_string()))
            }
        }
    }

    /// Releases the samples. Must be called on the main thread.
    pub fn unload(&mut self, audio: &dyn AudioInterface) {
        if let Some(container) = self.container.take() {
            audio.unload_sound(container);
        }
        self.state = AssetState::Unloaded;
    }
}

impl fmt::Display for SoundAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Sound: {}({}), Loaded={}>",
            self.name,
            self.id,
            self.is_loaded()
        )
    }
}

impl fmt::Debug for SoundAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundAsset")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("file", &self.file)
            .field("track", &self.track.name)
            .field("volume", &self.volume)
            .field("max_queue_time", &self.max_queue_time)
            .field("loops", &self.loops)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tests::{sound_system, write_wav};

    fn config(yaml: &str) -> SoundConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn applies_defaults() {
        let asset = SoundAsset::new(
            "boing",
            PathBuf::from("boing.wav"),
            &config("track: sfx"),
            &sound_system(),
        )
        .unwrap();

        assert_eq!(asset.volume(), DEFAULT_VOLUME);
        assert_eq!(asset.loops(), 0);
        assert_eq!(asset.max_queue_time(), None);
        assert_eq!(asset.track().name, "sfx");
        assert_eq!(asset.state(), AssetState::Unloaded);
    }

    #[test]
    fn missing_max_queue_time_leaves_volume_alone() {
        let asset = SoundAsset::new(
            "boing",
            PathBuf::from("boing.wav"),
            &config("{track: sfx, volume: 0.9}"),
            &sound_system(),
        )
        .unwrap();
        assert_eq!(asset.volume(), 0.9);

        let queued = SoundAsset::new(
            "queued",
            PathBuf::from("queued.wav"),
            &config("{track: sfx, max_queue_time: 2s, loops: -1}"),
            &sound_system(),
        )
        .unwrap();
        assert_eq!(queued.max_queue_time(), Some(Duration::from_secs(2)));
        assert_eq!(queued.loops(), -1);
    }

    #[test]
    fn rejects_unknown_or_missing_tracks() {
        for yaml in ["track: music", "volume: 1.0"] {
            let err = SoundAsset::new("boing", PathBuf::from("boing.wav"), &config(yaml), &sound_system())
                .unwrap_err();
            assert!(matches!(&err, McError::Audio { sound, .. } if sound == "boing"));
        }
    }

    #[test]
    fn rejects_unsupported_files() {
        let err = SoundAsset::new(
            "boing",
            PathBuf::from("boing.ogg"),
            &config("track: sfx"),
            &sound_system(),
        )
        .unwrap_err();
        assert!(format!("{err}").contains("boing.ogg"));
    }

    #[test]
    fn load_and_unload_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "boing.wav", 800);
        let audio = sound_system();
        let mut asset = SoundAsset::new("boing", path.clone(), &config("track: sfx"), &audio).unwrap();

        assert!(asset.begin_load());
        assert!(!asset.begin_load());
        asset.finish_load(audio.load_sound(&path)).unwrap();
        assert!(asset.is_loaded());
        assert_eq!(asset.container().unwrap().frames(), 800);
        assert!(format!("{asset}").ends_with("Loaded=true>"));

        asset.unload(&audio);
        assert_eq!(asset.state(), AssetState::Unloaded);
        assert!(asset.container().is_none());
    }

    #[test]
    fn failed_load_returns_to_unloaded() {
        let audio = sound_system();
        let mut asset =
            SoundAsset::new("boing", PathBuf::from("missing.wav"), &config("track: sfx"), &audio).unwrap();
        asset.begin_load();
        assert!(asset.finish_load(audio.load_sound(asset.file())).is_err());
        assert_eq!(asset.state(), AssetState::Unloaded);
    }
}
