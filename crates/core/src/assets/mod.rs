pub mod loader;
pub mod sound;

use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use tracing::{debug, info, trace, warn};

use crate::{audio::AudioInterface, config::McConfig, McError, Result};

pub use loader::{AssetLoader, LoadJob, LoadResult};
pub use sound::SoundAsset;

/// Process-unique asset identifier. Distinct from the asset's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(u64);

impl AssetId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Unloaded,
    Loading,
    Loaded,
}

/// What a round of result handoff did.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<McError>,
}

impl LoadReport {
    fn merge(&mut self, other: LoadReport) {
        self.loaded.extend(other.loaded);
        self.failed.extend(other.failed);
    }
}

/// Every configured sound plus the loader thread that fills them in.
#[derive(Debug)]
pub struct SoundLibrary {
    audio: Arc<dyn AudioInterface>,
    assets: BTreeMap<String, SoundAsset>,
    loader: Option<AssetLoader>,
}

impl SoundLibrary {
    pub fn new(audio: Arc<dyn AudioInterface>) -> Self {
        Self {
            audio,
            assets: BTreeMap::new(),
            loader: None,
        }
    }

    /// Creates an unloaded asset for every `sounds:` entry.
    pub fn from_config(config: &McConfig, audio: Arc<dyn AudioInterface>) -> Result<Self> {
        let mut library = Self::new(audio);
        for (name, sound) in &config.sounds {
            let file = match &sound.file {
                Some(file) => file.clone(),
                None => {
                    let ext = library.audio.supported_extensions().first().copied().unwrap_or("wav");
                    format!("{name}.{ext}")
                }
            };
            let asset = SoundAsset::new(name, config.sound_path(&file), sound, library.audio.as_ref())?;
            library.insert(asset);
        }
        debug!(sounds = library.len(), "registered sound assets");
        Ok(library)
    }

    pub fn insert(&mut self, asset: SoundAsset) {
        self.assets.insert(asset.name().to_string(), asset);
    }

    /// Drops an asset, releasing its samples. A load still in flight for it
    /// is discarded when it arrives.
    pub fn remove(&mut self, name: &str) -> Option<SoundAsset> {
        let mut asset = self.assets.remove(name)?;
        asset.unload(self.audio.as_ref());
        Some(asset)
    }

    pub fn get(&self, name: &str) -> Option<&SoundAsset> {
        self.assets.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SoundAsset> {
        self.assets.values()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Number of assets waiting on the loader thread.
    pub fn pending(&self) -> usize {
        self.assets
            .values()
            .filter(|asset| asset.state() == AssetState::Loading)
            .count()
    }

    /// Queues one sound for loading. Returns `false` if it was already
    /// loading or loaded.
    pub fn load(&mut self, name: &str) -> Result<bool> {
        if self.loader.is_none() {
            self.loader = Some(AssetLoader::spawn(Arc::clone(&self.audio))?);
        }
        let asset = self
            .assets
            .get_mut(name)
            .ok_or_else(|| McError::audio(name, "no such sound"))?;
        if !asset.begin_load() {
            return Ok(false);
        }

        let job = LoadJob {
            id: asset.id(),
            name: asset.name().to_string(),
            file: asset.file().to_path_buf(),
        };
        match &self.loader {
            Some(loader) => loader.submit(job)?,
            None => return Err(McError::LoaderDisconnected),
        }
        Ok(true)
    }

    pub fn load_all(&mut self) -> Result<usize> {
        let names: Vec<String> = self.assets.keys().cloned().collect();
        let mut queued = 0;
        for name in names {
            if self.load(&name)? {
                queued += 1;
            }
        }
        info!(queued, "loading sounds");
        Ok(queued)
    }

    /// Hands every finished load to its asset. Call from the main loop.
    pub fn poll(&mut self) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        loop {
            let next = match &self.loader {
                Some(loader) => loader.try_recv()?,
                None => None,
            };
            match next {
                Some(result) => self.hand_off(result, &mut report),
                None => break,
            }
        }
        Ok(report)
    }

    /// Blocks until nothing is loading or `timeout` runs out.
    pub fn wait_for_all(&mut self, timeout: Duration) -> Result<LoadReport> {
        let deadline = Instant::now() + timeout;
        let mut report = self.poll()?;
        while self.pending() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(pending = self.pending(), "timed out waiting for sounds");
                break;
            }
            let next = match &self.loader {
                Some(loader) => loader.recv_timeout(remaining)?,
                None => break,
            };
            match next {
                Some(result) => self.hand_off(result, &mut report),
                None => continue,
            }
            report.merge(self.poll()?);
        }
        Ok(report)
    }

    pub fn unload(&mut self, name: &str) -> bool {
        match self.assets.get_mut(name) {
            Some(asset) => {
                asset.unload(self.audio.as_ref());
                true
            }
            None => false,
        }
    }

    fn hand_off(&mut self, result: LoadResult, report: &mut LoadReport) {
        let asset = self
            .assets
            .values_mut()
            .find(|asset| asset.id() == result.id && asset.state() == AssetState::Loading);

        match asset {
            Some(asset) => match asset.finish_load(result.result) {
                Ok(()) => report.loaded.push(asset.name().to_string()),
                Err(err) => {
                    warn!(error = %err, "sound load failed");
                    report.failed.push(err);
                }
            },
            None => {
                trace!(sound = %result.name, id = %result.id, "discarding load for dropped asset");
                if let Ok(container) = result.result {
                    self.audio.unload_sound(container);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tests::{sound_system, write_wav};

    fn library(dir: &std::path::Path) -> SoundLibrary {
        let sounds = dir.join("sounds");
        std::fs::create_dir_all(&sounds).unwrap();
        write_wav(&sounds, "boing.wav", 400);
        write_wav(&sounds, "ding.wav", 200);

        let mut config = McConfig::from_yaml_str(
            r#"
sounds:
  boing: {track: sfx}
  ding: {file: ding.wav, track: sfx, volume: 0.8}
  broken: {file: gone.wav, track: sfx}
"#,
        )
        .unwrap();
        config.base_dir = dir.to_path_buf();
        SoundLibrary::from_config(&config, Arc::new(sound_system())).unwrap()
    }

    #[test]
    fn ids_are_unique() {
        let a = AssetId::next();
        let b = AssetId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn loads_all_sounds_through_the_loader() {
        let dir = tempfile::tempdir().unwrap();
        let mut sounds = library(dir.path());
        assert_eq!(sounds.len(), 3);
        assert_eq!(sounds.get("ding").unwrap().volume(), 0.8);

        assert_eq!(sounds.load_all().unwrap(), 3);
        assert_eq!(sounds.load_all().unwrap(), 0);
        let report = sounds.wait_for_all(Duration::from_secs(5)).unwrap();

        assert_eq!(report.loaded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(sounds.get("boing").unwrap().is_loaded());
        assert_eq!(sounds.get("broken").unwrap().state(), AssetState::Unloaded);
        assert_eq!(sounds.pending(), 0);

        assert!(sounds.unload("boing"));
        assert!(!sounds.get("boing").unwrap().is_loaded());
    }

    /// Counts the containers handed back to the audio engine.
    #[derive(Debug)]
    struct CountingAudio {
        inner: crate::audio::SoundSystem,
        released: AtomicU64,
    }

    impl AudioInterface for CountingAudio {
        fn get_track_by_name(&self, name: &str) -> Option<crate::audio::Track> {
            self.inner.get_track_by_name(name)
        }

        fn load_sound(&self, file: &std::path::Path) -> Result<crate::audio::SoundContainer> {
            self.inner.load_sound(file)
        }

        fn unload_sound(&self, container: crate::audio::SoundContainer) {
            self.released.fetch_add(1, Ordering::SeqCst);
            self.inner.unload_sound(container);
        }

        fn supported_extensions(&self) -> &[&'static str] {
            self.inner.supported_extensions()
        }
    }

    #[test]
    fn results_for_dropped_assets_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "boing.wav", 400);
        let audio = Arc::new(CountingAudio {
            inner: sound_system(),
            released: AtomicU64::new(0),
        });
        let mut sounds = SoundLibrary::new(audio.clone());
        let config = crate::config::SoundConfig {
            track: Some("sfx".into()),
            ..Default::default()
        };
        sounds.insert(SoundAsset::new("boing", path, &config, audio.as_ref()).unwrap());

        assert!(sounds.load("boing").unwrap());
        assert!(sounds.remove("boing").is_some());
        assert_eq!(audio.released.load(Ordering::SeqCst), 0);

        let deadline = Instant::now() + Duration::from_secs(5);
        while audio.released.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            let report = sounds.poll().unwrap();
            assert!(report.loaded.is_empty());
            assert!(report.failed.is_empty());
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(audio.released.load(Ordering::SeqCst), 1);
        assert!(sounds.get("boing").is_none());
        assert_eq!(sounds.pending(), 0);
    }

    #[test]
    fn invalid_track_is_reported_at_config_time() {
        let config = McConfig::from_yaml_str("sounds:\n  boing: {track: music}\n").unwrap();
        let err = SoundLibrary::from_config(&config, Arc::new(sound_system())).unwrap_err();
        assert!(format!("{err}").contains("boing"));
    }
}
