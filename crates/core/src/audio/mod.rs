use std::{collections::BTreeMap, fmt, path::Path, time::Duration};

use hound::{SampleFormat, WavReader};
use tracing::debug;

use crate::{config::SoundSystemConfig, Result};

/// A mixer track sounds are played on.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    pub volume: f32,
    pub simultaneous_sounds: u32,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Decoded sound samples held in memory. Owned by exactly one asset at a
/// time, so it is deliberately not `Clone`.
pub struct SoundContainer {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples normalised to [-1, 1].
    pub samples: Vec<f32>,
}

impl SoundContainer {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

impl fmt::Debug for SoundContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundContainer")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("samples", &self.samples.len())
            .finish()
    }
}

/// The audio engine as seen by sound assets. Decoding and mixing live behind
/// this trait; `load_sound` is called from the asset loader thread.
pub trait AudioInterface: Send + Sync + fmt::Debug {
    fn get_track_by_name(&self, name: &str) -> Option<Track>;

    /// Decodes a sound file into memory. May block.
    fn load_sound(&self, file: &Path) -> Result<SoundContainer>;

    /// Releases a container. Called on the main thread; must not block.
    fn unload_sound(&self, container: SoundContainer);

    /// Lower-case file extensions `load_sound` understands.
    fn supported_extensions(&self) -> &[&'static str];
}

/// WAV-backed audio interface with the tracks from `sound_system:`.
#[derive(Debug, Clone, Default)]
pub struct SoundSystem {
    tracks: BTreeMap<String, Track>,
}

impl SoundSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SoundSystemConfig) -> Self {
        let mut system = Self::new();
        for (name, track) in &config.tracks {
            system.add_track(Track {
                name: name.clone(),
                volume: track.volume,
                simultaneous_sounds: track.simultaneous_sounds,
            });
        }
        system
    }

    pub fn add_track(&mut self, track: Track) {
        self.tracks.insert(track.name.clone(), track);
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }
}

impl AudioInterface for SoundSystem {
    fn get_track_by_name(&self, name: &str) -> Option<Track> {
        self.tracks.get(name).cloned()
    }

    fn load_sound(&self, file: &Path) -> Result<SoundContainer> {
        let mut reader = WavReader::open(file)?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / scale))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        debug!(
            file = %file.display(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            samples = samples.len(),
            "decoded sound"
        );

        Ok(SoundContainer {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    fn unload_sound(&self, container: SoundContainer) {
        debug!(samples = container.samples.len(), "released sound");
        drop(container);
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &["wav"]
    }
}
