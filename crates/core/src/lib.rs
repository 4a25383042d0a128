//! Core library for the pinball media controller.
//!
//! The media controller decides which slide each display shows in response
//! to game events, and keeps the machine's sound assets loaded. Each module
//! owns one subsystem: config parsing, the slide player and its grammar,
//! display targets, modes, BCP payloads, and asset loading.

pub mod assets;
pub mod audio;
pub mod bcp;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod modes;
pub mod slide_player;
pub mod slides;
pub mod timeline;
pub mod transitions;
pub mod util;
pub mod widgets;

pub use assets::{AssetId, AssetLoader, AssetState, LoadReport, SoundAsset, SoundLibrary};
pub use audio::{AudioInterface, SoundContainer, SoundSystem, Track};
pub use bcp::BcpTrigger;
pub use config::{DisplayConfig, McConfig, ModeConfig, SoundConfig, SoundSystemConfig, TrackConfig};
pub use controller::MediaController;
pub use display::{Display, ShowOptions, ShowOutcome, SlideTarget, Targets};
pub use error::{McError, Result};
pub use modes::{Mode, Modes};
pub use slide_player::{
    MachineSlidePlayer, McSlidePlayer, SlideAction, SlideEntry, SlideOverrides, SlidePlayerConfig,
    SlideSettings,
};
pub use slides::{Slide, SlideDefinition, SlideLibrary};
pub use timeline::{Clock, ScheduledEvent, Scheduler};
pub use transitions::{TransitionSpec, TransitionType};
pub use widgets::WidgetSpec;
