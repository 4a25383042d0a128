//! The slide player.
//!
//! [`McSlidePlayer`] runs inside the media controller: it takes normalized
//! [`SlideEntry`] values (from its own config or from a BCP trigger), resolves
//! the target and asks it to show or remove slides. The machine-side half in
//! [`machine`] validates the same grammar and compiles it into BCP triggers.

pub mod machine;
pub mod resolve;
pub mod settings;

use std::{collections::BTreeMap, time::Duration};

use tracing::{debug, warn};

use crate::{
    config::McConfig,
    display::{ShowOptions, Targets},
    modes::{Mode, Modes},
    slides::{Slide, SlideLibrary},
    timeline::Scheduler,
    McError, Result,
};

pub use machine::MachineSlidePlayer;
pub use resolve::{resolve_event, resolve_slide, SlidePlayerConfig};
pub use settings::{
    SlideAction, SlideBody, SlideEntry, SlideOverrides, SlideSettings, PLAYER_KEYS,
};

/// Pending automatic removal of one slide instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiry {
    pub target: String,
    pub slide: String,
    pub instance: u64,
}

/// Everything a play call touches besides the player's own config.
#[derive(Debug)]
pub struct PlayContext<'a> {
    pub targets: &'a mut Targets,
    pub library: &'a SlideLibrary,
    pub expiries: &'a mut Scheduler<Expiry>,
    pub now: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct McSlidePlayer {
    machine: SlidePlayerConfig,
    modes: BTreeMap<String, SlidePlayerConfig>,
}

impl McSlidePlayer {
    pub fn new(machine: SlidePlayerConfig) -> Self {
        Self {
            machine,
            modes: BTreeMap::new(),
        }
    }

    /// Normalizes the machine-wide section and every mode's section.
    pub fn from_config(config: &McConfig) -> Result<Self> {
        let mut player = Self::new(SlidePlayerConfig::from_value(
            "slide_player",
            &config.slide_player,
        )?);
        for (name, mode) in &config.modes {
            let section = SlidePlayerConfig::from_value(
                &format!("modes:{name}:slide_player"),
                &mode.slide_player,
            )?;
            player.add_mode(name, section);
        }
        Ok(player)
    }

    pub fn add_mode(&mut self, mode: &str, config: SlidePlayerConfig) {
        if !config.is_empty() {
            self.modes.insert(mode.to_string(), config);
        }
    }

    pub fn machine_entries(&self, event: &str) -> Option<&[SlideEntry]> {
        self.machine.get(event)
    }

    pub fn mode_entries(&self, mode: &str, event: &str) -> Option<&[SlideEntry]> {
        self.modes.get(mode).and_then(|config| config.get(event))
    }

    /// Checks that every entry can find its target and, for named slides, its
    /// definition. Run once at boot so a bad reference never waits for its
    /// event to be posted.
    pub fn validate(
        &self,
        targets: &Targets,
        library: &SlideLibrary,
        modes: &Modes,
    ) -> Result<()> {
        let sections = std::iter::once((None, &self.machine)).chain(
            self.modes
                .iter()
                .map(|(name, config)| (Some(name.as_str()), config)),
        );

        for (mode_name, config) in sections {
            let mode_target = match mode_name {
                Some(name) => modes
                    .get(name)
                    .ok_or_else(|| McError::UnknownMode(name.to_string()))?
                    .target
                    .as_deref(),
                None => None,
            };

            for (event, entries) in config.events() {
                for entry in entries {
                    let section = match mode_name {
                        Some(mode) => format!("modes:{mode}:slide_player:{event}"),
                        None => format!("slide_player:{event}"),
                    };
                    targets
                        .resolve(entry.settings.target.as_deref(), mode_target)
                        .map_err(|err| McError::config(&section, err.to_string()))?;

                    let named = entry.settings.action == SlideAction::Play
                        && entry.settings.widgets.is_none();
                    if named && !library.contains(&entry.slide) {
                        return Err(McError::config(
                            section,
                            format!("unknown slide `{}`", entry.slide),
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Plays validated entries. `priority` is the caller's base priority and
    /// `mode` the caller that will own the slides.
    pub fn play(
        &self,
        ctx: &mut PlayContext<'_>,
        entries: &[SlideEntry],
        mode: Option<&Mode>,
        priority: i32,
    ) -> Result<()> {
        for entry in entries {
            self.play_entry(ctx, entry, mode, priority)?;
        }
        Ok(())
    }

    fn play_entry(
        &self,
        ctx: &mut PlayContext<'_>,
        entry: &SlideEntry,
        mode: Option<&Mode>,
        base_priority: i32,
    ) -> Result<()> {
        let settings = &entry.settings;
        let priority = settings.priority_with_base(base_priority);
        let target_name = ctx.targets.resolve(
            settings.target.as_deref(),
            mode.and_then(|mode| mode.target.as_deref()),
        )?;
        let owner = mode.map(|mode| mode.name.clone());

        let target = ctx
            .targets
            .get_mut(&target_name)
            .ok_or_else(|| McError::UnknownTarget(target_name.clone()))?;

        match settings.action {
            SlideAction::Play => {
                let (outcome, expire) = match &settings.widgets {
                    Some(widgets) => {
                        let options = ShowOptions {
                            show: settings.show,
                            force: settings.force,
                            transition: settings.transition.clone(),
                        };
                        let outcome = target.add_and_show_slide(
                            owner,
                            &entry.slide,
                            priority,
                            widgets.clone(),
                            settings.transition_out.clone(),
                            options,
                        );
                        (outcome, settings.expire)
                    }
                    None => {
                        let definition = ctx
                            .library
                            .get(&entry.slide)
                            .ok_or_else(|| McError::UnknownSlide(entry.slide.clone()))?;
                        // The player's transition beats the slide's own.
                        let options = ShowOptions {
                            show: settings.show,
                            force: settings.force,
                            transition: settings
                                .transition
                                .clone()
                                .or_else(|| definition.transition.clone()),
                        };
                        let slide = Slide::new(&entry.slide, owner, priority)
                            .with_widgets(definition.widgets.clone())
                            .with_transition_out(
                                settings
                                    .transition_out
                                    .clone()
                                    .or_else(|| definition.transition_out.clone()),
                            );
                        (target.show_slide(slide, options), settings.expire.or(definition.expire))
                    }
                };

                debug!(
                    slide = %entry.slide,
                    target = %target_name,
                    priority,
                    ?outcome,
                    "played slide"
                );

                // Every post re-arms the timer, even one that left the slide
                // unchanged.
                if let (Some(expire), Some(slide)) = (expire, target.slide(&entry.slide)) {
                    let expiry = Expiry {
                        target: target_name,
                        slide: slide.name.clone(),
                        instance: slide.instance,
                    };
                    ctx.expiries.retain(|pending| {
                        pending.payload.target != expiry.target
                            || pending.payload.slide != expiry.slide
                    });
                    ctx.expiries.schedule(ctx.now + expire, expiry);
                }
            }
            SlideAction::Remove => {
                let transition = settings
                    .transition
                    .clone()
                    .or_else(|| settings.transition_out.clone());
                if target.remove_slide(&entry.slide, transition).is_none() {
                    debug!(slide = %entry.slide, target = %target_name, "slide to remove is not on target");
                }
            }
        }

        Ok(())
    }

    /// Removes the expiring slide if the very same instance is still on its
    /// target. Returns whether anything was removed.
    pub fn expire(&self, targets: &mut Targets, expiry: &Expiry) -> bool {
        let Some(target) = targets.get_mut(&expiry.target) else {
            warn!(target = %expiry.target, "expiry for unknown target");
            return false;
        };

        let same_instance = target
            .slide(&expiry.slide)
            .is_some_and(|slide| slide.instance == expiry.instance);
        if !same_instance {
            return false;
        }

        debug!(slide = %expiry.slide, target = %expiry.target, "slide expired");
        target.remove_slide(&expiry.slide, None).is_some()
    }

    /// Removes every slide `caller` owns, on every target.
    pub fn clear(&self, targets: &mut Targets, caller: &str) -> usize {
        targets
            .iter_mut()
            .map(|target| target.remove_mode_slides(caller))
            .sum()
    }
}
