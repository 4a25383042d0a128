//! The media controller: owns the display targets, the slide library, the
//! slide player, the modes and the sound assets, and drives them from posted
//! events, BCP triggers and the passage of time.

use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    assets::SoundLibrary,
    audio::{AudioInterface, SoundSystem},
    bcp::BcpTrigger,
    config::McConfig,
    display::{Display, SlideTarget, Targets},
    modes::{Mode, Modes},
    slide_player::{Expiry, MachineSlidePlayer, McSlidePlayer, PlayContext, SlideOverrides},
    slides::SlideLibrary,
    timeline::{Clock, Scheduler},
    McError, Result,
};

#[derive(Debug)]
pub struct MediaController {
    targets: Targets,
    library: SlideLibrary,
    slide_player: McSlidePlayer,
    machine: MachineSlidePlayer,
    modes: Modes,
    clock: Clock,
    expiries: Scheduler<Expiry>,
    sounds: Option<SoundLibrary>,
}

impl MediaController {
    /// Builds a controller with the bundled WAV sound system, or none when
    /// `sound_system: {enabled: false}`.
    pub fn from_config(config: &McConfig) -> Result<Self> {
        let audio: Option<Arc<dyn AudioInterface>> = config
            .sound_system
            .enabled
            .then(|| Arc::new(SoundSystem::from_config(&config.sound_system)) as Arc<dyn AudioInterface>);
        Self::build(config, audio)
    }

    pub fn with_audio(config: &McConfig, audio: Arc<dyn AudioInterface>) -> Result<Self> {
        Self::build(config, Some(audio))
    }

    fn build(config: &McConfig, audio: Option<Arc<dyn AudioInterface>>) -> Result<Self> {
        let mut targets = Targets::new();
        for (name, display) in &config.displays {
            targets.add(
                Box::new(Display::new(name.clone(), display.width, display.height)),
                display.default,
            );
        }

        let mut library = SlideLibrary::new();
        library.load_section(&config.slides)?;
        for mode in config.modes.values() {
            library.load_section(&mode.slides)?;
        }

        let mut modes = Modes::new();
        for (name, mode) in &config.modes {
            modes.insert(Mode::from_config(name, mode));
        }

        let slide_player = McSlidePlayer::from_config(config)?;
        slide_player.validate(&targets, &library, &modes)?;
        let machine = MachineSlidePlayer::from_config(config)?;

        let sounds = audio
            .map(|audio| SoundLibrary::from_config(config, audio))
            .transpose()?;

        info!(
            displays = targets.len(),
            slides = library.len(),
            modes = config.modes.len(),
            sounds = sounds.as_ref().map_or(0, SoundLibrary::len),
            "media controller ready"
        );

        Ok(Self {
            targets,
            library,
            slide_player,
            machine,
            modes,
            clock: Clock::new(),
            expiries: Scheduler::new(),
            sounds,
        })
    }

    pub fn target(&self, name: &str) -> Option<&dyn SlideTarget> {
        self.targets.get(name)
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    pub fn library(&self) -> &SlideLibrary {
        &self.library
    }

    pub fn machine(&self) -> &MachineSlidePlayer {
        &self.machine
    }

    pub fn sounds(&self) -> Option<&SoundLibrary> {
        self.sounds.as_ref()
    }

    pub fn sounds_mut(&mut self) -> Option<&mut SoundLibrary> {
        self.sounds.as_mut()
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Runs the mode start/stop events bound to `event`.
    fn run_mode_events(&mut self, event: &str) -> Result<()> {
        let (starts, stops) = self.modes.triggered_by(event);
        for mode in stops {
            self.stop_mode(&mode)?;
        }
        for mode in starts {
            self.start_mode(&mode)?;
        }
        Ok(())
    }

    /// Posts an event to the machine-wide and running modes' slide players.
    pub fn post_event(&mut self, event: &str) -> Result<()> {
        self.post_event_with(event, &SlideOverrides::default())
    }

    /// Posts an event whose settings replace the configured ones on every
    /// slide it plays.
    pub fn post_event_with(&mut self, event: &str, overrides: &SlideOverrides) -> Result<()> {
        self.run_mode_events(event)?;

        let Self {
            targets,
            library,
            slide_player,
            modes,
            clock,
            expiries,
            ..
        } = self;
        let mut ctx = PlayContext {
            targets,
            library: &*library,
            expiries,
            now: clock.now(),
        };

        if let Some(entries) = slide_player.machine_entries(event) {
            debug!(event, entries = entries.len(), "posting event");
            slide_player.play(&mut ctx, &overrides.apply_all(entries), None, 0)?;
        }
        for mode in modes.running() {
            if let Some(entries) = slide_player.mode_entries(&mode.name, event) {
                debug!(event, mode = %mode.name, entries = entries.len(), "posting mode event");
                let entries = overrides.apply_all(entries);
                slide_player.play(&mut ctx, &entries, Some(mode), mode.priority)?;
            }
        }
        Ok(())
    }

    /// Posts an event the way the machine-logic process would: compiled into
    /// BCP triggers, encoded, and received back. Returns how many triggers
    /// were sent.
    pub fn post_event_over_bcp(&mut self, event: &str) -> Result<usize> {
        self.post_event_over_bcp_with(event, &SlideOverrides::default())
    }

    pub fn post_event_over_bcp_with(
        &mut self,
        event: &str,
        overrides: &SlideOverrides,
    ) -> Result<usize> {
        self.run_mode_events(event)?;

        let payloads = self
            .machine
            .triggers_for(event, self.modes.running())
            .into_iter()
            .map(|mut trigger| {
                trigger.slides = overrides.apply_all(&trigger.slides);
                trigger.encode()
            })
            .collect::<Result<Vec<_>>>()?;
        for payload in &payloads {
            self.receive_bcp(payload)?;
        }
        Ok(payloads.len())
    }

    /// Decodes and plays one BCP `trigger` payload.
    pub fn receive_bcp(&mut self, payload: &str) -> Result<()> {
        let trigger = BcpTrigger::decode(payload)?;
        self.handle_trigger(trigger)
    }

    pub fn handle_trigger(&mut self, trigger: BcpTrigger) -> Result<()> {
        let mode_name = trigger.mode.clone();
        let priority = trigger.priority;
        let entries = trigger.into_entries();

        let mode = match mode_name.as_deref() {
            Some(name) => Some(
                self.modes
                    .get(name)
                    .ok_or_else(|| McError::UnknownMode(name.to_string()))?,
            ),
            None => None,
        };
        let mut ctx = PlayContext {
            targets: &mut self.targets,
            library: &self.library,
            expiries: &mut self.expiries,
            now: self.clock.now(),
        };
        self.slide_player.play(&mut ctx, &entries, mode, priority)
    }

    pub fn start_mode(&mut self, name: &str) -> Result<bool> {
        self.modes.start(name)
    }

    /// Stops a mode and removes every slide it owns.
    pub fn stop_mode(&mut self, name: &str) -> Result<bool> {
        if !self.modes.stop(name)? {
            return Ok(false);
        }
        let removed = self.slide_player.clear(&mut self.targets, name);
        debug!(mode = name, removed, "cleared mode slides");
        Ok(true)
    }

    /// Advances the clock, runs transitions and fires due expiries. Returns
    /// the number of slides that expired.
    pub fn advance_time(&mut self, delta: Duration) -> usize {
        self.clock.advance(delta);
        for target in self.targets.iter_mut() {
            target.tick(delta);
        }

        let mut expired = 0;
        for event in self.expiries.tick(&self.clock) {
            if self.slide_player.expire(&mut self.targets, &event.payload) {
                expired += 1;
            }
        }

        if let Some(sounds) = self.sounds.as_mut() {
            match sounds.poll() {
                Ok(report) => {
                    for err in report.failed {
                        warn!(error = %err, "sound failed to load");
                    }
                }
                Err(err) => warn!(error = %err, "sound loader unavailable"),
            }
        }

        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transitions::TransitionType;

    const CONFIG: &str = r#"
displays:
  display1: {width: 128, height: 32, default: true}
  display2: {width: 128, height: 32}

slides:
  machine_slide_1: [{type: text, text: ONE}]
  machine_slide_4: [{type: text, text: FOUR}]
  machine_slide_6: [{type: text, text: SIX}]
  machine_slide_7:
    widgets: [{type: text, text: SEVEN}]
    expire: 1s
  swap_slide:
    widgets: [{type: text, text: SWAP}]
    transition_out: wipe

slide_player:
  show_slide_1: machine_slide_1
  show_slide_4: machine_slide_4
  show_slide_6: machine_slide_6
  show_slide_7: machine_slide_7
  show_slide_4_p200:
    machine_slide_4: {priority: 200}
  show_swap_slide: swap_slide
  swap:
    swap_slide: {action: remove}
    machine_slide_4: {}

modes:
  mode1:
    priority: 500
    start_events: [start_mode1]
    stop_events: [stop_mode1]
    slides:
      mode1_slide: [{type: text, text: MODE 1}]
      mode1_slide_2: [{type: text, text: MODE 1 TWO}]
    slide_player:
      show_mode1_slide: mode1_slide
      show_mode1_slide_2:
        mode1_slide_2: {priority: -350}
      faded_mode_slide:
        mode1_slide: {transition: fade}
  mode2:
    priority: 100
    target: display2
    slide_player:
      show_slide_1: machine_slide_4

sound_system:
  enabled: false
"#;

    fn controller() -> MediaController {
        MediaController::from_config(&McConfig::from_yaml_str(CONFIG).unwrap()).unwrap()
    }

    fn current(mc: &MediaController, display: &str) -> Option<(String, i32)> {
        mc.target(display)
            .and_then(|target| target.current_slide())
            .map(|slide| (slide.name.clone(), slide.priority))
    }

    #[test]
    fn mode_slides_follow_the_mode_lifecycle() {
        let mut mc = controller();
        mc.post_event("show_slide_1").unwrap();
        assert_eq!(current(&mc, "display1"), Some(("machine_slide_1".into(), 0)));

        // Mode entries do nothing until the mode runs.
        mc.post_event("show_mode1_slide").unwrap();
        assert_eq!(current(&mc, "display1").unwrap().0, "machine_slide_1");

        mc.post_event("start_mode1").unwrap();
        mc.post_event("show_mode1_slide").unwrap();
        assert_eq!(current(&mc, "display1"), Some(("mode1_slide".into(), 500)));

        mc.post_event("show_mode1_slide_2").unwrap();
        assert_eq!(current(&mc, "display1").unwrap().0, "mode1_slide");
        let queued = mc.target("display1").unwrap().slide("mode1_slide_2").unwrap();
        assert_eq!(queued.priority, 150);

        mc.post_event("stop_mode1").unwrap();
        assert_eq!(current(&mc, "display1"), Some(("machine_slide_1".into(), 0)));
        assert!(mc.target("display1").unwrap().screens("mode1").is_empty());
    }

    #[test]
    fn mode_target_routes_mode_entries() {
        let mut mc = controller();
        mc.start_mode("mode2").unwrap();
        mc.post_event("show_slide_1").unwrap();
        assert_eq!(current(&mc, "display1").unwrap().0, "machine_slide_1");
        assert_eq!(current(&mc, "display2"), Some(("machine_slide_4".into(), 100)));
    }

    #[test]
    fn expire_falls_back_to_the_previous_slide() {
        let mut mc = controller();
        mc.post_event("show_slide_6").unwrap();
        mc.post_event("show_slide_7").unwrap();
        assert_eq!(mc.advance_time(Duration::from_millis(500)), 0);
        assert_eq!(current(&mc, "display1").unwrap().0, "machine_slide_7");
        assert_eq!(mc.advance_time(Duration::from_millis(500)), 1);
        assert_eq!(current(&mc, "display1").unwrap().0, "machine_slide_6");
    }

    #[test]
    fn bcp_path_matches_local_path() {
        let mut local = controller();
        let mut remote = controller();
        let steps = [
            "show_slide_1",
            "start_mode1",
            "show_mode1_slide",
            "show_slide_4_p200",
            "faded_mode_slide",
            "stop_mode1",
        ];
        for step in steps {
            local.post_event(step).unwrap();
            remote.post_event_over_bcp(step).unwrap();
            assert_eq!(current(&local, "display1"), current(&remote, "display1"), "after {step}");
        }
    }

    #[test]
    fn bcp_keeps_remove_before_play_order() {
        let mut local = controller();
        let mut remote = controller();
        for step in ["show_slide_1", "show_swap_slide", "swap"] {
            local.post_event(step).unwrap();
            remote.post_event_over_bcp(step).unwrap();
        }

        let kind = |mc: &MediaController| {
            mc.target("display1")
                .unwrap()
                .transition()
                .map(|transition| transition.spec.kind)
        };
        assert_eq!(current(&local, "display1").unwrap().0, "machine_slide_4");
        assert_eq!(current(&remote, "display1"), current(&local, "display1"));
        assert_eq!(kind(&local), None);
        assert_eq!(kind(&remote), kind(&local));
    }

    #[test]
    fn posted_settings_override_config_on_both_paths() {
        let overrides = SlideOverrides {
            priority: Some(300),
            ..Default::default()
        };
        let mut local = controller();
        let mut remote = controller();
        local.post_event_with("show_slide_4_p200", &overrides).unwrap();
        remote.post_event_over_bcp_with("show_slide_4_p200", &overrides).unwrap();

        assert_eq!(current(&local, "display1"), Some(("machine_slide_4".into(), 300)));
        assert_eq!(current(&remote, "display1"), current(&local, "display1"));
    }

    #[test]
    fn player_transition_is_carried_over_bcp() {
        let mut mc = controller();
        mc.post_event("show_slide_1").unwrap();
        mc.start_mode("mode1").unwrap();
        assert_eq!(mc.post_event_over_bcp("faded_mode_slide").unwrap(), 1);
        let transition = mc.target("display1").unwrap().transition().unwrap();
        assert_eq!(transition.spec.kind, TransitionType::Fade);
    }

    #[test]
    fn triggers_for_unknown_modes_are_rejected() {
        let mut mc = controller();
        let payload = r#"{"name":"slides_play","slides":[],"priority":0,"mode":"nope"}"#;
        assert!(matches!(mc.receive_bcp(payload), Err(McError::UnknownMode(_))));
    }

    #[test]
    fn boot_validation_rejects_bad_references() {
        let config = McConfig::from_yaml_str(
            "displays: {dmd: {}}\nslide_player:\n  ev: missing_slide\n",
        )
        .unwrap();
        let err = MediaController::from_config(&config).unwrap_err();
        assert!(format!("{err}").contains("missing_slide"));
    }
}
