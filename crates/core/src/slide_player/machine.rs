//! Machine-side half of the slide player.
//!
//! Runs in the machine-logic process. It never renders anything: it validates
//! `slide_player:` sections at boot and turns posted events into BCP triggers
//! for the media controller.

use std::collections::{BTreeMap, BTreeSet};

use serde_yaml::Value;
use tracing::debug;

use super::{resolve::resolve_slide, SlidePlayerConfig};
use crate::{bcp::BcpTrigger, config::McConfig, modes::Mode, widgets, Result};

#[derive(Debug, Clone, Default)]
pub struct MachineSlidePlayer {
    machine: SlidePlayerConfig,
    modes: BTreeMap<String, SlidePlayerConfig>,
    registered_triggers: BTreeSet<String>,
}

impl MachineSlidePlayer {
    pub fn from_config(config: &McConfig) -> Result<Self> {
        let mut player = Self {
            machine: SlidePlayerConfig::from_value("slide_player", &config.slide_player)?,
            ..Default::default()
        };
        let machine_triggers = player.machine.trigger_events();
        player.registered_triggers.extend(machine_triggers);

        for (name, mode) in &config.modes {
            let section =
                SlidePlayerConfig::from_value(&format!("modes:{name}:slide_player"), &mode.slide_player)?;
            player.registered_triggers.extend(section.trigger_events());
            if !section.is_empty() {
                player.modes.insert(name.clone(), section);
            }
        }

        debug!(
            events = player.machine.len(),
            modes = player.modes.len(),
            triggers = player.registered_triggers.len(),
            "validated slide_player sections"
        );
        Ok(player)
    }

    /// Events the logic process must forward so widget animations can react.
    pub fn registered_trigger_events(&self) -> &BTreeSet<String> {
        &self.registered_triggers
    }

    /// Every event with a machine-wide or mode entry.
    pub fn events(&self) -> BTreeSet<&str> {
        self.machine
            .events()
            .map(|(event, _)| event)
            .chain(self.modes.values().flat_map(|config| config.events().map(|(event, _)| event)))
            .collect()
    }

    /// Triggers to send when `event` is posted. Mode entries only fire for
    /// running modes, with the mode's priority as the base priority.
    pub fn triggers_for<'a>(
        &self,
        event: &str,
        running_modes: impl IntoIterator<Item = &'a Mode>,
    ) -> Vec<BcpTrigger> {
        let mut triggers = Vec::new();

        if let Some(entries) = self.machine.get(event) {
            triggers.extend(BcpTrigger::from_entries(entries, 0, None));
        }

        for mode in running_modes {
            if let Some(entries) = self.modes.get(&mode.name).and_then(|config| config.get(event)) {
                triggers.extend(BcpTrigger::from_entries(
                    entries,
                    mode.priority,
                    Some(mode.name.as_str()),
                ));
            }
        }

        triggers
    }

    /// Validates one `slides:` step of a show and compiles it into triggers.
    pub fn show_triggers(
        &mut self,
        slide: &str,
        settings: &Value,
        priority: i32,
        mode: Option<&str>,
    ) -> Result<Vec<BcpTrigger>> {
        let entry = resolve_slide("shows:slides", slide, settings)?;
        if let Some(slide_widgets) = &entry.settings.widgets {
            widgets::collect_trigger_events(slide_widgets, &mut self.registered_triggers);
        }
        Ok(BcpTrigger::from_entries(&[entry], priority, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcp::{SLIDES_PLAY, SLIDES_REMOVE};

    fn config() -> McConfig {
        McConfig::from_yaml_str(
            r#"
slide_player:
  show_slide_1: machine_slide_1
  clear_slide_1:
    machine_slide_1: {action: remove}
  animated:
    anon:
      type: text
      text: HI
      animations:
        flipper_active: {property: y, value: 10}
modes:
  mode1:
    priority: 500
    slide_player:
      show_mode1_slide: mode1_slide
      show_slide_1: {mode1_slide_2: {priority: -350}}
"#,
        )
        .unwrap()
    }

    #[test]
    fn compiles_machine_and_mode_triggers() {
        let player = MachineSlidePlayer::from_config(&config()).unwrap();
        let mode = Mode::new("mode1", 500);

        let idle = player.triggers_for("show_slide_1", []);
        assert_eq!(idle.len(), 1);
        assert_eq!(idle[0].name, SLIDES_PLAY);
        assert_eq!(idle[0].priority, 0);

        let running = player.triggers_for("show_slide_1", [&mode]);
        assert_eq!(running.len(), 2);
        assert_eq!(running[1].mode.as_deref(), Some("mode1"));
        assert_eq!(running[1].priority, 500);
        assert_eq!(running[1].slides[0].settings.priority_with_base(500), 150);

        let removal = player.triggers_for("clear_slide_1", []);
        assert_eq!(removal[0].name, SLIDES_REMOVE);

        assert!(player.triggers_for("unrelated", [&mode]).is_empty());
    }

    #[test]
    fn registers_animation_trigger_events() {
        let player = MachineSlidePlayer::from_config(&config()).unwrap();
        assert!(player.registered_trigger_events().contains("flipper_active"));
        assert!(player.events().contains("show_mode1_slide"));
    }

    #[test]
    fn show_steps_are_validated() {
        let mut player = MachineSlidePlayer::default();
        let settings: Value =
            serde_yaml::from_str("widgets: [{type: text, text: TEST FROM SHOW}]").unwrap();
        let triggers = player.show_triggers("slide1", &settings, 0, None).unwrap();
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].slides[0].slide, "slide1");

        let broken: Value = serde_yaml::from_str("transition: {direction: left}").unwrap();
        assert!(player.show_triggers("slide1", &broken, 0, None).is_err());
    }
}
