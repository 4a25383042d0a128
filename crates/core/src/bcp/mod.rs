//! BCP trigger payloads exchanged with the machine-logic process.
//!
//! Only the payload is modelled here; framing and the socket live with the
//! BCP transport. Payloads travel as JSON.

use serde::{Deserialize, Serialize};

use crate::{
    slide_player::{SlideAction, SlideEntry},
    McError, Result,
};

pub const SLIDES_PLAY: &str = "slides_play";
pub const SLIDES_REMOVE: &str = "slides_remove";

/// A `trigger` command carrying validated slide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BcpTrigger {
    pub name: String,
    pub slides: Vec<SlideEntry>,
    /// Base priority of the caller (the mode priority, or 0).
    #[serde(default)]
    pub priority: i32,
    /// Mode that posted the trigger; `None` for machine-level entries.
    #[serde(default)]
    pub mode: Option<String>,
}

impl BcpTrigger {
    /// Groups entries into `slides_play` and `slides_remove` triggers, one
    /// per run of entries sharing an action, so config order is preserved.
    pub fn from_entries(
        entries: &[SlideEntry],
        priority: i32,
        mode: Option<&str>,
    ) -> Vec<BcpTrigger> {
        let mut triggers: Vec<BcpTrigger> = Vec::new();
        for entry in entries {
            let name = match entry.settings.action {
                SlideAction::Play => SLIDES_PLAY,
                SlideAction::Remove => SLIDES_REMOVE,
            };
            match triggers.last_mut() {
                Some(last) if last.name == name => {
                    last.slides.push(entry.clone());
                    continue;
                }
                _ => {}
            }
            triggers.push(BcpTrigger {
                name: name.to_string(),
                slides: vec![entry.clone()],
                priority,
                mode: mode.map(str::to_string),
            });
        }
        triggers
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a trigger and checks that it is one the slide player handles.
    pub fn decode(text: &str) -> Result<Self> {
        let trigger: Self = serde_json::from_str(text)?;
        match trigger.name.as_str() {
            SLIDES_PLAY | SLIDES_REMOVE => Ok(trigger),
            other => Err(McError::msg(format!("unsupported BCP trigger `{other}`"))),
        }
    }

    /// Entries with the action implied by the trigger name applied.
    pub fn into_entries(self) -> Vec<SlideEntry> {
        let remove = self.name == SLIDES_REMOVE;
        self.slides
            .into_iter()
            .map(|mut entry| {
                if remove {
                    entry.settings.action = SlideAction::Remove;
                }
                entry
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide_player::SlidePlayerConfig;

    fn entries(text: &str) -> Vec<SlideEntry> {
        let config =
            SlidePlayerConfig::from_value("slide_player", &serde_yaml::from_str(text).unwrap())
                .unwrap();
        config.get("ev").unwrap().to_vec()
    }

    #[test]
    fn groups_runs_of_the_same_action() {
        let entries = entries("ev:\n  a: {}\n  c: {priority: 3}\n  b: {action: remove}");
        let triggers = BcpTrigger::from_entries(&entries, 100, Some("mode1"));

        assert_eq!(triggers.len(), 2);
        assert_eq!(triggers[0].name, SLIDES_PLAY);
        assert_eq!(triggers[0].slides.len(), 2);
        assert_eq!(triggers[1].name, SLIDES_REMOVE);
        assert_eq!(triggers[1].slides[0].slide, "b");
        assert_eq!(triggers[1].mode.as_deref(), Some("mode1"));
    }

    #[test]
    fn keeps_config_order_across_actions() {
        let entries = entries("ev:\n  a: {action: remove}\n  b: {}\n  c: {action: remove}");
        let triggers = BcpTrigger::from_entries(&entries, 0, None);

        let order: Vec<_> = triggers
            .iter()
            .map(|trigger| (trigger.name.as_str(), trigger.slides[0].slide.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(SLIDES_REMOVE, "a"), (SLIDES_PLAY, "b"), (SLIDES_REMOVE, "c")]
        );
    }

    #[test]
    fn payload_survives_the_wire() {
        let entries = entries(
            "ev:\n  anon:\n    widgets: [{type: text, text: TEST FROM SHOW}]\n    transition: {type: push, direction: up}\n    expire: 2s",
        );
        let trigger = BcpTrigger::from_entries(&entries, 0, None).remove(0);

        let decoded = BcpTrigger::decode(&trigger.encode().unwrap()).unwrap();
        assert_eq!(decoded, trigger);
    }

    #[test]
    fn rejects_foreign_triggers() {
        let text = r#"{"name": "sounds_play", "slides": []}"#;
        assert!(BcpTrigger::decode(text).is_err());
    }

    #[test]
    fn remove_trigger_forces_remove_action() {
        let trigger = BcpTrigger {
            name: SLIDES_REMOVE.to_string(),
            slides: entries("ev: some_slide"),
            priority: 0,
            mode: None,
        };
        let entries = trigger.into_entries();
        assert_eq!(entries[0].settings.action, SlideAction::Remove);
    }
}
