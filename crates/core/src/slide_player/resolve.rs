//! Normalizes `slide_player:` sections and show `slides:` steps.
//!
//! Accepted event forms:
//!
//! ```yaml
//! slide_player:
//!   event1: slide_name                # named slide, default settings
//!   event2: [{type: text, text: HI}]  # anonymous slide named after the event
//!   event3:
//!     slide_name: {target: dmd}       # player settings
//!     other_slide: {type: text}       # one widget
//!     third_slide: [{type: text}]     # widget list
//!     fourth: renamed_slide           # plain string renames the slide
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde_yaml::Value;

use super::settings::{SlideBody, SlideEntry};
use crate::{util, widgets, McError, Result};

/// A normalized `slide_player:` section: event name to slide entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlidePlayerConfig {
    events: BTreeMap<String, Vec<SlideEntry>>,
}

impl SlidePlayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes a whole section. `section` prefixes error messages, e.g.
    /// `slide_player` or `mode1:slide_player`.
    pub fn from_value(section: &str, value: &Value) -> Result<Self> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(map) => map,
            other => {
                return Err(McError::config(
                    section,
                    format!("expected a mapping of event names, found {}", util::describe(other)),
                ))
            }
        };

        let mut events = BTreeMap::new();
        for (event, settings) in map {
            let event = util::scalar_to_string(event)
                .ok_or_else(|| McError::config(section, "event names must be strings"))?;
            let entries = resolve_event(&format!("{section}:{event}"), &event, settings)?;
            events.insert(event, entries);
        }

        Ok(Self { events })
    }

    pub fn get(&self, event: &str) -> Option<&[SlideEntry]> {
        self.events.get(event).map(Vec::as_slice)
    }

    pub fn events(&self) -> impl Iterator<Item = (&str, &[SlideEntry])> {
        self.events
            .iter()
            .map(|(event, entries)| (event.as_str(), entries.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Animation trigger events used by widgets declared inline.
    pub fn trigger_events(&self) -> BTreeSet<String> {
        let mut events = BTreeSet::new();
        for entry in self.events.values().flatten() {
            if let Some(slide_widgets) = &entry.settings.widgets {
                widgets::collect_trigger_events(slide_widgets, &mut events);
            }
        }
        events
    }
}

/// Normalizes everything configured for one event.
pub fn resolve_event(section: &str, event: &str, value: &Value) -> Result<Vec<SlideEntry>> {
    match value {
        Value::Null => Err(McError::config(section, "no slide given for event")),
        Value::Sequence(_) => Ok(vec![resolve_slide(section, event, value)?]),
        Value::Mapping(map) => {
            let mut entries: Vec<SlideEntry> = Vec::with_capacity(map.len());
            for (slide, settings) in map {
                let slide = util::scalar_to_string(slide)
                    .ok_or_else(|| McError::config(section, "slide names must be strings"))?;
                let entry = resolve_slide(section, &slide, settings)?;
                match entries.iter_mut().find(|existing| existing.slide == entry.slide) {
                    Some(existing) => *existing = entry,
                    None => entries.push(entry),
                }
            }
            Ok(entries)
        }
        scalar => {
            let slide = util::scalar_to_string(scalar)
                .ok_or_else(|| McError::config(section, "slide name must be a string"))?;
            resolve_slide(section, &slide, &Value::Null).map(|entry| vec![entry])
        }
    }
}

/// Normalizes one slide's settings. This is also what a show's `slides:`
/// step goes through.
pub fn resolve_slide(section: &str, slide: &str, value: &Value) -> Result<SlideEntry> {
    if let Value::String(renamed) = value {
        return resolve_slide(section, renamed, &Value::Null);
    }

    let body = SlideBody::classify(section, value)?;
    let slide = body.slide_name().unwrap_or_else(|| slide.to_string());
    let section = format!("{section}:{slide}");
    let settings = body.into_settings(&section)?;

    Ok(SlideEntry { slide, settings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        slide_player::settings::{SlideAction, SlideSettings},
        transitions::TransitionType,
    };

    fn section(text: &str) -> SlidePlayerConfig {
        SlidePlayerConfig::from_value("slide_player", &serde_yaml::from_str(text).unwrap())
            .unwrap()
    }

    #[test]
    fn scalar_shorthand_matches_expanded_form() {
        let short = section("some_event: slide_name");
        let expanded = section("some_event:\n  slide_name: {}");
        let null_form = section("some_event:\n  slide_name:");
        assert_eq!(short, expanded);
        assert_eq!(short, null_form);

        let entries = short.get("some_event").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].slide, "slide_name");
        assert_eq!(entries[0].settings, SlideSettings::default());
    }

    #[test]
    fn resolves_every_documented_form() {
        let config = section(
            r#"
some_event1:
  slide1:
    transition: move_in
some_event2:
  slide2:
    transition:
      type: move_in
      direction: right
      duration: 1s
some_event3: slide3
some_event4:
  slide4:
    type: text
    text: SOME TEXT
    color: red
    y: 50
some_event5:
  slide5:
    - type: text
      text: SOME TEXT
    - type: text
      text: AND MORE TEXT
some_event6:
  slide6:
    widgets:
      - type: text
        text: SOME TEXT
    transition: move_in
some_event7:
  - type: text
    text: ANON
"#,
        );

        assert_eq!(config.len(), 7);

        let slide1 = &config.get("some_event1").unwrap()[0];
        assert_eq!(
            slide1.settings.transition.as_ref().unwrap().kind,
            TransitionType::MoveIn
        );
        assert!(slide1.settings.widgets.is_none());

        let slide4 = &config.get("some_event4").unwrap()[0];
        assert_eq!(slide4.settings.widgets.as_ref().unwrap().len(), 1);

        let slide5 = &config.get("some_event5").unwrap()[0];
        assert_eq!(slide5.settings.widgets.as_ref().unwrap().len(), 2);

        let slide6 = &config.get("some_event6").unwrap()[0];
        assert_eq!(slide6.settings.widgets.as_ref().unwrap().len(), 1);
        assert!(slide6.settings.transition.is_some());

        let anon = &config.get("some_event7").unwrap()[0];
        assert_eq!(anon.slide, "some_event7");
        assert!(anon.settings.widgets.is_some());
    }

    #[test]
    fn event_level_keys_are_always_slide_names() {
        let config = section("ev:\n  slide: slide8");
        assert_eq!(config.get("ev").unwrap()[0].slide, "slide8");

        let numeric = SlidePlayerConfig::from_value(
            "slide_player",
            &serde_yaml::from_str("ev:\n  slide: slide8\n  priority: 3").unwrap(),
        );
        assert!(numeric.is_err());
    }

    #[test]
    fn slide_key_renames_the_slide() {
        let config = section("ev:\n  placeholder: {slide: real_slide, priority: 200}");
        let entry = &config.get("ev").unwrap()[0];
        assert_eq!(entry.slide, "real_slide");
        assert_eq!(entry.settings.priority, Some(200));
    }

    #[test]
    fn remove_action_is_parsed() {
        let config = section("ev:\n  slide1: {action: remove, transition: fade}");
        let entry = &config.get("ev").unwrap()[0];
        assert_eq!(entry.settings.action, SlideAction::Remove);
    }

    #[test]
    fn transition_without_type_fails() {
        let err = SlidePlayerConfig::from_value(
            "slide_player",
            &serde_yaml::from_str("ev:\n  slide1:\n    transition: {duration: 1s}").unwrap(),
        )
        .unwrap_err();
        assert!(format!("{err}").contains("slide_player:ev:slide1:transition"));
    }

    #[test]
    fn collects_inline_animation_triggers() {
        let config = section(
            r#"
ev:
  anon:
    type: text
    text: HI
    animations:
      ball_drained: {property: opacity, value: 0}
"#,
        );
        assert!(config.trigger_events().contains("ball_drained"));
    }
}
