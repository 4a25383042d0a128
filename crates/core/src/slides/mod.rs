use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::{
    transitions::TransitionSpec,
    util,
    widgets::{self, WidgetSpec},
    McError, Result,
};

/// Keys a `slides:` entry may use for itself. Any other key means the mapping
/// is a single widget.
const SLIDE_KEYS: &[&str] = &["widgets", "transition", "transition_out", "expire"];

/// A named slide from a `slides:` section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlideDefinition {
    pub name: String,
    pub widgets: Vec<WidgetSpec>,
    pub transition: Option<TransitionSpec>,
    pub transition_out: Option<TransitionSpec>,
    pub expire: Option<Duration>,
}

impl SlideDefinition {
    pub fn from_value(name: &str, value: &Value) -> Result<Self> {
        let section = format!("slides:{name}");
        let mut definition = Self {
            name: name.to_string(),
            ..Default::default()
        };

        match value {
            Value::Null => {}
            Value::Sequence(_) => definition.widgets = widgets::process_widgets(&section, value)?,
            Value::Mapping(map) => {
                let is_widget = map
                    .keys()
                    .any(|key| !key.as_str().is_some_and(|key| SLIDE_KEYS.contains(&key)));

                if is_widget {
                    definition.widgets = vec![WidgetSpec::from_value(&section, value)?];
                } else {
                    if let Some(widgets) = map.get("widgets") {
                        definition.widgets = widgets::process_widgets(&section, widgets)?;
                    }
                    definition.transition =
                        TransitionSpec::from_optional(&format!("{section}:transition"), map.get("transition"))?;
                    definition.transition_out = TransitionSpec::from_optional(
                        &format!("{section}:transition_out"),
                        map.get("transition_out"),
                    )?;
                    definition.expire = util::parse_optional_duration(&section, map.get("expire"))?;
                }
            }
            other => {
                return Err(McError::config(
                    section,
                    format!("slide must be a list of widgets or a mapping, found {}", util::describe(other)),
                ))
            }
        }

        Ok(definition)
    }
}

/// Every named slide known to the controller.
#[derive(Debug, Clone, Default)]
pub struct SlideLibrary {
    slides: BTreeMap<String, SlideDefinition>,
}

impl SlideLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a whole `slides:` section and adds it to the library.
    pub fn load_section(&mut self, value: &Value) -> Result<()> {
        let map = match value {
            Value::Null => return Ok(()),
            Value::Mapping(map) => map,
            other => {
                return Err(McError::config(
                    "slides",
                    format!("expected a mapping of slide names, found {}", util::describe(other)),
                ))
            }
        };

        for (name, settings) in map {
            let name = util::scalar_to_string(name)
                .ok_or_else(|| McError::config("slides", "slide names must be strings"))?;
            self.insert(SlideDefinition::from_value(&name, settings)?);
        }

        Ok(())
    }

    pub fn insert(&mut self, definition: SlideDefinition) {
        self.slides.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&SlideDefinition> {
        self.slides.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slides.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlideDefinition> {
        self.slides.values()
    }
}

/// A slide living on a display target.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub name: String,
    /// Mode that showed the slide; `None` for machine-level slides.
    pub owner: Option<String>,
    pub priority: i32,
    pub widgets: Vec<WidgetSpec>,
    pub transition_out: Option<TransitionSpec>,
    /// Assigned by the target when the slide is added. Later additions get
    /// larger values, which breaks priority ties in favour of the newest.
    pub instance: u64,
}

impl Slide {
    pub fn new(name: impl Into<String>, owner: Option<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            owner,
            priority,
            widgets: Vec::new(),
            transition_out: None,
            instance: 0,
        }
    }

    pub fn with_widgets(mut self, widgets: Vec<WidgetSpec>) -> Self {
        self.widgets = widgets;
        self
    }

    pub fn with_transition_out(mut self, transition_out: Option<TransitionSpec>) -> Self {
        self.transition_out = transition_out;
        self
    }

    pub fn is_owned_by(&self, mode: &str) -> bool {
        self.owner.as_deref() == Some(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transitions::TransitionType;

    fn library(text: &str) -> SlideLibrary {
        let mut library = SlideLibrary::new();
        library.load_section(&serde_yaml::from_str(text).unwrap()).unwrap();
        library
    }

    #[test]
    fn parses_each_slide_form() {
        let library = library(
            r#"
list_slide:
  - type: text
    text: ONE
  - type: text
    text: TWO
widget_slide:
  type: text
  text: SOLO
full_slide:
  widgets:
    - type: rectangle
  transition_out: wipe
  expire: 1s
empty_slide:
"#,
        );

        assert_eq!(library.len(), 4);
        assert_eq!(library.get("list_slide").unwrap().widgets.len(), 2);
        assert_eq!(library.get("widget_slide").unwrap().widgets.len(), 1);

        let full = library.get("full_slide").unwrap();
        assert_eq!(full.widgets.len(), 1);
        assert_eq!(full.transition_out.as_ref().unwrap().kind, TransitionType::Wipe);
        assert_eq!(full.expire, Some(Duration::from_secs(1)));
        assert!(full.transition.is_none());

        assert!(library.get("empty_slide").unwrap().widgets.is_empty());
    }

    #[test]
    fn rejects_scalar_slides() {
        let mut library = SlideLibrary::new();
        let err = library
            .load_section(&serde_yaml::from_str("oops: 12").unwrap())
            .unwrap_err();
        assert!(format!("{err}").contains("slides:oops"));
    }
}
