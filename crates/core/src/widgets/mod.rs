//! Widget and animation specs carried by slides.
//!
//! Widgets are rendered elsewhere; this module only checks that each widget
//! names a known kind and that its animations are well formed, so a broken
//! animation fails at config load instead of when its trigger event fires.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::{
    util::{self, parse_duration},
    McError, Result,
};

const WIDGET_KINDS: &[&str] = &[
    "bezier",
    "character_picker",
    "color_dmd",
    "dmd",
    "ellipse",
    "entered_chars",
    "image",
    "line",
    "point",
    "quad",
    "rectangle",
    "slide_frame",
    "text",
    "text_input",
    "triangle",
    "video",
];

/// Slide lifecycle events that every widget already receives, so they never
/// need to be registered as BCP trigger events.
const SLIDE_EVENTS: &[&str] = &[
    "entrance",
    "pre_show_slide",
    "show_slide",
    "pre_slide_leave",
    "slide_leave",
    "slide_play",
];

/// Validated settings for one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSpec {
    #[serde(rename = "type")]
    pub widget_type: String,
    /// Kind-specific settings, passed through untouched to the renderer.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub animations: Option<BTreeMap<String, Vec<AnimationStep>>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationTiming {
    #[default]
    AfterPrevious,
    WithPrevious,
}

/// One property animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineAnimation {
    pub property: Vec<String>,
    pub value: Vec<Value>,
    pub duration: Duration,
    #[serde(default)]
    pub timing: AnimationTiming,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default)]
    pub relative: bool,
    pub easing: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnimationStep {
    Named { named_animation: String },
    Inline(InlineAnimation),
}

impl WidgetSpec {
    /// Validates one widget mapping.
    pub fn from_value(section: &str, value: &Value) -> Result<Self> {
        let map = value.as_mapping().ok_or_else(|| {
            McError::config(
                section,
                format!("widget must be a mapping, found {}", util::describe(value)),
            )
        })?;

        let widget_type = match map.get("type") {
            Some(Value::String(kind)) => kind.to_ascii_lowercase(),
            _ => return Err(McError::config(section, "widget requires a \"type:\" setting")),
        };

        if !WIDGET_KINDS.contains(&widget_type.as_str()) {
            return Err(McError::config(
                section,
                format!("unknown widget type `{widget_type}`"),
            ));
        }

        let mut fields = BTreeMap::new();
        let mut animations = None;

        for (key, value) in map {
            let key = util::scalar_to_string(key).ok_or_else(|| {
                McError::config(section, "widget setting names must be strings")
            })?;
            match key.as_str() {
                "type" => {}
                "animations" => {
                    let section = format!("{section}:animations");
                    animations = Some(process_animations(&section, value)?);
                }
                _ => {
                    fields.insert(key, value.clone());
                }
            }
        }

        Ok(Self {
            widget_type,
            fields,
            animations,
        })
    }

    /// Event names this widget's animations are triggered by, excluding the
    /// slide lifecycle events.
    pub fn trigger_events(&self) -> impl Iterator<Item = &str> {
        self.animations
            .iter()
            .flat_map(|animations| animations.keys())
            .map(String::as_str)
            .filter(|event| !SLIDE_EVENTS.contains(event))
    }
}

/// Normalizes a `widgets:` node: one mapping or a list of mappings.
pub fn process_widgets(section: &str, value: &Value) -> Result<Vec<WidgetSpec>> {
    match value {
        Value::Mapping(_) => Ok(vec![WidgetSpec::from_value(section, value)?]),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| WidgetSpec::from_value(&format!("{section}[{index}]"), item))
            .collect(),
        other => Err(McError::config(
            section,
            format!("widgets must be a mapping or a list, found {}", util::describe(other)),
        )),
    }
}

/// Collects the trigger events of every widget in `widgets`.
pub fn collect_trigger_events<'a>(
    widgets: impl IntoIterator<Item = &'a WidgetSpec>,
    into: &mut BTreeSet<String>,
) {
    for widget in widgets {
        into.extend(widget.trigger_events().map(str::to_string));
    }
}

fn process_animations(
    section: &str,
    value: &Value,
) -> Result<BTreeMap<String, Vec<AnimationStep>>> {
    let map = value.as_mapping().ok_or_else(|| {
        McError::config(section, "animations must map event names to animation steps")
    })?;

    let mut animations = BTreeMap::new();
    for (event, steps) in map {
        let event = util::scalar_to_string(event)
            .ok_or_else(|| McError::config(section, "animation event names must be strings"))?;
        let step_section = format!("{section}:{event}");

        let steps = match steps {
            Value::String(_) => util::string_to_list(steps)
                .into_iter()
                .map(|name| AnimationStep::Named {
                    named_animation: name,
                })
                .collect(),
            Value::Mapping(_) => vec![process_animation(&step_section, steps)?],
            Value::Sequence(items) => items
                .iter()
                .map(|item| process_animation(&step_section, item))
                .collect::<Result<Vec<_>>>()?,
            other => {
                return Err(McError::config(
                    step_section,
                    format!("animation steps cannot be {}", util::describe(other)),
                ))
            }
        };

        animations.insert(event, steps);
    }

    Ok(animations)
}

fn process_animation(section: &str, value: &Value) -> Result<AnimationStep> {
    let map = match value {
        Value::String(name) => {
            return Ok(AnimationStep::Named {
                named_animation: name.clone(),
            })
        }
        Value::Mapping(map) => map,
        other => {
            return Err(McError::config(
                section,
                format!("animation step cannot be {}", util::describe(other)),
            ))
        }
    };

    if let Some(Value::String(name)) = map.get("named_animation") {
        return Ok(AnimationStep::Named {
            named_animation: name.clone(),
        });
    }

    let mut animation = InlineAnimation {
        property: Vec::new(),
        value: Vec::new(),
        duration: Duration::from_secs(1),
        timing: AnimationTiming::default(),
        repeat: false,
        relative: false,
        easing: "linear".to_string(),
    };

    for (key, value) in map {
        match key.as_str().unwrap_or_default() {
            "property" => animation.property = util::string_to_list(value),
            "value" => {
                animation.value = match value {
                    Value::Sequence(values) => values.clone(),
                    Value::String(_) => util::string_to_list(value)
                        .into_iter()
                        .map(Value::String)
                        .collect(),
                    Value::Null => Vec::new(),
                    other => vec![other.clone()],
                }
            }
            "duration" => animation.duration = parse_duration(section, value)?,
            "timing" => {
                animation.timing = match value.as_str() {
                    Some("after_previous") => AnimationTiming::AfterPrevious,
                    Some("with_previous") => AnimationTiming::WithPrevious,
                    _ => {
                        return Err(McError::config(
                            section,
                            "animation timing must be `after_previous` or `with_previous`",
                        ))
                    }
                }
            }
            "repeat" => animation.repeat = util::parse_bool(section, "repeat", Some(value), false)?,
            "relative" => {
                animation.relative = util::parse_bool(section, "relative", Some(value), false)?
            }
            "easing" => {
                animation.easing = util::scalar_to_string(value)
                    .ok_or_else(|| McError::config(section, "animation easing must be a string"))?
            }
            other => {
                return Err(McError::config(
                    section,
                    format!("unknown animation setting `{other}`"),
                ))
            }
        }
    }

    if animation.property.is_empty() {
        return Err(McError::config(section, "animation requires a \"property:\" setting"));
    }

    if animation.property.len() != animation.value.len() {
        return Err(McError::config(
            section,
            format!(
                "animation \"property\" list ({}) is not the same length as the \"value\" list ({})",
                animation.property.join(", "),
                animation
                    .value
                    .iter()
                    .map(|value| util::scalar_to_string(value).unwrap_or_else(|| "?".into()))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ));
    }

    Ok(AnimationStep::Inline(animation))
}
