use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::{
    transitions::TransitionSpec,
    util,
    widgets::{self, WidgetSpec},
    McError, Result,
};

/// Every key the slide player understands. A mapping using any other key is
/// a widget, not player settings.
pub const PLAYER_KEYS: &[&str] = &[
    "action",
    "expire",
    "force",
    "priority",
    "show",
    "slide",
    "target",
    "transition",
    "transition_out",
    "widgets",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideAction {
    #[default]
    Play,
    Remove,
}

/// Fully defaulted settings for one slide in one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideSettings {
    pub action: SlideAction,
    /// Added to the caller's base priority when present; otherwise the base
    /// priority is used as is.
    pub priority: Option<i32>,
    pub target: Option<String>,
    /// Present for slides built on the fly instead of named in `slides:`.
    pub widgets: Option<Vec<WidgetSpec>>,
    pub transition: Option<TransitionSpec>,
    pub transition_out: Option<TransitionSpec>,
    pub show: bool,
    pub force: bool,
    pub expire: Option<Duration>,
}

impl Default for SlideSettings {
    fn default() -> Self {
        Self {
            action: SlideAction::Play,
            priority: None,
            target: None,
            widgets: None,
            transition: None,
            transition_out: None,
            show: true,
            force: false,
            expire: None,
        }
    }
}

impl SlideSettings {
    pub fn priority_with_base(&self, base: i32) -> i32 {
        match self.priority {
            Some(priority) => priority + base,
            None => base,
        }
    }
}

/// Settings posted along with an event. Each field that is present replaces
/// the configured value on every slide the event plays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideOverrides {
    pub priority: Option<i32>,
    pub target: Option<String>,
    pub show: Option<bool>,
    pub force: Option<bool>,
    pub expire: Option<Duration>,
    pub transition: Option<TransitionSpec>,
    pub transition_out: Option<TransitionSpec>,
}

impl SlideOverrides {
    pub fn from_value(section: &str, value: &Value) -> Result<Self> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(map) => map,
            other => {
                return Err(McError::config(
                    section,
                    format!("event settings must be a mapping, found {}", util::describe(other)),
                ))
            }
        };

        let mut overrides = Self::default();
        for (key, value) in map {
            if value.is_null() {
                continue;
            }
            let key = key.as_str().unwrap_or_default();
            match key {
                "priority" => overrides.priority = util::parse_optional_int(section, key, Some(value))?,
                "target" => {
                    overrides.target = Some(util::scalar_to_string(value).ok_or_else(|| {
                        McError::config(section, "`target` must be a display name")
                    })?)
                }
                "show" => overrides.show = Some(util::parse_bool(section, key, Some(value), true)?),
                "force" => overrides.force = Some(util::parse_bool(section, key, Some(value), false)?),
                "expire" => overrides.expire = util::parse_optional_duration(section, Some(value))?,
                "transition" => {
                    overrides.transition =
                        TransitionSpec::from_value(&format!("{section}:transition"), value)?
                }
                "transition_out" => {
                    overrides.transition_out =
                        TransitionSpec::from_value(&format!("{section}:transition_out"), value)?
                }
                other => {
                    return Err(McError::config(
                        section,
                        format!("`{other}` cannot be set when posting an event"),
                    ))
                }
            }
        }
        Ok(overrides)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, entry: &SlideEntry) -> SlideEntry {
        let mut entry = entry.clone();
        let settings = &mut entry.settings;
        if let Some(priority) = self.priority {
            settings.priority = Some(priority);
        }
        if let Some(target) = &self.target {
            settings.target = Some(target.clone());
        }
        if let Some(show) = self.show {
            settings.show = show;
        }
        if let Some(force) = self.force {
            settings.force = force;
        }
        if let Some(expire) = self.expire {
            settings.expire = Some(expire);
        }
        if let Some(transition) = &self.transition {
            settings.transition = Some(transition.clone());
        }
        if let Some(transition_out) = &self.transition_out {
            settings.transition_out = Some(transition_out.clone());
        }
        entry
    }

    pub fn apply_all(&self, entries: &[SlideEntry]) -> Vec<SlideEntry> {
        entries.iter().map(|entry| self.apply(entry)).collect()
    }
}

/// A slide name paired with its settings, in config order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideEntry {
    pub slide: String,
    pub settings: SlideSettings,
}

/// Result of classifying one raw slide value. The decision is made here, once;
/// everything downstream works with the validated [`SlideSettings`].
#[derive(Debug, Clone, PartialEq)]
pub enum SlideBody {
    /// Player settings (possibly empty).
    Settings(Mapping),
    /// A list of widgets for an anonymous slide.
    Widgets(Value),
    /// A single widget for an anonymous slide.
    Widget(Value),
}

impl SlideBody {
    pub fn classify(section: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Settings(Mapping::new())),
            Value::Sequence(_) => Ok(Self::Widgets(value.clone())),
            Value::Mapping(map) => {
                let unknown = map
                    .keys()
                    .find(|key| !key.as_str().is_some_and(|key| PLAYER_KEYS.contains(&key)));
                match unknown {
                    Some(_) => Ok(Self::Widget(value.clone())),
                    None => Ok(Self::Settings(map.clone())),
                }
            }
            other => Err(McError::config(
                section,
                format!(
                    "slide settings must be a name, a list of widgets or a mapping, found {}",
                    util::describe(other)
                ),
            )),
        }
    }

    /// The `slide:` key of a settings body, which renames the slide.
    pub fn slide_name(&self) -> Option<String> {
        match self {
            Self::Settings(map) => map.get("slide").and_then(util::scalar_to_string),
            _ => None,
        }
    }

    pub fn into_settings(self, section: &str) -> Result<SlideSettings> {
        match self {
            Self::Widgets(value) => Ok(SlideSettings {
                widgets: Some(widgets::process_widgets(section, &value)?),
                ..Default::default()
            }),
            Self::Widget(value) => Ok(SlideSettings {
                widgets: Some(vec![WidgetSpec::from_value(section, &value)?]),
                ..Default::default()
            }),
            Self::Settings(map) => settings_from_mapping(section, &map),
        }
    }
}

fn settings_from_mapping(section: &str, map: &Mapping) -> Result<SlideSettings> {
    let action = match map.get("action") {
        None | Some(Value::Null) => SlideAction::Play,
        Some(value) => match value.as_str() {
            Some("play") => SlideAction::Play,
            Some("remove") => SlideAction::Remove,
            _ => {
                return Err(McError::config(
                    section,
                    "`action` must be `play` or `remove`",
                ))
            }
        },
    };

    let target = match map.get("target") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            util::scalar_to_string(value)
                .ok_or_else(|| McError::config(section, "`target` must be a display name"))?,
        ),
    };

    let widgets = match map.get("widgets") {
        None | Some(Value::Null) => None,
        Some(value) => Some(widgets::process_widgets(section, value)?),
    };

    let settings = SlideSettings {
        action,
        priority: util::parse_optional_int(section, "priority", map.get("priority"))?,
        target,
        widgets,
        transition: TransitionSpec::from_optional(
            &format!("{section}:transition"),
            map.get("transition"),
        )?,
        transition_out: TransitionSpec::from_optional(
            &format!("{section}:transition_out"),
            map.get("transition_out"),
        )?,
        show: util::parse_bool(section, "show", map.get("show"), true)?,
        force: util::parse_bool(section, "force", map.get("force"), false)?,
        expire: util::parse_optional_duration(section, map.get("expire"))?,
    };

    if settings.action == SlideAction::Remove && settings.widgets.is_some() {
        return Err(McError::config(
            section,
            "a slide being removed cannot also define widgets",
        ));
    }

    Ok(settings)
}
