//! `transition:` / `transition_out:` sections.
//!
//! A transition may be written as a bare type name (`transition: fade`) or as
//! a mapping with at least a `type:` key. Both forms normalize into
//! [`TransitionSpec`]. The `none` type is kept as an explicit value because it
//! suppresses the outgoing slide's `transition_out`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::{
    util::{self, parse_duration},
    McError, Result,
};

const DEFAULT_DURATION: Duration = Duration::from_secs(1);
const DEFAULT_EASING: &str = "out_quad";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    None,
    Push,
    MoveIn,
    MoveOut,
    Wipe,
    Swap,
    Fade,
    FadeBack,
}

impl TransitionType {
    fn parse(section: &str, name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "push" => Ok(Self::Push),
            "move_in" => Ok(Self::MoveIn),
            "move_out" => Ok(Self::MoveOut),
            "wipe" => Ok(Self::Wipe),
            "swap" => Ok(Self::Swap),
            "fade" => Ok(Self::Fade),
            "fade_back" => Ok(Self::FadeBack),
            other => Err(McError::config(
                section,
                format!("unknown transition type `{other}`"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    fn parse(section: &str, name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "up" | "top" => Ok(Self::Up),
            "down" | "bottom" => Ok(Self::Down),
            other => Err(McError::config(
                section,
                format!("unknown transition direction `{other}`"),
            )),
        }
    }
}

/// Validated transition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    #[serde(rename = "type")]
    pub kind: TransitionType,
    #[serde(default)]
    pub direction: Option<Direction>,
    pub duration: Duration,
    pub easing: String,
}

impl TransitionSpec {
    pub fn new(kind: TransitionType) -> Self {
        Self {
            kind,
            direction: None,
            duration: DEFAULT_DURATION,
            easing: DEFAULT_EASING.to_string(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Whether this is the explicit `none` transition.
    pub fn is_none(&self) -> bool {
        self.kind == TransitionType::None
    }

    /// Normalizes a raw `transition:` node. `null` means "not configured".
    pub fn from_value(section: &str, value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(name) => Ok(Some(Self::new(TransitionType::parse(section, name)?))),
            Value::Mapping(map) => {
                let kind = match map.get("type") {
                    Some(Value::String(name)) => TransitionType::parse(section, name)?,
                    _ => {
                        return Err(McError::config(
                            section,
                            "transition: section of config requires a \"type:\" setting",
                        ))
                    }
                };

                let mut spec = Self::new(kind);

                for (key, value) in map {
                    let key = key.as_str().unwrap_or_default();
                    match key {
                        "type" => {}
                        "direction" => {
                            let name = util::scalar_to_string(value).ok_or_else(|| {
                                McError::config(section, "transition direction must be a string")
                            })?;
                            spec.direction = Some(Direction::parse(section, &name)?);
                        }
                        "duration" => spec.duration = parse_duration(section, value)?,
                        "easing" => {
                            spec.easing = util::scalar_to_string(value).ok_or_else(|| {
                                McError::config(section, "transition easing must be a string")
                            })?;
                        }
                        other => {
                            return Err(McError::config(
                                section,
                                format!("unknown transition setting `{other}`"),
                            ))
                        }
                    }
                }

                Ok(Some(spec))
            }
            other => Err(McError::config(
                section,
                format!("transition must be a name or a mapping, found {}", util::describe(other)),
            )),
        }
    }

    pub fn from_optional(section: &str, value: Option<&Value>) -> Result<Option<Self>> {
        value.map_or(Ok(None), |value| Self::from_value(section, value))
    }
}

/// A transition that is currently animating on a target.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTransition {
    pub spec: TransitionSpec,
    pub from: Option<String>,
    pub to: String,
    pub elapsed: Duration,
}

impl ActiveTransition {
    pub fn new(spec: TransitionSpec, from: Option<String>, to: impl Into<String>) -> Self {
        Self {
            spec,
            from,
            to: to.into(),
            elapsed: Duration::ZERO,
        }
    }

    /// Advances the animation; returns `true` once it has finished.
    pub fn advance(&mut self, delta: Duration) -> bool {
        self.elapsed += delta;
        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.spec.duration
    }

    /// Normalised [0, 1] completion of the animation.
    pub fn progress(&self) -> f32 {
        if self.spec.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.spec.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}
