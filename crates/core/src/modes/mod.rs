use std::collections::BTreeMap;

use tracing::info;

use crate::{config::ModeConfig, McError, Result};

/// A game mode as seen by the media controller: a base priority, an optional
/// default display, and whether it is currently running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    pub name: String,
    pub priority: i32,
    pub target: Option<String>,
    pub start_events: Vec<String>,
    pub stop_events: Vec<String>,
    running: bool,
}

impl Mode {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
            target: None,
            start_events: Vec::new(),
            stop_events: Vec::new(),
            running: false,
        }
    }

    pub fn from_config(name: &str, config: &ModeConfig) -> Self {
        Self {
            name: name.to_string(),
            priority: config.priority,
            target: config.target.clone(),
            start_events: config.start_events.clone(),
            stop_events: config.stop_events.clone(),
            running: false,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[derive(Debug, Clone, Default)]
pub struct Modes {
    modes: BTreeMap<String, Mode>,
}

impl Modes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mode: Mode) {
        self.modes.insert(mode.name.clone(), mode);
    }

    pub fn get(&self, name: &str) -> Option<&Mode> {
        self.modes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mode> {
        self.modes.values()
    }

    /// Running modes, highest priority first.
    pub fn running(&self) -> Vec<&Mode> {
        let mut running: Vec<&Mode> = self.modes.values().filter(|mode| mode.running).collect();
        running.sort_by(|a, b| b.priority.cmp(&a.priority));
        running
    }

    /// Marks the mode running. Returns `false` if it already was.
    pub fn start(&mut self, name: &str) -> Result<bool> {
        let mode = self
            .modes
            .get_mut(name)
            .ok_or_else(|| McError::UnknownMode(name.to_string()))?;
        if mode.running {
            return Ok(false);
        }
        mode.running = true;
        info!(mode = name, priority = mode.priority, "mode started");
        Ok(true)
    }

    /// Marks the mode stopped. Returns `false` if it was not running.
    pub fn stop(&mut self, name: &str) -> Result<bool> {
        let mode = self
            .modes
            .get_mut(name)
            .ok_or_else(|| McError::UnknownMode(name.to_string()))?;
        if !mode.running {
            return Ok(false);
        }
        mode.running = false;
        info!(mode = name, "mode stopped");
        Ok(true)
    }

    /// Modes that `event` starts and stops, in that order.
    pub fn triggered_by(&self, event: &str) -> (Vec<String>, Vec<String>) {
        let starts = self
            .modes
            .values()
            .filter(|mode| mode.start_events.iter().any(|e| e == event))
            .map(|mode| mode.name.clone())
            .collect();
        let stops = self
            .modes
            .values()
            .filter(|mode| mode.stop_events.iter().any(|e| e == event))
            .map(|mode| mode.name.clone())
            .collect();
        (starts, stops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut modes = Modes::new();
        modes.insert(Mode::new("mode1", 500));

        assert!(modes.start("mode1").unwrap());
        assert!(!modes.start("mode1").unwrap());
        assert!(modes.get("mode1").unwrap().is_running());
        assert!(modes.stop("mode1").unwrap());
        assert!(!modes.stop("mode1").unwrap());
        assert!(matches!(modes.start("nope"), Err(McError::UnknownMode(_))));
    }

    #[test]
    fn running_modes_sorted_by_priority() {
        let mut modes = Modes::new();
        modes.insert(Mode::new("low", 100));
        modes.insert(Mode::new("high", 900));
        modes.insert(Mode::new("idle", 500));
        modes.start("low").unwrap();
        modes.start("high").unwrap();

        let names: Vec<_> = modes.running().iter().map(|mode| mode.name.as_str()).collect();
        assert_eq!(names, vec!["high", "low"]);
    }

    #[test]
    fn finds_modes_by_control_event() {
        let mut modes = Modes::new();
        let mut mode = Mode::new("mode1", 500);
        mode.start_events = vec!["ball_started".into()];
        mode.stop_events = vec!["ball_ended".into()];
        modes.insert(mode);

        assert_eq!(modes.triggered_by("ball_started").0, vec!["mode1"]);
        assert_eq!(modes.triggered_by("ball_ended").1, vec!["mode1"]);
    }
}
