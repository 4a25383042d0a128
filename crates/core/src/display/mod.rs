//! Display targets.
//!
//! A target hosts an ordered stack of slides and shows one of them. Actual
//! drawing happens elsewhere; [`SlideTarget`] is the contract the slide player
//! talks to and [`Display`] is the in-process model of that contract that
//! keeps the priority stack, slide ownership and the running transition.

use std::{collections::BTreeMap, fmt, time::Duration};

use tracing::debug;

use crate::{
    slides::Slide,
    transitions::{ActiveTransition, TransitionSpec},
    widgets::WidgetSpec,
    McError, Result,
};

/// Name that always resolves to the default display.
pub const DEFAULT_TARGET: &str = "default";

/// What a show request did to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    /// The same slide was already current at the same priority.
    Unchanged,
    /// The slide became the current slide.
    Activated,
    /// The slide was added to the stack but something else stays current.
    Queued,
}

/// Per-request flags for [`SlideTarget::show_slide`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShowOptions {
    pub show: bool,
    pub force: bool,
    /// Incoming transition. When `None` the outgoing slide's
    /// `transition_out` is used instead.
    pub transition: Option<TransitionSpec>,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self {
            show: true,
            force: false,
            transition: None,
        }
    }
}

pub trait SlideTarget: fmt::Debug {
    fn name(&self) -> &str;

    /// Adds `slide` to the stack, replacing any slide with the same name, and
    /// makes it current unless a higher priority slide is showing.
    fn show_slide(&mut self, slide: Slide, options: ShowOptions) -> ShowOutcome;

    /// Builds a new slide out of `widgets` and shows it.
    fn add_and_show_slide(
        &mut self,
        owner: Option<String>,
        slide_name: &str,
        priority: i32,
        widgets: Vec<WidgetSpec>,
        transition_out: Option<TransitionSpec>,
        options: ShowOptions,
    ) -> ShowOutcome {
        let slide = Slide::new(slide_name, owner, priority)
            .with_widgets(widgets)
            .with_transition_out(transition_out);
        self.show_slide(slide, options)
    }

    /// Removes the named slide. If it was current, the highest priority slide
    /// left takes over using `transition`, else the removed slide's
    /// `transition_out`, else the `transition_out` stored on the slide that
    /// takes over.
    fn remove_slide(&mut self, name: &str, transition: Option<TransitionSpec>) -> Option<Slide>;

    /// Removes every slide owned by `mode` and returns how many went away.
    fn remove_mode_slides(&mut self, mode: &str) -> usize;

    /// All slides, highest priority first.
    fn slides(&self) -> &[Slide];

    fn current_slide(&self) -> Option<&Slide>;

    fn transition(&self) -> Option<&ActiveTransition>;

    /// Advances the running transition.
    fn tick(&mut self, delta: Duration);

    fn current_slide_name(&self) -> Option<&str> {
        self.current_slide().map(|slide| slide.name.as_str())
    }

    fn slide(&self, name: &str) -> Option<&Slide> {
        self.slides().iter().find(|slide| slide.name == name)
    }

    /// Slides owned by `mode`.
    fn screens(&self, mode: &str) -> Vec<&Slide> {
        self.slides()
            .iter()
            .filter(|slide| slide.is_owned_by(mode))
            .collect()
    }
}

/// In-process display surface.
#[derive(Debug)]
pub struct Display {
    name: String,
    width: u32,
    height: u32,
    slides: Vec<Slide>,
    current: Option<u64>,
    transition: Option<ActiveTransition>,
    next_instance: u64,
}

impl Display {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            slides: Vec::new(),
            current: None,
            transition: None,
            next_instance: 1,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn insert_sorted(&mut self, slide: Slide) {
        let index = self
            .slides
            .partition_point(|existing| existing.priority > slide.priority);
        self.slides.insert(index, slide);
    }

    fn activate(&mut self, instance: u64, from: Option<String>, transition: Option<TransitionSpec>) {
        let Some(to) = self
            .slides
            .iter()
            .find(|slide| slide.instance == instance)
            .map(|slide| slide.name.clone())
        else {
            return;
        };

        debug!(display = %self.name, slide = %to, ?from, "activating slide");
        self.current = Some(instance);
        self.transition = transition
            .filter(|spec| !spec.is_none())
            .map(|spec| ActiveTransition::new(spec, from, to));
    }

    fn activate_highest(&mut self, from: Option<String>, transition: Option<TransitionSpec>) {
        match self.slides.first().map(|slide| slide.instance) {
            Some(instance) => self.activate(instance, from, transition),
            None => {
                debug!(display = %self.name, "no slides left");
                self.current = None;
                self.transition = None;
            }
        }
    }
}

impl SlideTarget for Display {
    fn name(&self) -> &str {
        &self.name
    }

    fn show_slide(&mut self, mut slide: Slide, options: ShowOptions) -> ShowOutcome {
        let mut outgoing = None;

        if let Some(index) = self.slides.iter().position(|existing| existing.name == slide.name) {
            let existing = &self.slides[index];
            if options.show
                && self.current == Some(existing.instance)
                && existing.priority == slide.priority
                && existing.owner == slide.owner
            {
                debug!(display = %self.name, slide = %slide.name, "slide already showing");
                return ShowOutcome::Unchanged;
            }

            let removed = self.slides.remove(index);
            if self.current == Some(removed.instance) {
                self.current = None;
                outgoing = Some(removed);
            }
        }

        slide.instance = self.next_instance;
        self.next_instance += 1;
        let instance = slide.instance;

        // With the old current instance gone, the highest remaining slide is
        // what the new one has to beat.
        let rival = self.current_slide().or_else(|| self.slides.first());
        let activate = options.show
            && (options.force || rival.map_or(true, |rival| slide.priority >= rival.priority));

        self.insert_sorted(slide);

        if activate {
            let previous = outgoing.or_else(|| self.current_slide().cloned());
            let transition = options.transition.or_else(|| {
                previous
                    .as_ref()
                    .and_then(|previous| previous.transition_out.clone())
            });
            self.activate(instance, previous.map(|previous| previous.name), transition);
            ShowOutcome::Activated
        } else {
            if self.current.is_none() {
                let transition = outgoing.as_ref().and_then(|slide| slide.transition_out.clone());
                self.activate_highest(outgoing.map(|slide| slide.name), transition);
            }
            ShowOutcome::Queued
        }
    }

    fn remove_slide(&mut self, name: &str, transition: Option<TransitionSpec>) -> Option<Slide> {
        let index = self.slides.iter().position(|slide| slide.name == name)?;
        let removed = self.slides.remove(index);
        debug!(display = %self.name, slide = %removed.name, "removed slide");

        if self.current == Some(removed.instance) {
            let transition = transition
                .or_else(|| removed.transition_out.clone())
                .or_else(|| self.slides.first().and_then(|next| next.transition_out.clone()));
            self.activate_highest(Some(removed.name.clone()), transition);
        }

        Some(removed)
    }

    fn remove_mode_slides(&mut self, mode: &str) -> usize {
        let current_owned = self
            .current_slide()
            .filter(|slide| slide.is_owned_by(mode))
            .map(|slide| (slide.name.clone(), slide.transition_out.clone()));

        let before = self.slides.len();
        self.slides.retain(|slide| !slide.is_owned_by(mode));
        let removed = before - self.slides.len();

        if let Some((name, transition_out)) = current_owned {
            let transition = transition_out
                .or_else(|| self.slides.first().and_then(|next| next.transition_out.clone()));
            self.activate_highest(Some(name), transition);
        }

        if removed > 0 {
            debug!(display = %self.name, mode, removed, "removed mode slides");
        }
        removed
    }

    fn slides(&self) -> &[Slide] {
        &self.slides
    }

    fn current_slide(&self) -> Option<&Slide> {
        let current = self.current?;
        self.slides.iter().find(|slide| slide.instance == current)
    }

    fn transition(&self) -> Option<&ActiveTransition> {
        self.transition.as_ref()
    }

    fn tick(&mut self, delta: Duration) {
        if let Some(transition) = self.transition.as_mut() {
            if transition.advance(delta) {
                debug!(display = %self.name, to = %transition.to, "transition finished");
                self.transition = None;
            }
        }
    }
}

/// Registry of display targets plus the global default.
#[derive(Debug, Default)]
pub struct Targets {
    targets: BTreeMap<String, Box<dyn SlideTarget>>,
    default: Option<String>,
}

impl Targets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a target. The first target added becomes the default until
    /// one is added with `is_default` set.
    pub fn add(&mut self, target: Box<dyn SlideTarget>, is_default: bool) {
        let name = target.name().to_string();
        if is_default || self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.targets.insert(name, target);
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    fn canonical<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.targets.contains_key(name) {
            Some(name)
        } else if name == DEFAULT_TARGET {
            self.default.as_deref()
        } else {
            None
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.canonical(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&dyn SlideTarget> {
        let name = self.canonical(name)?;
        self.targets.get(name).map(|target| target.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn SlideTarget + 'static)> {
        let name = self.canonical(name)?.to_string();
        self.targets.get_mut(&name).map(|target| target.as_mut())
    }

    /// Picks the target for a slide: the explicit one, else the mode's,
    /// else the global default.
    pub fn resolve(&self, explicit: Option<&str>, mode_target: Option<&str>) -> Result<String> {
        if let Some(name) = explicit.or(mode_target) {
            return self
                .canonical(name)
                .map(str::to_string)
                .ok_or_else(|| McError::UnknownTarget(name.to_string()));
        }

        self.default.clone().ok_or_else(|| {
            McError::config(
                "slide_player",
                "no target given and no default display is configured",
            )
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn SlideTarget> {
        self.targets.values().map(|target| target.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn SlideTarget>> {
        self.targets.values_mut()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
