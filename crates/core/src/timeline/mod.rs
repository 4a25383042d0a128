use std::time::Duration;

/// Main-thread clock. Time only moves when the event loop advances it, which
/// keeps expiry and transitions deterministic.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    elapsed: Duration,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.elapsed
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    pub fn advance(&mut self, delta: Duration) {
        self.elapsed += delta;
    }
}

/// A payload that becomes due at `deadline`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent<T> {
    pub deadline: Duration,
    pub payload: T,
}

impl<T> ScheduledEvent<T> {
    pub fn new(deadline: Duration, payload: T) -> Self {
        Self { deadline, payload }
    }
}

/// Deadline queue. Events scheduled for the same deadline fire in the order
/// they were scheduled.
#[derive(Debug)]
pub struct Scheduler<T> {
    events: Vec<ScheduledEvent<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: Duration, payload: T) {
        let index = self.events.partition_point(|event| event.deadline <= deadline);
        self.events.insert(index, ScheduledEvent::new(deadline, payload));
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Deadline of the next pending event, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.events.first().map(|event| event.deadline)
    }

    /// Removes and returns every event whose deadline is at or before `clock`.
    pub fn tick(&mut self, clock: &Clock) -> Vec<ScheduledEvent<T>> {
        let due = self.events.partition_point(|event| event.deadline <= clock.now());
        self.events.drain(..due).collect()
    }

    /// Drops pending events the predicate rejects.
    pub fn retain(&mut self, keep: impl FnMut(&ScheduledEvent<T>) -> bool) {
        self.events.retain(keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_events_in_deadline_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(Duration::from_secs(2), "late");
        scheduler.schedule(Duration::from_secs(1), "early");
        scheduler.schedule(Duration::from_secs(1), "early-second");

        let mut clock = Clock::new();
        clock.advance(Duration::from_millis(999));
        assert!(scheduler.tick(&clock).is_empty());

        clock.advance(Duration::from_millis(1));
        let fired: Vec<_> = scheduler.tick(&clock).into_iter().map(|e| e.payload).collect();
        assert_eq!(fired, vec!["early", "early-second"]);
        assert_eq!(scheduler.next_deadline(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn retain_drops_cancelled_events() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(Duration::from_secs(1), 1);
        scheduler.schedule(Duration::from_secs(1), 2);
        scheduler.retain(|event| event.payload != 1);
        assert_eq!(scheduler.len(), 1);
    }
}
