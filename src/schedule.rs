/// An event waiting for simulated time to reach its deadline
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduled<T> {
    pub due: f64,
    pub event: T,
}

/// Deadline-ordered queue of deferred events, drained by the tick loop.
/// Events sharing a deadline fire in the order they were scheduled.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQueue<T> {
    pending: Vec<Scheduled<T>>,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self { pending: Vec::new() }
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: f64, event: T) {
        // Insert after every event due at or before `due`
        let at = self.pending.partition_point(|s| s.due <= due);
        self.pending.insert(at, Scheduled { due, event });
    }

    /// Remove and return every event due at or before `now`, earliest first
    pub fn drain_due(&mut self, now: f64) -> Vec<T> {
        let split = self.pending.partition_point(|s| s.due <= now);
        self.pending.drain(..split).map(|s| s.event).collect()
    }

    /// Drop every pending event; returns how many were cancelled
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
