/// Source of book ids.
pub trait IdGenerator {
    fn next_id(&mut self) -> i64;
}

/// Wall-clock millisecond ids, bumped past the previous id when the clock
/// has not moved on. Strictly increasing within one generator.
pub struct ClockIds {
    clock: Box<dyn FnMut() -> i64>,
    last: Option<i64>,
}

impl ClockIds {
    pub fn new() -> Self {
        Self::with_clock(|| chrono::Utc::now().timestamp_millis())
    }

    pub fn with_clock(clock: impl FnMut() -> i64 + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            last: None,
        }
    }
}

impl Default for ClockIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for ClockIds {
    fn next_id(&mut self) -> i64 {
        let now = (self.clock)();
        let id = match self.last {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last = Some(id);
        id
    }
}

#[derive(Debug, Clone)]
pub struct SequentialIds {
    next: i64,
}

impl SequentialIds {
    pub fn starting_at(next: i64) -> Self {
        Self { next }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::{ClockIds, IdGenerator, SequentialIds};
    use std::collections::HashSet;

    #[test]
    fn clock_ids_are_unique_in_a_tight_loop() {
        let mut ids = ClockIds::new();
        let generated: Vec<i64> = (0..10_000).map(|_| ids.next_id()).collect();
        let unique: HashSet<i64> = generated.iter().copied().collect();

        assert_eq!(unique.len(), generated.len());
        assert!(generated.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn stalled_clock_still_advances() {
        let mut ids = ClockIds::with_clock(|| 1_000);

        assert_eq!(ids.next_id(), 1_000);
        assert_eq!(ids.next_id(), 1_001);
        assert_eq!(ids.next_id(), 1_002);
    }

    #[test]
    fn clock_going_backwards_does_not_reuse_ids() {
        let mut ticks = vec![5_000, 4_000, 6_000].into_iter();
        let mut ids = ClockIds::with_clock(move || ticks.next().unwrap_or(0));

        assert_eq!(ids.next_id(), 5_000);
        assert_eq!(ids.next_id(), 5_001);
        assert_eq!(ids.next_id(), 6_000);
    }

    #[test]
    fn sequential_ids_count_up() {
        let mut ids = SequentialIds::starting_at(7);
        assert_eq!(ids.next_id(), 7);
        assert_eq!(ids.next_id(), 8);
    }
}
