use crate::model::ContentId;
use std::sync::atomic::{AtomicI64, Ordering};

/// Monotonic millisecond clock for time-ordered ids.
///
/// Every tick is strictly greater than the previous one, so two requests in the
/// same millisecond (or a wall clock stepping backwards) never share an id.
#[derive(Debug, Default)]
pub struct IdClock {
    last_ms: AtomicI64,
}

impl IdClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock that only issues millis after `last_ms` (e.g. the newest stored id)
    pub fn starting_after(last_ms: i64) -> Self {
        Self {
            last_ms: AtomicI64::new(last_ms),
        }
    }

    pub fn tick(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = self.last_ms.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self
                .last_ms
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    /// `count` ids sharing one tick, indexed by batch position
    pub fn content_batch(&self, count: usize) -> Vec<ContentId> {
        let ms = self.tick();
        (0..count).map(|index| ContentId::new(ms, index)).collect()
    }

    pub fn image_id(&self) -> String {
        format!("img-{}", self.tick())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_strictly_increase() {
        let clock = IdClock::new();
        let mut prev = clock.tick();
        for _ in 0..1000 {
            let next = clock.tick();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_starting_after_future_value() {
        let far = chrono::Utc::now().timestamp_millis() + 60_000;
        let clock = IdClock::starting_after(far);
        assert_eq!(clock.tick(), far + 1);
    }

    #[test]
    fn test_batch_shares_millis() {
        let clock = IdClock::new();
        let ids = clock.content_batch(3);
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| id.created_ms() == ids[0].created_ms()));
        assert_eq!(ids[2].batch_index(), 2);
        assert!(clock.image_id().starts_with("img-"));
    }
}
