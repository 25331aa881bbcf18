use std::sync::atomic::{AtomicBool, Ordering};

/// Marks one endpoint as busy so a slow response does not pile up
/// overlapping requests from the next timer tick.
#[derive(Debug, Default)]
pub struct InFlight(AtomicBool);

#[must_use = "the request is only marked in flight while the guard lives"]
pub struct InFlightGuard<'a>(&'a AtomicBool);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` if a request is already running.
    pub fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(&self.0))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_refused_until_guard_drops() {
        let flag = InFlight::new();
        let guard = flag.try_begin();
        assert!(guard.is_some());
        assert!(flag.try_begin().is_none());
        assert!(flag.is_busy());

        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_begin().is_some());
    }
}
