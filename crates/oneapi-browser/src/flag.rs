//! In-flight flags and counters for running requests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Holds an [`AtomicBool`] set for as long as the guard lives
#[derive(Debug)]
pub(crate) struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    /// Set the flag, or return `None` if it is already set
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Counts running requests; decrements when dropped
#[derive(Debug)]
pub(crate) struct Loading<'a> {
    count: &'a AtomicUsize,
}

impl<'a> Loading<'a> {
    pub(crate) fn start(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::AcqRel);
        Self { count }
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_drop() {
        let flag = AtomicBool::new(false);
        let guard = InFlight::acquire(&flag);
        assert!(guard.is_some());
        assert!(InFlight::acquire(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
        assert!(InFlight::acquire(&flag).is_some());
    }

    #[test]
    fn test_loading_counts_overlapping_requests() {
        let count = AtomicUsize::new(0);
        let first = Loading::start(&count);
        let second = Loading::start(&count);
        assert_eq!(count.load(Ordering::Acquire), 2);

        drop(first);
        drop(second);
        assert_eq!(count.load(Ordering::Acquire), 0);
    }
}
