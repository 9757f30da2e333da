/// reentrancy guard for passes that must not overlap
///
use std::sync::atomic::{AtomicBool, Ordering};

/// holds the "already running" flag for as long as it lives
#[derive(Debug)]
pub struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    /// claim the flag, or None when a pass is already in flight
    pub fn try_acquire(flag: &'a AtomicBool) -> Option<RunGuard<'a>> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
