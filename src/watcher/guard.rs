//! Single-flight flag for scheduled scans.

use std::sync::atomic::{AtomicBool, Ordering};

/// Marks a poller's scheduled scan as in progress.
#[derive(Debug, Default)]
pub struct ScanFlag {
    busy: AtomicBool,
}

impl ScanFlag {
    /// Creates an idle flag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// Claims the flag, or returns `None` while another scan holds it.
    ///
    /// The flag is released when the returned guard drops, including on
    /// early return and unwinding.
    #[must_use]
    pub fn try_acquire(&self) -> Option<ScanGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanGuard { flag: &self.busy })
    }

    /// Whether a scan currently holds the flag.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases its [`ScanFlag`] on drop.
#[derive(Debug)]
pub struct ScanGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
