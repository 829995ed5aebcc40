use std::sync::atomic::{AtomicU16, Ordering};

/// Hands out worker ports as a monotonic sequence
///
/// The k-th allocation returns `base_port + k`; ports are never reused
/// within one allocator lifetime. At daemon startup every port already
/// assigned in the instance document is observed, so allocation resumes
/// past the highest existing port instead of restarting at the base.
pub struct PortAllocator {
    next: AtomicU16,
}

impl PortAllocator {
    pub fn new(base_port: u16) -> Self {
        Self {
            next: AtomicU16::new(base_port),
        }
    }

    /// Allocate the next port
    pub fn allocate(&self) -> u16 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Lift the allocation cursor past a port that is already assigned
    pub fn observe(&self, in_use: u16) {
        self.next
            .fetch_max(in_use.saturating_add(1), Ordering::SeqCst);
    }
}
