use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lets the scheduler ask its driver for one more cycle.
///
/// At most one request is outstanding; requesting again before the driver
/// served the previous request does not queue a second cycle.
pub trait CycleRequester {
    fn request_next_cycle(&mut self);

    /// Withdraws a request the driver has not served yet.
    fn cancel_pending(&mut self);
}

/// Shared one-slot request flag, polled by [`IntervalDriver`](super::IntervalDriver).
#[derive(Debug, Clone, Default)]
pub struct CycleSignal {
    pending: Arc<AtomicBool>,
}

impl CycleSignal {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consumes the pending request, if any.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

impl CycleRequester for CycleSignal {
    fn request_next_cycle(&mut self) {
        self.pending.store(true, Ordering::Release);
    }

    fn cancel_pending(&mut self) {
        self.pending.store(false, Ordering::Release);
    }
}
