pub mod options_waiter;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub use options_waiter::spawn_options_waiter;

/// Hands out one ticket per loaded poll version.
///
/// Issuing a new ticket or invalidating the counter makes every earlier ticket
/// stale, which is how deferred work learns that its poll was superseded or
/// that the controller was torn down.
#[derive(Debug, Clone, Default)]
pub struct LoadCounter {
    current: Arc<AtomicU64>,
}

impl LoadCounter {
    pub fn issue(&self) -> LoadTicket {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        LoadTicket {
            generation,
            current: Arc::clone(&self.current),
        }
    }

    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl LoadTicket {
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}
