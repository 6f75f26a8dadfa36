use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal shared between a caller and a load.
///
/// Clones observe the same flag. Cancelling is idempotent and cannot be
/// undone.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Option<Arc<AtomicBool>>,
}

impl CancellationToken {
    /// Create a token that can be cancelled
    pub fn new() -> Self {
        Self {
            cancelled: Some(Arc::new(AtomicBool::new(false))),
        }
    }

    /// A token that is never cancelled
    pub fn none() -> Self {
        Self { cancelled: None }
    }

    /// Signal cancellation. Returns `true` only for the call that flipped the flag.
    pub fn cancel(&self) -> bool {
        match &self.cancelled {
            Some(flag) => !flag.swap(true, Ordering::AcqRel),
            None => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }
}
