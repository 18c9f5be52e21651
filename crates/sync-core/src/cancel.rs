//! A one-shot cancellation signal shared between the facade, scanner,
//! planner and worker threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheaply cloned handle to a shared cancellation flag. `close()` is
/// idempotent: calling it more than once has the same effect as once.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resets the token so the same handle can back another run. Only the
    /// engine facade calls this, between runs, never while workers exist.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.close();
        token.close();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_observe_the_same_signal() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.close();
        assert!(token.is_cancelled());
    }

    #[test]
    fn reset_allows_reuse() {
        let token = CancelToken::new();
        token.close();
        token.reset();
        assert!(!token.is_cancelled());
    }
}
