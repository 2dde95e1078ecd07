//! Cooperative cancellation for the scan loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    reason: OnceLock<String>,
}

/// Shared stop flag. Clones observe the same state.
///
/// The first reason supplied wins; later calls only re-assert the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenState>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn cancel_with_reason(&self, reason: Option<&str>) {
        if let Some(reason) = reason {
            let _ = self.inner.reason.set(reason.to_string());
        }
        self.cancel();
    }

    pub fn reason(&self) -> Option<String> {
        self.inner.reason.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        assert_eq!(clone.reason(), None);
    }

    #[test]
    fn test_first_reason_wins() {
        let token = CancellationToken::new();
        token.cancel_with_reason(Some("Interrupted by signal"));
        token.cancel_with_reason(Some("later"));
        token.cancel_with_reason(None);
        assert!(token.is_cancelled());
        assert_eq!(token.reason().as_deref(), Some("Interrupted by signal"));
    }
}
