//! Cancellation tokens scoped to an owner's lifetime
//!
//! A token is handed to whatever listens on behalf of an owner (for example
//! the global move/release listeners of a drag). When the owner is torn down
//! the token is cancelled and every clone observes it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cancellation token for cooperative teardown
///
/// Multiple tokens can share the same underlying cancellation state via Arc.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel this token and all of its clones
    ///
    /// Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once `cancel()` has been called on this token or any clone
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Live tokens keyed by owner
///
/// Registering an owner that already has a live token cancels the old one
/// first, so an owner never has two listeners at once.
#[derive(Debug)]
pub struct CancellationRegistry<K> {
    tokens: HashMap<K, CancellationToken>,
}

impl<K: Hash + Eq> CancellationRegistry<K> {
    pub fn new() -> Self {
        Self {
            tokens: HashMap::new(),
        }
    }

    /// Register an owner and return its fresh token
    pub fn register(&mut self, owner: K) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.tokens.insert(owner, token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Cancel and forget the owner's token
    ///
    /// Returns `true` if the owner had a live token.
    pub fn cancel(&mut self, owner: &K) -> bool {
        match self.tokens.remove(owner) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Forget the owner's token without cancelling it (normal completion)
    pub fn unregister(&mut self, owner: &K) -> bool {
        self.tokens.remove(owner).is_some()
    }

    /// Cancel every live token, returning how many were cancelled
    pub fn cancel_all(&mut self) -> usize {
        let count = self.tokens.len();
        for (_, token) in self.tokens.drain() {
            token.cancel();
        }
        count
    }

    pub fn contains(&self, owner: &K) -> bool {
        self.tokens.contains_key(owner)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<K: Hash + Eq> Default for CancellationRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_basic() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancellation_token_clone() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();

        token1.cancel();
        assert!(token2.is_cancelled());
    }

    #[test]
    fn test_cancellation_token_idempotent() {
        let token = CancellationToken::default();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_registry_cancel_removes_owner() {
        let mut registry = CancellationRegistry::new();
        let token = registry.register(7u32);
        assert_eq!(registry.len(), 1);

        assert!(registry.cancel(&7));
        assert!(token.is_cancelled());
        assert!(registry.is_empty());
        assert!(!registry.cancel(&7));
    }

    #[test]
    fn test_registry_reregister_cancels_previous() {
        let mut registry = CancellationRegistry::new();
        let first = registry.register("a");
        let second = registry.register("a");

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_unregister_leaves_token_live() {
        let mut registry = CancellationRegistry::new();
        let token = registry.register(1u8);

        assert!(registry.unregister(&1));
        assert!(!token.is_cancelled());
        assert!(!registry.contains(&1));
    }

    #[test]
    fn test_registry_cancel_all() {
        let mut registry = CancellationRegistry::new();
        let tokens: Vec<_> = (0..3u8).map(|owner| registry.register(owner)).collect();

        assert_eq!(registry.cancel_all(), 3);
        assert!(tokens.iter().all(CancellationToken::is_cancelled));
        assert!(registry.is_empty());
    }
}
