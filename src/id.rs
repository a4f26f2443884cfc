//! ID generation utilities for Quiesce
//!
//! Provides identifiers for tracked animations, gated requests and barrier
//! epochs. IDs are allocated per barrier and never reused within it.

use std::fmt;

use serde::Serialize;

/// Identifies one tracked animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AnimationId(u64);

/// Identifies one gated request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RequestId(u64);

/// Identifies one barrier epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EpochId(u64);

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anim-{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

impl fmt::Display for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch-{}", self.0)
    }
}

/// Monotonic counters backing the ID types
///
/// Lives inside the barrier's guarded state, so plain integers suffice.
#[derive(Debug, Default)]
pub struct IdSequence {
    animations: u64,
    requests: u64,
    epochs: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next animation ID
    pub fn next_animation(&mut self) -> AnimationId {
        self.animations += 1;
        AnimationId(self.animations)
    }

    /// Allocate the next request ID
    pub fn next_request(&mut self) -> RequestId {
        self.requests += 1;
        RequestId(self.requests)
    }

    /// Allocate the next epoch ID
    pub fn next_epoch(&mut self) -> EpochId {
        self.epochs += 1;
        EpochId(self.epochs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut seq = IdSequence::new();
        let a = seq.next_animation();
        let b = seq.next_animation();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_kinds_have_independent_counters() {
        let mut seq = IdSequence::new();
        seq.next_animation();
        seq.next_animation();
        assert_eq!(seq.next_request().to_string(), "req-1");
        assert_eq!(seq.next_epoch().to_string(), "epoch-1");
        assert_eq!(seq.next_animation().to_string(), "anim-3");
    }

    #[test]
    fn test_display_prefixes() {
        let mut seq = IdSequence::new();
        assert!(seq.next_animation().to_string().starts_with("anim-"));
        assert!(seq.next_request().to_string().starts_with("req-"));
        assert!(seq.next_epoch().to_string().starts_with("epoch-"));
    }
}
