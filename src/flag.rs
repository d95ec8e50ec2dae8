//! Single-bit, set-once cross-thread signal.
//!
//! A `Flag` carries no data and implies no synchronization of anything
//! else — it exists purely so one thread can tell another "this
//! happened" without a channel or a mutex.

use std::sync::atomic::{AtomicBool, Ordering::Relaxed};

/// A concurrently readable, set-once boolean.
#[derive(Debug, Default)]
pub struct Flag(AtomicBool);

impl Flag {
    /// Creates a new, unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Sets the flag. Idempotent.
    pub fn set(&self) {
        self.0.store(true, Relaxed);
    }

    /// Clears the flag. Idempotent.
    pub fn clear(&self) {
        self.0.store(false, Relaxed);
    }

    /// Returns whether the flag is currently set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::Flag;

    #[test]
    fn starts_unset() {
        assert!(!Flag::new().is_set());
    }

    #[test]
    fn set_then_clear() {
        let flag = Flag::new();
        flag.set();
        assert!(flag.is_set());
        flag.clear();
        assert!(!flag.is_set());
    }

    #[test]
    fn set_is_idempotent() {
        let flag = Flag::new();
        flag.set();
        flag.set();
        assert!(flag.is_set());
    }
}
