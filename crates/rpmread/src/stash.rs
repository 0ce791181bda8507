//! Bounded set of recently seen signer key ids.
//!
//! Used to warn once, not on every package, when a key is unknown or
//! untrusted. Shared across threads; the lock is held only for a bounded
//! linear scan.

use std::sync::{Mutex, OnceLock};

struct Ring {
    ids: Vec<u32>,
    next: usize,
}

/// A bounded ring of key ids supporting one operation: `observe`.
pub struct KeyIdStash {
    inner: Mutex<Ring>,
}

impl KeyIdStash {
    /// Maximum number of distinct key ids remembered.
    pub const CAPACITY: usize = 256;

    pub fn new() -> Self {
        KeyIdStash {
            inner: Mutex::new(Ring {
                ids: Vec::new(),
                next: 0,
            }),
        }
    }

    /// Record `keyid` and report whether it had been seen before.
    ///
    /// `0` means "no key id" and is never recorded. When the ring is full
    /// the oldest id is overwritten. A poisoned lock pretends the id is
    /// new: the worst case is a repeated warning, never a suppressed one.
    pub fn observe(&self, keyid: u32) -> bool {
        if keyid == 0 {
            return false;
        }
        let Ok(mut ring) = self.inner.lock() else {
            return false;
        };
        if ring.ids.contains(&keyid) {
            return true;
        }
        if ring.ids.len() < Self::CAPACITY {
            ring.ids.push(keyid);
        } else {
            let slot = ring.next;
            ring.ids[slot] = keyid;
        }
        ring.next = (ring.next + 1) % Self::CAPACITY;
        false
    }

    /// The process-wide stash used by the default logging embedding.
    pub fn global() -> &'static KeyIdStash {
        static GLOBAL: OnceLock<KeyIdStash> = OnceLock::new();
        GLOBAL.get_or_init(KeyIdStash::new)
    }
}

impl Default for KeyIdStash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_is_new_then_seen() {
        let stash = KeyIdStash::new();
        assert!(!stash.observe(0xdead));
        assert!(stash.observe(0xdead));
        assert!(!stash.observe(0xbeef));
        assert!(stash.observe(0xdead));
        assert!(stash.observe(0xbeef));
    }

    #[test]
    fn zero_is_inert() {
        let stash = KeyIdStash::new();
        assert!(!stash.observe(0));
        assert!(!stash.observe(0));
    }

    #[test]
    fn eviction_forgets_the_oldest() {
        let stash = KeyIdStash::new();
        for id in 1..=KeyIdStash::CAPACITY as u32 {
            assert!(!stash.observe(id));
        }
        // Full; inserting one more overwrites id 1.
        assert!(!stash.observe(0x1_0001));
        assert!(!stash.observe(1));
        // id 2 was evicted by re-inserting 1.
        assert!(!stash.observe(2));
        assert!(stash.observe(0x1_0001));
    }

    #[test]
    fn concurrent_observers_agree_eventually() {
        use std::sync::Arc;
        let stash = Arc::new(KeyIdStash::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let stash = Arc::clone(&stash);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    stash.observe(42);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(stash.observe(42));
    }
}
