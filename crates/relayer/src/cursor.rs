//! Shared, forward-only block cursor.
//!
//! Owned jointly by a Messenger and the Progress Controller: the
//! Messenger reads and advances it per tick; the controller fast-forwards
//! it from the destination's authoritative state when eligibility is
//! regained. All mutations are monotonic, so the two writers cannot move
//! each other backwards.

use std::sync::Arc;

use alloy_primitives::U256;
use parking_lot::Mutex;

#[derive(Debug, Clone, Default)]
pub struct SharedCursor(Arc<Mutex<U256>>);

impl SharedCursor {
    pub fn new(initial: U256) -> Self {
        Self(Arc::new(Mutex::new(initial)))
    }

    pub fn get(&self) -> U256 {
        *self.0.lock()
    }

    /// Move the cursor forward to `height`. A lower target is ignored;
    /// returns whether the cursor moved.
    pub fn advance_to(&self, height: U256) -> bool {
        let mut current = self.0.lock();
        if height > *current {
            *current = height;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_never_moves_backwards() {
        let cursor = SharedCursor::new(U256::from(100u64));
        assert!(cursor.advance_to(U256::from(101u64)));
        assert!(!cursor.advance_to(U256::from(50u64)));
        assert!(!cursor.advance_to(U256::from(101u64)));
        assert_eq!(cursor.get(), U256::from(101u64));
    }
}
