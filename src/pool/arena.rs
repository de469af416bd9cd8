use super::Arena;
use crate::PoolError;
use std::cell::Cell;

impl Arena {
    /// Create a new arena with the given byte budget.
    pub fn new(bytes: usize) -> Self {
        Self {
            budget: bytes,
            reserved: Cell::new(0),
            disposed: Cell::new(false),
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn reserved(&self) -> usize {
        self.reserved.get()
    }

    /// Reserve a region of the budget for a pool growth step.
    pub(crate) fn reserve(&self, bytes: usize) -> Result<(), PoolError> {
        if self.disposed.get() {
            return Err(PoolError::Disposed);
        }
        let next = self.reserved.get() + bytes;
        if next > self.budget {
            return Err(PoolError::Exhausted {
                capacity: self.budget,
            });
        }
        self.reserved.set(next);
        Ok(())
    }

    pub(crate) fn unreserve(&self, bytes: usize) {
        self.reserved.set(self.reserved.get().saturating_sub(bytes));
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Release the arena. Pool operations against a disposed arena fail
    /// with [PoolError::Disposed].
    pub fn dispose(&self) {
        self.disposed.set(true);
        self.reserved.set(0);
    }
}
