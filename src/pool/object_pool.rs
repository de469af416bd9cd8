use super::{Arena, IPoolItem, ObjectPool, PoolRef, PoolStats};
use crate::PoolError;
use std::mem::size_of;
use std::rc::Rc;

impl<T: IPoolItem> ObjectPool<T> {
    /// Create a new pool bound to the arena.
    /// ### Arguments
    /// * `arena` - The arena budget the pool charges its slots against.
    /// * `initial_capacity` - Slots allocated up front.
    /// * `max_capacity` - Hard bound on the slot count.
    pub fn new(
        arena: &Rc<Arena>,
        initial_capacity: usize,
        max_capacity: usize,
    ) -> Result<Self, PoolError> {
        debug_assert!(initial_capacity <= max_capacity);
        arena.reserve(initial_capacity * size_of::<T>())?;

        let mut slots = Vec::with_capacity(initial_capacity);
        let mut free = Vec::with_capacity(initial_capacity);
        for index in 0..initial_capacity {
            slots.push(T::default());
            free.push(initial_capacity - 1 - index);
        }

        Ok(Self {
            arena: Rc::clone(arena),
            live: vec![false; initial_capacity],
            slots,
            free,
            max_capacity,
            acquired_total: 0,
            released_total: 0,
            disposed: false,
        })
    }

    /// Acquire a reset slot from the pool.
    ///
    /// Grows the pool within `max_capacity` and the arena budget when the
    /// free list is empty.
    pub fn acquire(&mut self) -> Result<PoolRef, PoolError> {
        self.ensure_usable()?;

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                if self.slots.len() >= self.max_capacity {
                    return Err(PoolError::Exhausted {
                        capacity: self.max_capacity,
                    });
                }
                self.arena.reserve(size_of::<T>())?;
                self.slots.push(T::default());
                self.live.push(false);
                self.slots.len() - 1
            }
        };

        self.slots[index].reset();
        self.live[index] = true;
        self.acquired_total += 1;
        Ok(PoolRef(index))
    }

    /// Return a slot to the pool. Releasing an unknown or already released
    /// slot fails with [PoolError::InvalidHandle].
    pub fn release(&mut self, handle: PoolRef) -> Result<(), PoolError> {
        self.ensure_usable()?;

        match self.live.get(handle.0) {
            Some(true) => {
                self.live[handle.0] = false;
                self.free.push(handle.0);
                self.released_total += 1;
                Ok(())
            }
            _ => Err(PoolError::InvalidHandle(handle.0)),
        }
    }

    pub fn get(&self, handle: PoolRef) -> Result<&T, PoolError> {
        self.ensure_usable()?;
        match self.live.get(handle.0) {
            Some(true) => Ok(&self.slots[handle.0]),
            _ => Err(PoolError::InvalidHandle(handle.0)),
        }
    }

    pub fn get_mut(&mut self, handle: PoolRef) -> Result<&mut T, PoolError> {
        self.ensure_usable()?;
        match self.live.get(handle.0) {
            Some(true) => Ok(&mut self.slots[handle.0]),
            _ => Err(PoolError::InvalidHandle(handle.0)),
        }
    }

    pub fn in_use(&self) -> usize {
        self.live.iter().filter(|l| **l).count()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.slots.len(),
            in_use: self.in_use(),
            free: self.free.len(),
            acquired_total: self.acquired_total,
            released_total: self.released_total,
        }
    }

    /// Release the pool slots and return the reserved bytes to the arena.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.arena.unreserve(self.slots.len() * size_of::<T>());
        self.slots.clear();
        self.live.clear();
        self.free.clear();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_usable(&self) -> Result<(), PoolError> {
        if self.disposed || self.arena.is_disposed() {
            Err(PoolError::Disposed)
        } else {
            Ok(())
        }
    }
}
