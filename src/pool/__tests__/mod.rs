use crate::pool::{Arena, IPoolItem, ObjectPool};
use crate::PoolError;
use std::rc::Rc;

#[derive(Default)]
struct Probe {
    value: usize,
    resets: usize,
}

impl IPoolItem for Probe {
    fn reset(&mut self) {
        self.value = 0;
        self.resets += 1;
    }
}

#[test]
fn acquire_returns_reset_slot() {
    let arena = Rc::new(Arena::new(4096));
    let mut pool: ObjectPool<Probe> = ObjectPool::new(&arena, 2, 4).unwrap();

    let first = pool.acquire().unwrap();
    pool.get_mut(first).unwrap().value = 42;
    pool.release(first).unwrap();

    let second = pool.acquire().unwrap();
    let slot = pool.get(second).unwrap();
    assert_eq!(slot.value, 0);
    assert!(slot.resets >= 1);
}

#[test]
fn release_unknown_handle_fails() {
    let arena = Rc::new(Arena::new(4096));
    let mut pool: ObjectPool<Probe> = ObjectPool::new(&arena, 1, 2).unwrap();

    let handle = pool.acquire().unwrap();
    pool.release(handle).unwrap();
    match pool.release(handle) {
        Err(PoolError::InvalidHandle(_)) => {}
        other => panic!("Expected InvalidHandle, got {:?}.", other.err()),
    }

    match pool.release(crate::pool::PoolRef(99)) {
        Err(PoolError::InvalidHandle(99)) => {}
        other => panic!("Expected InvalidHandle, got {:?}.", other.err()),
    }
}

#[test]
fn exceeding_max_capacity_fails() {
    let arena = Rc::new(Arena::new(4096));
    let mut pool: ObjectPool<Probe> = ObjectPool::new(&arena, 1, 2).unwrap();

    let _a = pool.acquire().unwrap();
    let _b = pool.acquire().unwrap();
    match pool.acquire() {
        Err(PoolError::Exhausted { capacity: 2 }) => {}
        other => panic!("Expected Exhausted, got {:?}.", other.err()),
    }
}

#[test]
fn arena_budget_bounds_growth() {
    let arena = Rc::new(Arena::new(std::mem::size_of::<Probe>()));
    let mut pool: ObjectPool<Probe> = ObjectPool::new(&arena, 1, 8).unwrap();

    let _a = pool.acquire().unwrap();
    match pool.acquire() {
        Err(PoolError::Exhausted { .. }) => {}
        other => panic!("Expected Exhausted, got {:?}.", other.err()),
    }
}

#[test]
fn operations_after_dispose_fail() {
    let arena = Rc::new(Arena::new(4096));
    let mut pool: ObjectPool<Probe> = ObjectPool::new(&arena, 1, 2).unwrap();
    let handle = pool.acquire().unwrap();

    pool.dispose();
    assert_eq!(pool.acquire(), Err(PoolError::Disposed));
    assert!(matches!(pool.release(handle), Err(PoolError::Disposed)));
    assert!(matches!(pool.get(handle), Err(PoolError::Disposed)));
}

#[test]
fn stats_track_occupancy() {
    let arena = Rc::new(Arena::new(4096));
    let mut pool: ObjectPool<Probe> = ObjectPool::new(&arena, 2, 4).unwrap();

    let a = pool.acquire().unwrap();
    let _b = pool.acquire().unwrap();
    let stats = pool.stats();
    assert_eq!(stats.in_use, 2);
    assert_eq!(stats.acquired_total, 2);

    pool.release(a).unwrap();
    let stats = pool.stats();
    assert_eq!(stats.in_use, 1);
    assert_eq!(stats.free, 1);
    assert_eq!(stats.released_total, 1);
}
