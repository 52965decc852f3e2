//! Process-wide reservoir of value pools.
//!
//! Parsing into a [`crate::Document`] takes a pool from here and dropping
//! the document gives it back, so node slots and string blocks are reused
//! across documents. By default each thread keeps its own reservoir; with
//! [`set_thread_safe`] pools are shared across threads behind a mutex.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::debug;
use parking_lot::Mutex;

use crate::arena::ValuePool;

/// Pools kept per reservoir; extra pools are dropped.
const RESERVOIR_MAX: usize = 8;

static THREAD_SAFE: AtomicBool = AtomicBool::new(false);
static SHARED: Mutex<Vec<ValuePool>> = Mutex::new(Vec::new());
static SHARED_LEN: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static LOCAL: RefCell<Vec<ValuePool>> = const { RefCell::new(Vec::new()) };
}

/// Switches between per-thread and shared reservoirs. Pools already held
/// by the previous reservoir stay there until [`cleanup`].
pub fn set_thread_safe(enabled: bool) {
    THREAD_SAFE.store(enabled, Ordering::Release);
    debug!("pool reservoir thread safety {}", if enabled { "on" } else { "off" });
}

pub fn is_thread_safe() -> bool {
    THREAD_SAFE.load(Ordering::Acquire)
}

/// A recycled pool if one is available, otherwise a new one.
pub fn take_pool() -> ValuePool {
    if is_thread_safe() {
        // Unlocked peek; the lock is only taken when there looks to be
        // something to take.
        if SHARED_LEN.load(Ordering::Relaxed) == 0 {
            return ValuePool::new();
        }
        let mut shared = SHARED.lock();
        let pool = shared.pop();
        SHARED_LEN.store(shared.len(), Ordering::Relaxed);
        return pool.unwrap_or_default();
    }
    LOCAL
        .with(|local| local.borrow_mut().pop())
        .unwrap_or_default()
}

/// Empties `pool` and keeps it for the next [`take_pool`].
pub fn put_pool(mut pool: ValuePool) {
    pool.reset();
    if pool.stats().free == 0 {
        return;
    }
    if is_thread_safe() {
        let mut shared = SHARED.lock();
        if shared.len() < RESERVOIR_MAX {
            shared.push(pool);
            SHARED_LEN.store(shared.len(), Ordering::Relaxed);
        }
        return;
    }
    LOCAL.with(|local| {
        let mut local = local.borrow_mut();
        if local.len() < RESERVOIR_MAX {
            local.push(pool);
        }
    });
}

/// Number of pools waiting in the reservoir in use.
pub fn pooled() -> usize {
    if is_thread_safe() {
        SHARED_LEN.load(Ordering::Relaxed)
    } else {
        LOCAL.with(|local| local.borrow().len())
    }
}

/// Drops every recycled pool, in the shared reservoir and in this thread's.
pub fn cleanup() {
    let shared = {
        let mut shared = SHARED.lock();
        SHARED_LEN.store(0, Ordering::Relaxed);
        std::mem::take(&mut *shared)
    };
    let local = LOCAL.with(|local| std::mem::take(&mut *local.borrow_mut()));
    debug!(
        "pool cleanup released {} shared and {} local pools",
        shared.len(),
        local.len()
    );
}
