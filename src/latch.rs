//! A write-once slot that makes late callers wait for the first writer.
//!
//! Unlike `std::sync::Once`, the state is explicit: a claimed but unfinished
//! slot is visible as busy, and callers that find it busy park on
//! the condition variable until the value lands.
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
enum Slot<T> {
    Empty,
    Busy,
    Full(T),
}

#[derive(Debug)]
pub(crate) struct Latch<T> {
    slot: Mutex<Slot<T>>,
    filled: Condvar,
}

/// Puts a claimed slot back to `Empty` if the initializer unwinds.
struct Release<'a, T> {
    latch: &'a Latch<T>,
    armed: bool,
}

impl<T> Drop for Release<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            *self.latch.lock() = Slot::Empty;
            self.latch.filled.notify_all();
        }
    }
}

impl<T> Latch<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            filled: Condvar::new(),
        }
    }

    // The slot is only ever replaced wholesale, so a poisoned lock still
    // holds a consistent state.
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the slot has been claimed, finished or not.
    pub(crate) fn is_claimed(&self) -> bool {
        !matches!(*self.lock(), Slot::Empty)
    }
}

impl<T: Clone> Latch<T> {
    /// The stored value, if the slot has been filled.
    pub(crate) fn get(&self) -> Option<T> {
        match &*self.lock() {
            Slot::Full(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Run `init` if nobody has claimed the slot yet. Otherwise block until the
    /// claimant stores its value. The flag is `true` for the caller that ran
    /// `init`.
    pub(crate) fn get_or_init(&self, init: impl FnOnce() -> T) -> (T, bool) {
        let mut slot = self.lock();
        loop {
            match &*slot {
                Slot::Full(value) => return (value.clone(), false),
                Slot::Busy => {
                    slot = self
                        .filled
                        .wait(slot)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Slot::Empty => break,
            }
        }
        *slot = Slot::Busy;
        drop(slot);

        let mut release = Release {
            latch: self,
            armed: true,
        };
        let value = init();
        release.armed = false;

        *self.lock() = Slot::Full(value.clone());
        self.filled.notify_all();
        (value, true)
    }

    /// Non-blocking variant of [`Latch::get_or_init`]. `init` may decline by
    /// returning `None`, which leaves the slot empty for a later attempt. A
    /// slot another caller is busy filling also yields `None`.
    pub(crate) fn try_get_or_init(&self, init: impl FnOnce() -> Option<T>) -> Option<T> {
        let mut slot = self.lock();
        match &*slot {
            Slot::Full(value) => return Some(value.clone()),
            Slot::Busy => return None,
            Slot::Empty => *slot = Slot::Busy,
        }
        drop(slot);

        let mut release = Release {
            latch: self,
            armed: true,
        };
        let value = init()?;
        release.armed = false;

        *self.lock() = Slot::Full(value.clone());
        self.filled.notify_all();
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::Latch;
    use std::{
        panic::{catch_unwind, AssertUnwindSafe},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    #[test]
    fn first_caller_runs_init() {
        let latch = Latch::new();
        assert_eq!(latch.get(), None);
        assert_eq!(latch.get_or_init(|| 1), (1, true));
        assert_eq!(latch.get_or_init(|| 2), (1, false));
        assert_eq!(latch.get(), Some(1));
        assert!(latch.is_claimed());
    }

    #[test]
    fn late_callers_wait_for_the_value() {
        let latch = Arc::new(Latch::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let latch = latch.clone();
                let runs = runs.clone();
                thread::spawn(move || {
                    latch.get_or_init(|| {
                        runs.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        i
                    })
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        let winner = results[0].0;
        assert!(results.iter().all(|(value, _)| *value == winner));
        assert_eq!(results.iter().filter(|(_, ran)| *ran).count(), 1);
    }

    #[test]
    fn try_init_can_decline() {
        let latch = Latch::new();
        assert_eq!(latch.try_get_or_init(|| None), None);
        assert!(!latch.is_claimed());
        assert_eq!(latch.try_get_or_init(|| Some("a")), Some("a"));
        assert_eq!(latch.try_get_or_init(|| Some("b")), Some("a"));
    }

    #[test]
    fn unwinding_init_releases_the_slot() {
        let latch = Latch::new();
        let res = catch_unwind(AssertUnwindSafe(|| latch.get_or_init(|| panic!("boom"))));
        assert!(res.is_err());
        assert!(!latch.is_claimed());
        assert_eq!(latch.get_or_init(|| 7), (7, true));
    }
}
