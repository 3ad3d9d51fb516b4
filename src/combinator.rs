use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use log::trace;

use crate::{Outcome, Promise};

const RACER_NAME: &str = "promise-any";

/// Wait for every promise and return their outcomes in input order.
///
/// Promises are waited on one after another. They have all been running
/// since they were created, so the total wait is roughly that of the slowest
/// one. A rejection does not stop the remaining waits.
///
/// ```
/// use threaded_promise::{wait_all, Error, Promise};
///
/// let promises = vec![
///     Promise::new(|resolve, _| {
///         resolve.resolve(1);
///     }),
///     Promise::new(|_, reject| {
///         reject.reject(Error::new("two"));
///     }),
/// ];
/// let outcomes = wait_all(&promises);
/// assert_eq!(outcomes[0].value(), Some(&1));
/// assert_eq!(outcomes[1].error().unwrap().to_string(), "two");
/// ```
pub fn wait_all<'a, T, I>(promises: I) -> Vec<Arc<Outcome<T>>>
where
    T: 'a,
    I: IntoIterator<Item = &'a Promise<T>>,
{
    promises.into_iter().map(Promise::wait).collect()
}

/// Return the outcome of whichever promise settles first, resolved or
/// rejected. Returns `None` only when `promises` is empty.
///
/// One racer thread per promise waits on it. Only the first racer to finish
/// reports; the others exit as soon as their own promise settles.
///
/// # Panics
///
/// Panics if the OS fails to create a racer thread; use [`try_any`] to
/// recover from such errors.
pub fn any<'a, T, I>(promises: I) -> Option<Arc<Outcome<T>>>
where
    T: Send + Sync + 'static,
    I: IntoIterator<Item = &'a Promise<T>>,
{
    try_any(promises).expect("failed to spawn race thread")
}

/// Like [`any`], but returns the error if a racer thread cannot be spawned.
///
/// Racers started before the failure keep running until their promise
/// settles, then exit without reporting.
pub fn try_any<'a, T, I>(promises: I) -> io::Result<Option<Arc<Outcome<T>>>>
where
    T: Send + Sync + 'static,
    I: IntoIterator<Item = &'a Promise<T>>,
{
    let (tx, rx) = crossbeam_channel::bounded(1);
    let decided = Arc::new(AtomicBool::new(false));

    for promise in promises {
        let promise = promise.clone();
        let tx = tx.clone();
        let decided = decided.clone();
        thread::Builder::new()
            .name(RACER_NAME.to_owned())
            .spawn(move || {
                let outcome = promise.wait();
                if decided.swap(true, Ordering::AcqRel) {
                    trace!("promise '{}' lost the race", promise.name());
                    return;
                }
                trace!("promise '{}' won the race", promise.name());
                // Only the winner sends, so the slot is free. The receiver is
                // gone if spawning a later racer failed.
                let _ = tx.send(outcome);
            })?;
    }
    drop(tx);

    Ok(rx.recv().ok())
}
