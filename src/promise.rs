//! The promise handle and the background thread that drives it.
//!
//! Each promise owns a one-slot channel. The settling call (resolve, reject,
//! or a converted panic) sends exactly one [`Outcome`] through it, guarded by
//! the settle latch. Retrieval is guarded by a second latch: the first waiter
//! receives from the channel and caches the outcome, everyone else reads the
//! cache.
use std::{
    fmt,
    future::{Future, IntoFuture},
    io,
    panic::{catch_unwind, AssertUnwindSafe},
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll, Waker},
    thread,
};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, trace};

use crate::{
    latch::Latch,
    settle::{Rejecter, Resolver, Settler},
    Error, Outcome,
};

const DEFAULT_NAME: &str = "promise";

pub(crate) struct Shared<T> {
    pub(crate) name: String,
    sender: Mutex<Option<Sender<Outcome<T>>>>,
    receiver: Receiver<Outcome<T>>,
    settled: Latch<()>,
    received: Latch<Arc<Outcome<T>>>,
    wakers: Mutex<Vec<Waker>>,
}

impl<T> Shared<T> {
    fn new(name: String) -> Self {
        let (tx, rx) = bounded(1);
        Self {
            name,
            sender: Mutex::new(Some(tx)),
            receiver: rx,
            settled: Latch::new(),
            received: Latch::new(),
            wakers: Mutex::new(Vec::new()),
        }
    }

    /// Send `outcome` if nothing has settled the promise yet. Returns whether
    /// this call was the one that settled it.
    pub(crate) fn settle(&self, outcome: Outcome<T>) -> bool {
        let kind = if outcome.is_resolved() {
            "resolved"
        } else {
            "rejected"
        };
        let ((), settled) = self.settled.get_or_init(|| {
            // Taking the sender closes the channel once the outcome is queued.
            let sender = self
                .sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(sender) = sender {
                // The receiver lives in `self`, and the slot is empty.
                let _ = sender.send(outcome);
            }
        });
        if settled {
            debug!("promise '{}' {}", self.name, kind);
            self.wake();
        } else {
            debug!("promise '{}' already settled, ignoring {} call", self.name, kind);
        }
        settled
    }

    pub(crate) fn is_settling(&self) -> bool {
        self.settled.is_claimed()
    }

    fn receive(&self) -> Arc<Outcome<T>> {
        // The sender is only dropped after its single send.
        Arc::new(
            self.receiver
                .recv()
                .unwrap_or_else(|_| Outcome::rejected(Error::Dropped)),
        )
    }

    fn try_receive(&self) -> Option<Arc<Outcome<T>>> {
        self.receiver.try_recv().ok().map(Arc::new)
    }

    /// Fill the cache from the channel without blocking.
    fn try_fill(&self) -> Option<Arc<Outcome<T>>> {
        self.try_fill_with(|| self.try_receive())
    }

    fn try_fill_with(
        &self,
        receive: impl FnOnce() -> Option<Arc<Outcome<T>>>,
    ) -> Option<Arc<Outcome<T>>> {
        let mut declined = false;
        let outcome = self.received.try_get_or_init(|| {
            let outcome = receive();
            declined = outcome.is_none();
            outcome
        });
        match outcome {
            Some(_) => self.wake(),
            // A settle that landed while we held the slot woke nobody, and a
            // future that saw the slot busy is parked on us. Its outcome is
            // still in the channel.
            None if declined && self.settled.get().is_some() => self.wake(),
            None => {}
        }
        outcome
    }

    fn register(&self, waker: &Waker) {
        let mut wakers = self.wakers.lock().unwrap_or_else(PoisonError::into_inner);
        if !wakers.iter().any(|w| w.will_wake(waker)) {
            wakers.push(waker.clone());
        }
    }

    fn wake(&self) {
        let wakers = {
            let mut wakers = self.wakers.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *wakers)
        };
        for waker in wakers {
            waker.wake();
        }
    }
}

/// A handle to work running on its own thread.
///
/// Cloning the handle is cheap; all clones observe the same outcome.
///
/// # Examples
///
/// ```
/// use threaded_promise::{Error, Promise};
///
/// let promise = Promise::new(|resolve, reject| {
///     if 2 + 2 == 4 {
///         resolve.resolve("math works");
///     } else {
///         reject.reject(Error::new("math is broken"));
///     }
/// });
///
/// // <do other work concurrently>
///
/// let outcome = promise.wait();
/// assert_eq!(outcome.value(), Some(&"math works"));
/// assert!(outcome.error().is_none());
/// ```
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Promise<T> {
    /// Run `task` on a new thread and return a handle to its outcome without
    /// waiting for it to start.
    ///
    /// # Panics
    ///
    /// Panics if the OS fails to create a thread; use [`Builder::spawn`] to
    /// recover from such errors.
    pub fn new<F>(task: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnOnce(Resolver<T>, Rejecter<T>) + Send + 'static,
    {
        Builder::new()
            .spawn(task)
            .expect("failed to spawn promise thread")
    }

    /// Block until the promise settles and return its outcome.
    ///
    /// Only the first call blocks on the underlying channel. Every call, from
    /// any thread, returns the same shared outcome.
    pub fn wait(&self) -> Arc<Outcome<T>> {
        let (outcome, received) = self.shared.received.get_or_init(|| self.shared.receive());
        if received {
            trace!("promise '{}' outcome received", self.shared.name);
            self.shared.wake();
        }
        outcome
    }

    /// Return the outcome if it is available without blocking.
    ///
    /// Yields `None` while the promise is pending, and also while another
    /// caller is in the middle of retrieving it.
    pub fn try_wait(&self) -> Option<Arc<Outcome<T>>> {
        self.shared.try_fill()
    }

    /// Whether the task has settled the promise.
    pub fn is_settled(&self) -> bool {
        self.shared.settled.get().is_some()
    }

    /// A future resolving to the same outcome as [`Promise::wait`].
    ///
    /// ```
    /// use futures::executor::block_on;
    /// use threaded_promise::Promise;
    ///
    /// let promise = Promise::new(|resolve, _| {
    ///     resolve.resolve(42);
    /// });
    /// let outcome = block_on(promise.settled());
    /// assert_eq!(outcome.value(), Some(&42));
    /// ```
    pub fn settled(&self) -> Settled<'_, T> {
        Settled { promise: self }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("name", &self.shared.name)
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl<'a, T> IntoFuture for &'a Promise<T> {
    type Output = Arc<Outcome<T>>;
    type IntoFuture = Settled<'a, T>;

    fn into_future(self) -> Self::IntoFuture {
        self.settled()
    }
}

/// Future returned by [`Promise::settled`].
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Settled<'a, T> {
    promise: &'a Promise<T>,
}

impl<T> Future for Settled<'_, T> {
    type Output = Arc<Outcome<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.promise.try_wait() {
            return Poll::Ready(outcome);
        }
        // Register before checking again, so a settle in between still wakes us.
        self.promise.shared.register(cx.waker());
        match self.promise.try_wait() {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

/// Thread configuration for a new promise.
///
/// ```
/// use threaded_promise::Builder;
///
/// let promise = Builder::new()
///     .name("fetch")
///     .stack_size(256 * 1024)
///     .spawn(|resolve, _| {
///         resolve.resolve(std::thread::current().name().map(str::to_owned));
///     })
///     .unwrap();
/// assert_eq!(promise.wait().value(), Some(&Some("fetch".to_owned())));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    name: Option<String>,
    stack_size: Option<usize>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the background thread, also used in log messages. Defaults to
    /// `"promise"`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Spawn the background thread running `task` and return its promise.
    pub fn spawn<T, F>(self, task: F) -> io::Result<Promise<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(Resolver<T>, Rejecter<T>) + Send + 'static,
    {
        let name = self.name.unwrap_or_else(|| DEFAULT_NAME.to_owned());
        let shared = Arc::new(Shared::new(name.clone()));
        let settler = Arc::new(Settler::new(shared.clone()));

        let mut builder = thread::Builder::new().name(name);
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        builder.spawn(move || run(settler, task))?;

        Ok(Promise { shared })
    }
}

fn run<T, F>(settler: Arc<Settler<T>>, task: F)
where
    F: FnOnce(Resolver<T>, Rejecter<T>),
{
    let name = settler.shared().name.clone();
    trace!("promise '{name}' starting");

    let resolver = Resolver::new(settler.clone());
    let rejecter = Rejecter::new(settler.clone());
    // `settler` stays alive across the unwind, so a panic is never mistaken
    // for abandoned handles.
    if let Err(payload) = catch_unwind(AssertUnwindSafe(move || task(resolver, rejecter))) {
        let err = crate::panic::into_error(payload);
        debug!("promise '{name}' task panicked: {err}");
        settler.shared().settle(Outcome::rejected(err));
    }

    trace!("promise '{name}' exiting");
}

#[cfg(test)]
mod tests {
    use super::Promise;
    use crate::Outcome;
    use futures::{
        executor::block_on,
        task::{waker, ArcWake},
        FutureExt,
    };
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            mpsc, Arc,
        },
        task::Context,
    };

    #[derive(Default)]
    struct CountingWaker(AtomicUsize);

    impl ArcWake for CountingWaker {
        fn wake_by_ref(arc_self: &Arc<Self>) {
            arc_self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn declined_try_wait_wakes_parked_future() {
        let (tx, rx) = mpsc::channel();
        let promise = Promise::new(move |resolve, _| tx.send(resolve).unwrap());
        let resolve = rx.recv().unwrap();

        let counter = Arc::new(CountingWaker::default());
        let waker = waker(counter.clone());
        let mut cx = Context::from_waker(&waker);
        let mut settled = promise.settled();

        // Settle and park the future while this caller holds the slot with an
        // empty channel.
        let outcome = promise.shared.try_fill_with(|| {
            let received = promise.shared.try_receive();
            assert!(received.is_none());
            assert!(resolve.resolve(5));
            assert!(settled.poll_unpin(&mut cx).is_pending());
            received
        });
        assert!(outcome.is_none());
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        let outcome = block_on(settled);
        assert_eq!(*outcome, Outcome::resolved(5));
    }
}
