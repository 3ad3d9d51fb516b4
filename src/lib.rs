//! Thread-backed promises.
//!
//! [`Promise::new`] starts a task on its own thread and returns right away.
//! The task receives a [`Resolver`] and a [`Rejecter`]; the first call to
//! either settles the promise and every later call is ignored. A panic inside
//! the task rejects the promise instead of tearing down the caller.
//!
//! Outcomes are retrieved with [`Promise::wait`] (or awaited through
//! [`Promise::settled`]), with [`wait_all`] for several promises in order, or
//! with [`any`] for whichever settles first. Failures are never raised at the
//! retrieval boundary: they come back as the error side of an [`Outcome`].
//!
//! ```
//! use std::{thread, time::Duration};
//! use threaded_promise::{any, wait_all, Error, Promise};
//!
//! let slow = Promise::new(|resolve, _| {
//!     thread::sleep(Duration::from_millis(100));
//!     resolve.resolve("slow");
//! });
//! let fast = Promise::new(|resolve, _| {
//!     thread::sleep(Duration::from_millis(10));
//!     resolve.resolve("fast");
//! });
//! let failing = Promise::new(|_, reject| {
//!     thread::sleep(Duration::from_millis(50));
//!     reject.reject(Error::new("some error"));
//! });
//!
//! let first = any([&slow, &fast, &failing]).unwrap();
//! assert_eq!(first.value(), Some(&"fast"));
//!
//! let all = wait_all([&slow, &fast, &failing]);
//! assert_eq!(all[0].value(), Some(&"slow"));
//! assert_eq!(all[1].value(), Some(&"fast"));
//! assert_eq!(all[2].error().unwrap().to_string(), "some error");
//! ```

mod combinator;
mod error;
mod latch;
mod outcome;
mod panic;
mod promise;
mod settle;

pub use combinator::{any, try_any, wait_all};
pub use error::Error;
pub use outcome::Outcome;
pub use promise::{Builder, Promise, Settled};
pub use settle::{Rejecter, Resolver};
