//! The resolve/reject pair handed to a promise's task.
use std::{fmt, sync::Arc};

use log::warn;

use crate::{promise::Shared, Error, Outcome};

/// Shared by every resolver and rejecter of one promise, plus the background
/// thread. Dropping the last one without settling rejects with
/// [`Error::Dropped`].
pub(crate) struct Settler<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Settler<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &Shared<T> {
        &self.shared
    }
}

impl<T> Drop for Settler<T> {
    fn drop(&mut self) {
        if !self.shared.is_settling() {
            warn!("promise '{}' dropped without being settled", self.shared.name);
            self.shared.settle(Outcome::rejected(Error::Dropped));
        }
    }
}

/// Settles a promise with a value.
///
/// Resolvers may be cloned and sent to other threads. Only the first resolve
/// or reject call across all of them has any effect.
pub struct Resolver<T> {
    settler: Arc<Settler<T>>,
}

impl<T> Resolver<T> {
    pub(crate) fn new(settler: Arc<Settler<T>>) -> Self {
        Self { settler }
    }

    /// Returns `true` if this call settled the promise, `false` if it had
    /// already been settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settler.shared.settle(Outcome::resolved(value))
    }
}

/// Settles a promise with an error.
pub struct Rejecter<T> {
    settler: Arc<Settler<T>>,
}

impl<T> Rejecter<T> {
    pub(crate) fn new(settler: Arc<Settler<T>>) -> Self {
        Self { settler }
    }

    /// Reject with `err`. Passing `None` still settles the promise, leaving
    /// both sides of the outcome empty.
    ///
    /// Returns `true` if this call settled the promise.
    pub fn reject(&self, err: impl Into<Option<Error>>) -> bool {
        self.settler.shared.settle(Outcome::rejected(err))
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self::new(self.settler.clone())
    }
}

impl<T> Clone for Rejecter<T> {
    fn clone(&self) -> Self {
        Self::new(self.settler.clone())
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resolver")
            .field(&self.settler.shared.name)
            .finish()
    }
}

impl<T> fmt::Debug for Rejecter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rejecter")
            .field(&self.settler.shared.name)
            .finish()
    }
}
