use std::error::Error as StdError;

/// Why a promise was rejected.
///
/// Errors are carried inside an [`Outcome`](crate::Outcome); retrieving a
/// rejected promise never panics.
///
/// A task that panics with an `Error`, a `Box<dyn std::error::Error + Send +
/// Sync>` or an `io::Error` (via `std::panic::panic_any`) is rejected with
/// that error and its message. Any other error type is not recognised as one
/// and ends up as [`Error::Panicked`]; box it first to keep its message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failure handed to [`Rejecter::reject`](crate::Rejecter::reject), or an
    /// error value the task panicked with.
    #[error("{0}")]
    Rejected(Box<dyn StdError + Send + Sync>),
    /// The task panicked with a payload that is not an error.
    #[error("error: {0}")]
    Panicked(String),
    /// Every resolver and rejecter was dropped without settling.
    #[error("promise dropped without being settled")]
    Dropped,
}

impl Error {
    /// Wrap anything that converts into a boxed error, including `&str` and
    /// `String` messages.
    ///
    /// ```
    /// use threaded_promise::Error;
    ///
    /// let err = Error::new("some error");
    /// assert_eq!(err.to_string(), "some error");
    /// ```
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error::Rejected(err.into())
    }

    /// The rejection reason supplied by the task, if any.
    pub fn get_ref(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Error::Rejected(inner) => Some(&**inner),
            _ => None,
        }
    }
}

/// Errors compare by their rendered message.
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use std::io;

    #[test]
    fn rejected_keeps_message() {
        let err = Error::new(io::Error::new(io::ErrorKind::Other, "disk gone"));
        assert_eq!(err.to_string(), "disk gone");
        assert!(err.get_ref().is_some());
    }

    #[test]
    fn panicked_is_prefixed() {
        assert_eq!(Error::Panicked("100".into()).to_string(), "error: 100");
        assert!(Error::Panicked("100".into()).get_ref().is_none());
    }

    #[test]
    fn compares_by_message() {
        assert_eq!(Error::new("error: 1"), Error::Panicked("1".into()));
        assert_ne!(Error::new("a"), Error::Dropped);
    }
}
