use crate::Error;

/// The settled state of a promise: a value, an error, or neither.
///
/// Exactly one side is filled by [`Resolver::resolve`](crate::Resolver::resolve)
/// or [`Rejecter::reject`](crate::Rejecter::reject). Rejecting with `None`
/// settles the promise with an outcome equal to `Outcome::default()`.
#[derive(Debug, PartialEq)]
pub struct Outcome<T> {
    value: Option<T>,
    error: Option<Error>,
}

impl<T> Outcome<T> {
    pub fn resolved(value: T) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<Option<Error>>) -> Self {
        Self {
            value: None,
            error: error.into(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }

    /// `true` only when an error is present; a `reject(None)` outcome is
    /// neither resolved nor rejected.
    pub fn is_rejected(&self) -> bool {
        self.error.is_some()
    }

    /// Borrowing view of [`Outcome::into_result`].
    pub fn as_result(&self) -> Result<Option<&T>, &Error> {
        match &self.error {
            Some(err) => Err(err),
            None => Ok(self.value.as_ref()),
        }
    }

    /// Convert into a `Result`, so a rejection can be propagated with `?`.
    ///
    /// The value is `None` for a promise rejected with no error.
    pub fn into_result(self) -> Result<Option<T>, Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }
}

impl<T> Default for Outcome<T> {
    fn default() -> Self {
        Self {
            value: None,
            error: None,
        }
    }
}

impl<T> From<Result<T, Error>> for Outcome<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(value) => Outcome::resolved(value),
            Err(err) => Outcome::rejected(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Outcome;
    use crate::Error;

    #[test]
    fn null_rejection_is_default() {
        let outcome = Outcome::<i32>::rejected(None);
        assert_eq!(outcome, Outcome::default());
        assert!(!outcome.is_resolved());
        assert!(!outcome.is_rejected());
        assert_eq!(outcome.into_result().unwrap(), None);
    }

    #[test]
    fn into_result() {
        assert_eq!(Outcome::resolved(3).into_result().unwrap(), Some(3));
        let err = Outcome::<i32>::rejected(Error::new("nope"))
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn from_result() {
        let outcome: Outcome<&str> = Err(Error::Dropped).into();
        assert_eq!(outcome.error(), Some(&Error::Dropped));
        assert_eq!(outcome.as_result().unwrap_err(), &Error::Dropped);
    }
}
