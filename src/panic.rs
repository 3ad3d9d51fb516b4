use std::{any::Any, error::Error as StdError, io};

use crate::Error;

/// Turn a caught panic payload into the error a promise is rejected with.
///
/// An [`Error`] payload is passed through untouched, as is a boxed error or an
/// `io::Error`. Strings and primitive values are rendered into [`Error::Panicked`].
pub(crate) fn into_error(payload: Box<dyn Any + Send>) -> Error {
    let payload = match payload.downcast::<Error>() {
        Ok(err) => return *err,
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<Box<dyn StdError + Send + Sync>>() {
        Ok(err) => return Error::Rejected(*err),
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<io::Error>() {
        Ok(err) => return Error::Rejected(err),
        Err(payload) => payload,
    };
    Error::Panicked(describe(&*payload))
}

macro_rules! display_any {
    ($payload:expr, $($ty:ty),+ $(,)?) => {
        $(
            if let Some(value) = $payload.downcast_ref::<$ty>() {
                return value.to_string();
            }
        )+
    };
}

fn describe(payload: &(dyn Any + Send)) -> String {
    display_any!(
        payload, &'static str, String, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
        usize, f32, f64, bool, char,
    );
    "Box<dyn Any>".to_owned()
}

#[cfg(test)]
mod tests {
    use super::into_error;
    use crate::Error;
    use std::{
        any::Any,
        io,
        panic::{catch_unwind, AssertUnwindSafe},
    };

    fn payload_of(f: impl FnOnce()) -> Box<dyn Any + Send> {
        catch_unwind(AssertUnwindSafe(f)).unwrap_err()
    }

    #[test]
    fn error_payload_is_unchanged() {
        let err = into_error(payload_of(|| std::panic::panic_any(Error::new("panic"))));
        assert!(matches!(err, Error::Rejected(_)));
        assert_eq!(err.to_string(), "panic");

        let boxed: Box<dyn std::error::Error + Send + Sync> =
            Box::new(io::Error::new(io::ErrorKind::Other, "io panic"));
        let err = into_error(payload_of(move || std::panic::panic_any(boxed)));
        assert_eq!(err.to_string(), "io panic");

        let err = into_error(payload_of(|| {
            std::panic::panic_any(io::Error::new(io::ErrorKind::NotFound, "missing file"))
        }));
        assert!(matches!(err, Error::Rejected(_)));
        assert_eq!(err.to_string(), "missing file");
        let kind = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<io::Error>())
            .map(io::Error::kind);
        assert_eq!(kind, Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn primitive_payload_is_wrapped() {
        let err = into_error(payload_of(|| std::panic::panic_any(100)));
        assert_eq!(err, Error::Panicked("100".into()));
        assert_eq!(err.to_string(), "error: 100");

        let err = into_error(payload_of(|| std::panic::panic_any(1.5f64)));
        assert_eq!(err.to_string(), "error: 1.5");
    }

    #[test]
    fn message_payload_is_wrapped() {
        let err = into_error(payload_of(|| panic!("static message")));
        assert_eq!(err.to_string(), "error: static message");

        let code = 7;
        let err = into_error(payload_of(move || panic!("formatted {code}")));
        assert_eq!(err.to_string(), "error: formatted 7");
    }

    #[test]
    fn opaque_payload() {
        struct Opaque;
        let err = into_error(payload_of(|| std::panic::panic_any(Opaque)));
        assert_eq!(err.to_string(), "error: Box<dyn Any>");
    }
}
