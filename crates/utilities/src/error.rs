use core::error::Error;
use core::fmt::Debug;
use core::fmt::Display;

/// The error type of the SHARC crates.
///
/// Any type implementing [`Error`] converts into it through the blanket
/// [`From`] implementation, as do string messages, so `?` can be used
/// throughout. A backtrace is captured when the error is created and printed
/// by the [`Debug`] implementation.
pub struct SharcError {
    inner: Box<InnerSharcError>,
}

impl SharcError {
    /// Returns the underlying error when it has type `E`.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.inner.error.downcast_ref::<E>()
    }

    /// Returns true when the underlying error has type `E`.
    pub fn is<E: Error + 'static>(&self) -> bool {
        self.inner.error.is::<E>()
    }
}

/// Keeps [`SharcError`] a thin pointer, so `Result<T, SharcError>` stays small.
struct InnerSharcError {
    error: Box<dyn Error + Send + Sync + 'static>,
    backtrace: std::backtrace::Backtrace,
}

// Covers From<&str> and From<String> as well.
impl<E> From<E> for SharcError
where
    Box<dyn Error + Send + Sync + 'static>: From<E>,
{
    #[cold]
    fn from(error: E) -> Self {
        SharcError {
            inner: Box::new(InnerSharcError {
                error: error.into(),
                backtrace: std::backtrace::Backtrace::capture(),
            }),
        }
    }
}

impl Display for SharcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.inner.error)
    }
}

impl Debug for SharcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self.inner.error)?;

        let backtrace = &self.inner.backtrace;
        if let std::backtrace::BacktraceStatus::Captured = backtrace.status() {
            writeln!(f, "{backtrace}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn failing_read() -> Result<(), SharcError> {
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended early"))?;
        Ok(())
    }

    #[test]
    fn test_error_conversion() {
        let error = failing_read().unwrap_err();
        assert!(error.is::<io::Error>());
        assert_eq!(
            error.downcast_ref::<io::Error>().map(|e| e.kind()),
            Some(io::ErrorKind::UnexpectedEof)
        );
        assert_eq!(error.to_string(), "stream ended early");

        let message: SharcError = "invalid header".into();
        assert_eq!(message.to_string(), "invalid header");
    }
}
