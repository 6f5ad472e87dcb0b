//! Tracing of individual codec records and store operations, compiled in only
//! with the `sharc_debug-trace` feature.

/// Forwards to [`log::trace!`] when the `sharc_debug-trace` feature is enabled,
/// and expands to nothing otherwise.
///
/// # Examples
///
/// ```
/// use sharc_utilities::debug_trace;
///
/// let index = 3;
/// debug_trace!("claimed instance {index}");
/// ```
#[macro_export]
#[cfg(feature = "sharc_debug-trace")]
macro_rules! debug_trace {
    ($($arg:tt)*) => {
        {
            log::trace!($($arg)*);
        }
    };
}

#[macro_export]
#[cfg(not(feature = "sharc_debug-trace"))]
macro_rules! debug_trace {
    ($($arg:tt)*) => {{}};
}
