//! Recovery helpers for runtime degeneracies.
//!
//! The flight-control core never fails at runtime: a missing lookup, a
//! dangling reference or a degenerate numeric condition is logged and the
//! affected path falls back to a neutral or latched value.

/// Evaluates to the unwrapped value of an `Option`/`Result` expression,
/// or logs the expectation and evaluates the fallback control-flow arm.
#[macro_export]
macro_rules! try_log {
    (
        $expr:expr,
        expect $must:literal $(
            (
                $($must_args:expr),* $(,)?
            )
        )?
        or $never:expr
    ) => {
        {
            if let Some(value) = $crate::try_log::TryLog::convert_or_log(
                $expr,
                format_args!($must, $($($must_args),*)?),
            ) {
                value
            } else {
                $never
            }
        }
    }
}

pub use try_log;

/// Like [`try_log!`] with a bare `return` fallback.
#[macro_export]
macro_rules! try_log_return {
    ($expr:expr, expect $must:literal $(, $($must_args:expr),*)? $(,)?) => {
        $crate::try_log!($expr, expect $must $(($($must_args),*))? or return)
    }
}

pub use try_log_return;

/// Conversion of fallible expressions into `Option` with logging.
pub trait TryLog {
    type Output;

    fn convert_or_log(self, must: std::fmt::Arguments<'_>) -> Option<Self::Output>;
}

impl<T> TryLog for Option<T> {
    type Output = T;

    fn convert_or_log(self, must: std::fmt::Arguments<'_>) -> Option<T> {
        if self.is_none() {
            bevy::log::error!("Expected {must}");
        }
        self
    }
}

impl<T, E: std::fmt::Display> TryLog for Result<T, E> {
    type Output = T;

    fn convert_or_log(self, must: std::fmt::Arguments<'_>) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                bevy::log::error!("Expected {must}: {err}");
                None
            }
        }
    }
}
