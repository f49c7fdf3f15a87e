//! Fatal internal-error reporting.
//!
//! A `bug!` is an invariant violation in *our* code or in the code handing us
//! values (an unbound variable reaching the solver, a hole surviving past the
//! Horn solver, ...). These are never recoverable at runtime and must fail
//! loudly; "the constraint doesn't hold" is not a bug, it is a `false`.

use std::{fmt, panic::Location};

#[macro_export]
macro_rules! bug {
    () => ( $crate::bug!("impossible case reached") );
    ($msg:expr) => ({ $crate::bug::bug_fmt(::std::format_args!($msg)) });
    ($msg:expr,) => ({ $crate::bug!($msg) });
    ($fmt:expr, $($arg:tt)+) => ({
        $crate::bug::bug_fmt(::std::format_args!($fmt, $($arg)+))
    });
}

#[track_caller]
pub fn bug_fmt(args: fmt::Arguments<'_>) -> ! {
    let location = Location::caller();
    std::panic::panic_any(format!("{location}: internal error: {args}"))
}

#[cfg(test)]
mod tests {
    #[test]
    #[should_panic]
    fn bug_panics() {
        crate::bug!("unreachable state {}", 42);
    }
}
