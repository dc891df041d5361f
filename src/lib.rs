//! Strong guarantee to return a promise.
//!
//! [`reject_error`] invokes any callable and hands back a future that settles
//! to the callable's outcome, whether it returned a value, returned an error,
//! returned a future of its own or panicked. [`proxy`] binds a callable ahead
//! of time into a function with the same guarantee.
//!
//! ```
//! use futures::executor::block_on;
//!
//! fn subject(_: &(), (a, b, c): (i32, i32, i32)) -> Result<i32, String> {
//!     Ok(a + b + c)
//! }
//!
//! assert_eq!(block_on(reject_error::reject_error(subject, (), (1, 2, 4))), Ok(7));
//!
//! let add = reject_error::proxy(subject, ());
//! assert_eq!(block_on(add((1, 2, 4))), Ok(7));
//! ```
use std::future::Future;

pub mod normalizer;
pub mod pair;
mod panic;
pub mod poly;
pub mod thenable;

pub use normalizer::{Normalized, Normalizer, Waiter};
pub use panic::Panic;
pub use thenable::{Adopt, IntoResult, Settlement, Thenable};

/// Failures raised by the promise backends themselves. Errors produced by a
/// callable are never converted into this type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("the producer was dropped before it settled")]
    ProducerDropped,
    #[error("the callable panicked: {0}")]
    Panicked(String),
}

#[derive(Debug)]
enum WakerState {
    Fresh,
    Tainted,
}

/// The producer half of a promise. Settling consumes the producer, so a
/// promise settles at most once.
pub trait Promise: Sized {
    type Output;
    type Error;
    type Waiter: Future + Unpin;

    fn new() -> (Self, Self::Waiter);
    fn resolve(self, value: Self::Output);
    fn reject(self, err: Self::Error);
    /// Settle with a captured panic, which is resumed on the waiting side.
    fn panic(self, panic: Panic);
}

/// Selects the promise implementation a [`Normalizer`] builds its results
/// with.
pub trait Backend {
    type Producer<T, E>: Promise<Output = T, Error = E>;
}

/// Invoke `func` with `this` and `args`, returning a promise on the default
/// [`pair`] backend.
///
/// Pass `()` as `this` when the callable needs no receiver, and a tuple as
/// `args`.
pub fn reject_error<F, R, A, O>(
    func: F,
    this: R,
    args: A,
) -> Normalized<pair::Consumer<O::Output, O::Error>>
where
    F: FnOnce(&R, A) -> O,
    O: Thenable,
{
    Normalizer::<pair::Pair>::new().call(func, this, args)
}

/// Bind `func` to `this`, returning a function with the same guarantee as
/// [`reject_error`].
pub fn proxy<F, R, A, O>(
    func: F,
    this: R,
) -> impl Fn(A) -> Normalized<pair::Consumer<O::Output, O::Error>>
where
    F: Fn(&R, A) -> O,
    O: Thenable,
{
    Normalizer::<pair::Pair>::new().proxy(func, this)
}
