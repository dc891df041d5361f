//! What a callable may hand back to the normalizer.
//!
//! A [`Result`] is settled on the spot; anything future-like is adopted, and
//! its eventual outcome becomes the outcome of the normalized promise.
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Ready};

use crate::{pair, poly, Normalized};

pub enum Settlement<T, E> {
    Ready(Result<T, E>),
    Pending(BoxFuture<'static, Result<T, E>>),
}

pub trait Thenable {
    type Output: Send + 'static;
    type Error: Send + 'static;

    fn into_settlement(self) -> Settlement<Self::Output, Self::Error>;
}

/// Adopts an arbitrary future resolving to a `Result`.
///
/// ```
/// use futures::executor::block_on;
/// use reject_error::{reject_error, Adopt};
///
/// fn subject(_: &(), _: ()) -> Adopt<impl std::future::Future<Output = Result<u8, ()>>> {
///     Adopt(async { Err(()) })
/// }
/// assert_eq!(block_on(reject_error(subject, (), ())), Err(()));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Adopt<F>(pub F);

/// Flattens a promise output into a plain `Result`.
pub trait IntoResult {
    type Ok;
    type Err;

    fn into_result(self) -> Result<Self::Ok, Self::Err>;
}

impl<T, E> IntoResult for Result<T, E> {
    type Ok = T;
    type Err = E;

    fn into_result(self) -> Result<T, E> {
        self
    }
}

impl<T: Clone, E: Clone> IntoResult for Arc<Result<T, E>> {
    type Ok = T;
    type Err = E;

    fn into_result(self) -> Result<T, E> {
        Arc::try_unwrap(self).unwrap_or_else(|shared| (*shared).clone())
    }
}

impl<T, E> Thenable for Result<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;

    fn into_settlement(self) -> Settlement<T, E> {
        Settlement::Ready(self)
    }
}

impl<T, E> Thenable for Ready<Result<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;

    fn into_settlement(self) -> Settlement<T, E> {
        Settlement::Ready(self.into_inner())
    }
}

impl<T, E> Thenable for BoxFuture<'static, Result<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;

    fn into_settlement(self) -> Settlement<T, E> {
        Settlement::Pending(self)
    }
}

impl<F, T, E> Thenable for Adopt<F>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;

    fn into_settlement(self) -> Settlement<T, E> {
        Settlement::Pending(self.0.boxed())
    }
}

impl<T, E> Thenable for pair::Consumer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;

    fn into_settlement(self) -> Settlement<T, E> {
        Settlement::Pending(self.boxed())
    }
}

impl<T, E> Thenable for poly::Consumer<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = T;
    type Error = E;

    fn into_settlement(self) -> Settlement<T, E> {
        Settlement::Pending(self.map(IntoResult::into_result).boxed())
    }
}

impl<W> Thenable for Normalized<W>
where
    W: Future + Unpin + Send + 'static,
    W::Output: IntoResult,
    <W::Output as IntoResult>::Ok: Send + 'static,
    <W::Output as IntoResult>::Err: Send + 'static,
{
    type Output = <W::Output as IntoResult>::Ok;
    type Error = <W::Output as IntoResult>::Err;

    fn into_settlement(self) -> Settlement<Self::Output, Self::Error> {
        Settlement::Pending(self.map(IntoResult::into_result).boxed())
    }
}
