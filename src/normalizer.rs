use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, trace, trace_span};

use crate::{pair::Pair, Backend, Panic, Promise, Settlement, Thenable};

/// The waiter type a [`Normalizer`] on backend `B` hands out.
pub type Waiter<B, T, E> = <<B as Backend>::Producer<T, E> as Promise>::Waiter;

/// Turns callables into promises built by backend `B`.
///
/// The backend is fixed when the normalizer is constructed; pick
/// [`poly::Poly`](crate::poly::Poly) for promises that can be awaited from
/// several places at once.
///
/// ```
/// use futures::executor::block_on;
/// use reject_error::{poly::Poly, Normalizer};
///
/// let promise = Normalizer::<Poly>::new().call(|_, ()| Ok::<_, ()>("foo"), (), ());
/// let other = promise.clone();
/// assert_eq!(*block_on(promise), Ok("foo"));
/// assert_eq!(*block_on(other), Ok("foo"));
/// ```
pub struct Normalizer<B = Pair> {
    backend: PhantomData<fn() -> B>,
}

impl<B> Normalizer<B> {
    pub const fn new() -> Self {
        Self { backend: PhantomData }
    }
}

impl<B> Clone for Normalizer<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for Normalizer<B> {}

impl<B> Default for Normalizer<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> fmt::Debug for Normalizer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer")
            .field("backend", &std::any::type_name::<B>())
            .finish()
    }
}

impl<B: Backend> Normalizer<B> {
    /// Invoke `func` with `this` and `args`.
    ///
    /// Never unwinds: an `Err` return rejects the promise, a panic is resumed
    /// when the promise is awaited, and a returned future is adopted.
    pub fn call<F, R, A, O>(
        self,
        func: F,
        this: R,
        args: A,
    ) -> Normalized<Waiter<B, O::Output, O::Error>>
    where
        F: FnOnce(&R, A) -> O,
        O: Thenable,
        B::Producer<O::Output, O::Error>: Send + 'static,
    {
        self.invoke(move || func(&this, args))
    }

    /// Bind `func` to `this`. Every call of the returned function behaves
    /// like [`Normalizer::call`] with the bound receiver.
    pub fn proxy<F, R, A, O>(
        self,
        func: F,
        this: R,
    ) -> impl Fn(A) -> Normalized<Waiter<B, O::Output, O::Error>>
    where
        F: Fn(&R, A) -> O,
        O: Thenable,
        B::Producer<O::Output, O::Error>: Send + 'static,
    {
        move |args| self.invoke(|| func(&this, args))
    }

    fn invoke<O>(self, body: impl FnOnce() -> O) -> Normalized<Waiter<B, O::Output, O::Error>>
    where
        O: Thenable,
        B::Producer<O::Output, O::Error>: Send + 'static,
    {
        let span = trace_span!("reject_error", backend = std::any::type_name::<B>());
        let _enter = span.enter();

        let (producer, waiter) = <B::Producer<O::Output, O::Error> as Promise>::new();
        let driver = match catch_unwind(AssertUnwindSafe(|| body().into_settlement())) {
            Ok(Settlement::Ready(Ok(value))) => {
                trace!("callable fulfilled synchronously");
                producer.resolve(value);
                None
            }
            Ok(Settlement::Ready(Err(err))) => {
                trace!("callable rejected synchronously");
                producer.reject(err);
                None
            }
            Ok(Settlement::Pending(future)) => {
                trace!("adopting the future returned by the callable");
                Some(adopt(producer, future))
            }
            Err(payload) => {
                debug!("callable panicked, resuming when the promise is awaited");
                producer.panic(Panic::new(payload));
                None
            }
        };
        Normalized { driver, waiter }
    }
}

fn adopt<P>(
    producer: P,
    future: BoxFuture<'static, Result<P::Output, P::Error>>,
) -> Shared<BoxFuture<'static, ()>>
where
    P: Promise + Send + 'static,
    P::Output: Send + 'static,
    P::Error: Send + 'static,
{
    async move {
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(value)) => producer.resolve(value),
            Ok(Err(err)) => producer.reject(err),
            Err(payload) => {
                debug!("adopted future panicked");
                producer.panic(Panic::new(payload))
            }
        }
    }
    .boxed()
    .shared()
}

/// A promise returned by [`Normalizer::call`] and its proxies.
///
/// When the callable returned a future, polling this drives that future and
/// settles `waiter` with its outcome. Clones (for backends whose waiter is
/// `Clone`) share the same adopted future.
#[derive(Clone)]
pub struct Normalized<W> {
    driver: Option<Shared<BoxFuture<'static, ()>>>,
    waiter: W,
}

impl<W> Normalized<W> {
    /// Whether an adopted future still has to be driven to completion.
    pub fn is_adopting(&self) -> bool {
        self.driver.is_some()
    }
}

impl<W: fmt::Debug> fmt::Debug for Normalized<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalized")
            .field("adopting", &self.is_adopting())
            .field("waiter", &self.waiter)
            .finish()
    }
}

impl<W: Future + Unpin> Future for Normalized<W> {
    type Output = W::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(driver) = this.driver.as_mut() {
            if driver.poll_unpin(cx).is_ready() {
                this.driver = None;
            }
        }
        this.waiter.poll_unpin(cx)
    }
}
