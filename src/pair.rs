use std::sync::{Arc, Mutex};
use std::{future::Future, task::{Poll, Waker}};

use tracing::debug;

use crate::{Backend, Error, Panic, Promise, WakerState};

/// The default backend. A `pair::Producer` promise can only have one
/// consumer, and the consumer returns a `Result<T, E>`.
///
/// # Examples
///
/// ```
/// use reject_error::{Promise, pair::Producer};
/// use futures::executor::block_on;
/// use std::thread;
/// let (promise, consumer) = Producer::<String, ()>::new();
///
/// let task1 = thread::spawn(move || block_on(async {
///     assert_eq!(consumer.await, Ok("Hi".to_string()));
/// }));
/// promise.resolve("Hi".into());
/// task1.join().expect("The task1 thread has panicked.");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Pair;

impl Backend for Pair {
    type Producer<T, E> = Producer<T, E>;
}

#[derive(Debug)]
pub struct Producer<T, E> {
    promise: Arc<Mutex<Inner<T, E>>>,
}

#[derive(Debug)]
pub struct Consumer<T, E> {
    promise: Arc<Mutex<Inner<T, E>>>,
}

#[derive(Debug)]
enum Settled<T, E> {
    Value(Result<T, E>),
    Panicked(Panic),
}

#[derive(Debug)]
struct Inner<T, E> {
    value: Option<Settled<T, E>>,
    waker: Result<Waker, WakerState>,
}

impl<T, E> Producer<T, E> {
    fn settle(self, value: Settled<T, E>) {
        let mut promise = self.promise.lock().unwrap();
        promise.value = Some(value);
        if let Ok(waker) = std::mem::replace(&mut promise.waker, Err(WakerState::Tainted)) {
            waker.wake()
        }
    }
}

impl<T, E> Promise for Producer<T, E> {
    type Output = T;
    type Error = E;
    type Waiter = Consumer<T, E>;

    ///promiseOut.resolve
    ///
    /// # Examples
    ///
    /// ```
    /// use reject_error::pair::Producer;
    /// use reject_error::Promise;
    /// use futures::executor::block_on;
    /// use std::thread;
    /// let (op, op_a) = Producer::<String, ()>::new();
    /// let task1 = thread::spawn(move || block_on(async {
    ///     assert_eq!(op_a.await.unwrap(), "🍓");
    /// }));
    /// let task2 = thread::spawn(move || op.resolve(String::from("🍓")));
    /// task1.join().expect("The task1 thread has panicked");
    /// task2.join().expect("The task2 thread has panicked");
    /// ```
    fn resolve(self, value: T) {
        self.settle(Settled::Value(Ok(value)))
    }

    ///promiseOut.reject
    ///
    /// # Examples
    ///
    /// ```
    /// use reject_error::pair::Producer;
    /// use reject_error::Promise;
    /// use futures::executor::block_on;
    /// use std::thread;
    /// let (op, op_a) = Producer::<(), String>::new();
    /// let task1 = thread::spawn(move || block_on(async {
    ///     assert_eq!(op_a.await, Err(String::from("💥")));
    /// }));
    /// let task2 = thread::spawn(move || op.reject(String::from("💥")));
    /// task1.join().expect("The task1 thread has panicked");
    /// task2.join().expect("The task2 thread has panicked");
    /// ```
    fn reject(self, err: E) {
        self.settle(Settled::Value(Err(err)))
    }

    fn panic(self, panic: Panic) {
        self.settle(Settled::Panicked(panic))
    }

    fn new() -> (Self, Consumer<T, E>) {
        let inner = Arc::new(Mutex::new(Inner {
                value: None,
                waker: Err(WakerState::Fresh),
            }));
        (Self { promise: inner.clone() }, Consumer { promise: inner })
    }
}

impl<T, E> Drop for Producer<T, E> {
    /// If this is an unsettled producer, wake the consumer so it can observe
    /// the broken promise.
    fn drop(&mut self) {
        let mut promise = self.promise.lock().unwrap();
        if let Ok(waker) = std::mem::replace(&mut promise.waker, Err(WakerState::Tainted)) {
            debug!("pair producer dropped before settling");
            waker.wake()
        }
    }
}

impl<T, E> Future for Consumer<T, E> {
    type Output = Result<T, E>;

    /// # Panics
    ///
    /// Resumes the panic the promise was settled with, or panics with
    /// [`Error::ProducerDropped`] if the producer went away unsettled.
    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let settled = {
            let mut promise = self.promise.lock().unwrap();
            match promise.value.take() {
                Some(settled) => Some(settled),
                None => match std::mem::replace(&mut promise.waker, Ok(cx.waker().clone())) {
                    Err(WakerState::Tainted) => None,
                    _ => return Poll::Pending,
                },
            }
        };
        match settled {
            Some(Settled::Value(value)) => Poll::Ready(value),
            Some(Settled::Panicked(panic)) => panic.resume(),
            None => std::panic::panic_any(Error::ProducerDropped),
        }
    }
}
