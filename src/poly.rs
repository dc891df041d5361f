use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex};
use std::{future::Future, task::{Poll, Waker}};

use tracing::debug;

use crate::{Backend, Error, Panic, Promise};

/// The alternative backend. A `poly::Producer` promise can have many
/// consumers, which may be cloned. The consumers return an `Arc<Result<T, E>>`.
///
/// # Examples
///
/// ```
/// use reject_error::{Promise, poly::Producer};
/// use futures::executor::block_on;
/// use std::thread;
/// let (promise, consumer) = Producer::<String, String>::new();
/// let consumer2 = consumer.clone();
/// let task1 = thread::spawn(move || block_on(async {
///     assert_eq!(*consumer.await, Ok("Hi".to_string()));
/// }));
/// let task2 = thread::spawn(move || block_on(async {
///     assert_eq!(*consumer2.await, Ok("Hi".to_string()));
/// }));
/// promise.resolve("Hi".into());
/// task1.join().expect("The task1 thread has panicked.");
/// task2.join().expect("The task2 thread has panicked.");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Poly;

impl Backend for Poly {
    type Producer<T, E> = Producer<T, E>;
}

#[derive(Debug)]
pub struct Producer<T, E> {
    promise: Arc<Mutex<Inner<T, E>>>,
}

pub struct Consumer<T, E> {
    promise: Arc<Mutex<Inner<T, E>>>,
}

#[derive(Debug)]
enum State<T, E> {
    Pending,
    Settled(Arc<Result<T, E>>),
    Panicked(Arc<Panic>),
    Abandoned,
}

#[derive(Debug)]
struct Inner<T, E> {
    state: State<T, E>,
    waker: Vec<Waker>, // Every consumer keeps its own waker; waking only the
                       // last one leaves the other clones hanging.
}

impl<T, E> Producer<T, E> {
    fn settle(&self, state: State<T, E>) {
        let mut promise = self.promise.lock().unwrap();
        promise.state = state;
        for waker in promise.waker.drain(..) {
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
    /// use reject_error::{Promise, poly::Producer};
    /// use futures::executor::block_on;
    /// use std::thread;
    /// let (op, op_a) = Producer::<String, ()>::new();
    /// let task1 = thread::spawn(move || block_on(async {
    ///     assert_eq!(*op_a.await, Ok(String::from("🍓")));
    /// }));
    /// let task2 = thread::spawn(move || op.resolve(String::from("🍓")));
    /// task1.join().expect("The task1 thread has panicked");
    /// task2.join().expect("The task2 thread has panicked");
    /// ```
    fn resolve(self, value: T) {
        self.settle(State::Settled(Arc::new(Ok(value))))
    }

    ///promiseOut.reject
    fn reject(self, err: E) {
        self.settle(State::Settled(Arc::new(Err(err))))
    }

    fn panic(self, panic: Panic) {
        self.settle(State::Panicked(Arc::new(panic)))
    }

    /// promise.new
    ///
    /// This is a slight fib because we're not returning Self alone. We're
    /// also returning a Consumer<T, E> which you can wait on.
    fn new() -> (Self, Self::Waiter) {
        let producer = Self {
                            promise: Arc::new(Mutex::new(Inner {
                                state: State::Pending,
                                waker: vec![],
                            })),
                        };
        let consumer = Consumer { promise: producer.promise.clone() };
        (producer, consumer)
    }
}

impl<T, E> Drop for Producer<T, E> {
    fn drop(&mut self) {
        let mut promise = self.promise.lock().unwrap();
        if let State::Pending = promise.state {
            debug!("poly producer dropped before settling");
            promise.state = State::Abandoned;
            for waker in promise.waker.drain(..) {
                waker.wake()
            }
        }
    }
}

impl<T, E> Clone for Consumer<T, E> {
    fn clone(&self) -> Self {
        Self { promise: self.promise.clone() }
    }
}

impl<T: Debug, E: Debug> Debug for Consumer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("promise", &self.promise).finish()
    }
}

impl<T, E> Future for Consumer<T, E> {
    type Output = Arc<Result<T, E>>;

    /// # Panics
    ///
    /// Resumes the panic the promise was settled with. Only the first
    /// consumer to observe it gets the original payload; the rest unwind with
    /// [`Error::Panicked`]. Panics with [`Error::ProducerDropped`] if the
    /// producer went away unsettled.
    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let panic = {
            let mut guard = self.promise.lock().unwrap();
            let promise = &mut *guard;
            match promise.state {
                State::Settled(ref value) => return Poll::Ready(value.clone()),
                State::Panicked(ref panic) => Some(panic.clone()),
                State::Abandoned => None,
                State::Pending => {
                    if !promise.waker.iter().any(|w| w.will_wake(cx.waker())) {
                        promise.waker.push(cx.waker().clone());
                    }
                    return Poll::Pending;
                }
            }
        };
        match panic {
            Some(panic) => panic.resume(),
            None => std::panic::panic_any(Error::ProducerDropped),
        }
    }
}
