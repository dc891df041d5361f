use futures::executor::block_on;
use futures::future::{self, BoxFuture, FutureExt};
use reject_error::{pair, poly::{self, Poly}, proxy, reject_error, Adopt, Normalized, Normalizer, Promise};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
struct Boom(&'static str);

struct Binding {
    foo: &'static str,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        panic!("unexpected panic payload")
    }
}

fn throws(_: &(), _: ()) -> Result<String, Boom> {
    Err(Boom("x"))
}

fn panics(_: &(), _: ()) -> Result<String, Boom> {
    panic!("boom")
}

fn rejects(_: &(), _: ()) -> BoxFuture<'static, Result<String, Boom>> {
    async { Err(Boom("later")) }.boxed()
}

fn rejects_with_poly(_: &(), _: ()) -> Normalized<poly::Consumer<String, Boom>> {
    Normalizer::<Poly>::new().call(throws, (), ())
}

async fn explode() -> Result<(), Boom> {
    panic!("inside")
}

fn returns(_: &(), _: ()) -> Result<&'static str, Boom> {
    Ok("foo")
}

fn resolves(_: &(), _: ()) -> future::Ready<Result<&'static str, Boom>> {
    future::ok("foo")
}

fn resolves_later(_: &(), _: ()) -> pair::Consumer<&'static str, Boom> {
    let (producer, consumer) = pair::Producer::new();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        producer.resolve("foo");
    });
    consumer
}

fn this_foo(this: &Option<Binding>, _: ()) -> Result<&'static str, Boom> {
    this.as_ref().map(|binding| binding.foo).ok_or(Boom("no receiver"))
}

fn sum(_: &(), (a, b, c): (i32, i32, i32)) -> Result<i32, Boom> {
    Ok(a + b + c)
}

mod rejections {
    use super::*;

    #[test]
    fn subject_errors() {
        init_tracing();
        let err = block_on(reject_error(throws, (), ())).unwrap_err();
        assert_eq!(err, Boom("x"));
        assert_eq!(err.to_string(), "x");
    }

    #[test]
    fn subject_panics() {
        init_tracing();
        // The panic is captured; only awaiting the promise resumes it.
        let promise = reject_error(panics, (), ());
        let payload = catch_unwind(AssertUnwindSafe(|| block_on(promise))).unwrap_err();
        assert_eq!(panic_message(payload), "boom");
    }

    #[test]
    fn subject_rejects() {
        assert_eq!(block_on(reject_error(rejects, (), ())), Err(Boom("later")));
    }

    #[test]
    fn subject_rejects_with_poly() {
        assert_eq!(block_on(reject_error(rejects_with_poly, (), ())), Err(Boom("x")));
    }

    #[test]
    fn adopted_future_panics() {
        let promise = reject_error(|_, ()| Adopt(explode()), (), ());
        let payload = catch_unwind(AssertUnwindSafe(|| block_on(promise))).unwrap_err();
        assert_eq!(panic_message(payload), "inside");
    }
}

mod resolutions {
    use super::*;

    #[test]
    fn subject_returns() {
        assert_eq!(block_on(reject_error(returns, (), ())), Ok("foo"));
    }

    #[test]
    fn subject_resolves() {
        assert_eq!(block_on(reject_error(resolves, (), ())), Ok("foo"));
    }

    #[test]
    fn subject_resolves_later() {
        init_tracing();
        assert_eq!(block_on(reject_error(resolves_later, (), ())), Ok("foo"));
    }

    #[test]
    fn nesting_is_flattened_once() {
        let promise = reject_error(|_, ()| reject_error(returns, (), ()), (), ());
        assert_eq!(block_on(promise), Ok("foo"));
    }
}

mod bindings {
    use super::*;

    #[test]
    fn missing_receiver_rejects() {
        assert_eq!(block_on(reject_error(this_foo, None, ())), Err(Boom("no receiver")));
    }

    #[test]
    fn uses_correct_this() {
        let binding = Some(Binding { foo: "bar" });
        assert_eq!(block_on(reject_error(this_foo, binding, ())), Ok("bar"));
    }
}

mod arguments {
    use super::*;

    #[test]
    fn passes_all_arguments() {
        assert_eq!(block_on(reject_error(sum, (), (1, 2, 4))), Ok(7));
    }
}

mod proxies {
    use super::*;

    #[test]
    fn subject_errors() {
        assert_eq!(block_on(proxy(throws, ())(())), Err(Boom("x")));
    }

    #[test]
    fn subject_panics() {
        let promise = proxy(panics, ())(());
        let payload = catch_unwind(AssertUnwindSafe(|| block_on(promise))).unwrap_err();
        assert_eq!(panic_message(payload), "boom");
    }

    #[test]
    fn subject_rejects() {
        assert_eq!(block_on(proxy(rejects, ())(())), Err(Boom("later")));
    }

    #[test]
    fn subject_rejects_with_poly() {
        assert_eq!(block_on(proxy(rejects_with_poly, ())(())), Err(Boom("x")));
    }

    #[test]
    fn subject_returns() {
        assert_eq!(block_on(proxy(returns, ())(())), Ok("foo"));
    }

    #[test]
    fn subject_resolves() {
        assert_eq!(block_on(proxy(resolves, ())(())), Ok("foo"));
        assert_eq!(block_on(proxy(resolves_later, ())(())), Ok("foo"));
    }

    #[test]
    fn missing_receiver_rejects() {
        assert_eq!(block_on(proxy(this_foo, None)(())), Err(Boom("no receiver")));
    }

    #[test]
    fn uses_correct_this() {
        let foo = proxy(this_foo, Some(Binding { foo: "bar" }));
        assert_eq!(block_on(foo(())), Ok("bar"));
        assert_eq!(block_on(foo(())), Ok("bar"));
    }

    #[test]
    fn passes_all_arguments() {
        let add = proxy(sum, ());
        assert_eq!(block_on(add((1, 2, 4))), Ok(7));
        assert_eq!(block_on(add((3, 3, 3))), Ok(9));
    }

    #[test]
    fn calls_are_independent() {
        let flaky = proxy(
            |_: &(), fail: bool| if fail { Err(Boom("x")) } else { Ok(1) },
            (),
        );
        let failed = flaky(true);
        let ok = flaky(false);
        assert_eq!(block_on(ok), Ok(1));
        assert_eq!(block_on(failed), Err(Boom("x")));
    }
}

mod backends {
    use super::*;

    #[test]
    fn uses_the_provided_backend() {
        let promise = Normalizer::<Poly>::new().call(returns, (), ());
        assert!((&promise as &dyn Any).is::<Normalized<poly::Consumer<&'static str, Boom>>>());
        assert!(!(&promise as &dyn Any).is::<Normalized<pair::Consumer<&'static str, Boom>>>());
        assert_eq!(*block_on(promise), Ok("foo"));
    }

    #[test]
    fn uses_the_provided_backend_for_rejections() {
        let promise = Normalizer::<Poly>::new().call(throws, (), ());
        assert!((&promise as &dyn Any).is::<Normalized<poly::Consumer<String, Boom>>>());
        assert_eq!(*block_on(promise), Err(Boom("x")));
    }

    #[test]
    fn provided_backend_proxies() {
        let add = Normalizer::<Poly>::new().proxy(sum, ());
        let promise = add((1, 2, 4));
        let again = promise.clone();
        assert_eq!(*block_on(promise), Ok(7));
        assert_eq!(*block_on(again), Ok(7));
    }

    #[test]
    fn provided_backend_adopts_across_threads() {
        let promise = Normalizer::<Poly>::new().call(resolves_later, (), ());
        let again = promise.clone();
        let task = thread::spawn(move || block_on(again));
        assert_eq!(*block_on(promise), Ok("foo"));
        assert_eq!(*task.join().expect("The task thread has panicked"), Ok("foo"));
    }

    #[test]
    fn default_backend_is_pair() {
        let promise = Normalizer::<pair::Pair>::default().call(returns, (), ());
        assert!((&promise as &dyn Any).is::<Normalized<pair::Consumer<&'static str, Boom>>>());
    }
}
