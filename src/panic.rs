use std::any::Any;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::Error;

/// A panic captured while invoking a callable or polling the future it
/// returned.
///
/// The original payload is handed back exactly once by [`Panic::resume`].
/// Any later resume (a cloned `poly` consumer, for instance) unwinds with
/// [`Error::Panicked`] carrying the panic message instead.
pub struct Panic {
    message: String,
    payload: Mutex<Option<Box<dyn Any + Send>>>,
}

impl Panic {
    pub fn new(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_owned()
        };
        Self {
            message,
            payload: Mutex::new(Some(payload)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Continue unwinding with the captured payload.
    pub fn resume(&self) -> ! {
        let payload = self
            .payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match payload {
            Some(payload) => std::panic::resume_unwind(payload),
            None => std::panic::resume_unwind(Box::new(Error::Panicked(self.message.clone()))),
        }
    }
}

impl fmt::Debug for Panic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panic").field("message", &self.message).finish()
    }
}
