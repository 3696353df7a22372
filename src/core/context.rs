//! Context provides cancellation for long-running loops, similar to Golang's Context.

use std::{
    ops::Deref,
    sync::{Arc, Condvar, Mutex, MutexGuard},
    time::Duration,
};

#[derive(Clone, Debug)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn new() -> Self {
        Context {
            inner: Arc::new(ContextInner::new()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Context {
    type Target = ContextInner;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

#[derive(Debug)]
pub struct ContextInner {
    cancelled: Mutex<bool>,
    cv: Condvar,
}

impl ContextInner {
    fn new() -> Self {
        ContextInner {
            cancelled: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    // A poisoned flag still holds a meaningful bool; keep using it.
    fn flag(&self) -> MutexGuard<'_, bool> {
        self.cancelled.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Cancel the context, waking every waiter.
    pub fn cancel(&self) {
        let mut g = self.flag();
        *g = true;
        self.cv.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag()
    }

    /// Wait until the duration expires, or the context is cancelled.
    /// Returns true if the context has been cancelled.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let g = self.flag();
        match self.cv.wait_timeout_while(g, duration, |g| !*g) {
            Ok((v, _)) => *v,
            Err(p) => *p.into_inner().0,
        }
    }
}
