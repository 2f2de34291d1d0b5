//! The context value itself

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{self, BoxFuture, FutureExt};

use crate::cancel::{self, CancelHandle, CancelSignal, Cancelled};

type Value = Arc<dyn Any + Send + Sync>;

/// An immutable, cheaply cloned call context
///
/// Every `with_*` method returns a new child context and leaves `self`
/// untouched. Children share cancellation with their parents: cancelling a
/// parent is observed by all contexts derived from it.
#[derive(Clone, Default)]
pub struct Context {
    /// Environment overrides set through [`Context::with_env`]
    env: Arc<BTreeMap<String, String>>,
    /// Typed values keyed by their type
    values: Arc<HashMap<TypeId, Value>>,
    /// Cancellation signals inherited from every ancestor
    signals: Arc<Vec<CancelSignal>>,
    /// Earliest deadline along the ancestor chain
    deadline: Option<Instant>,
}

impl Context {
    /// The root context: no overrides, no values, never cancelled
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context with `key` set to `value` in the environment store
    pub fn with_env(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut env = (*self.env).clone();
        env.insert(key.into(), value.into());
        Self {
            env: Arc::new(env),
            ..self.clone()
        }
    }

    /// Derive a context carrying `value`, replacing any value of the same type
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        let mut values = (*self.values).clone();
        values.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            values: Arc::new(values),
            ..self.clone()
        }
    }

    /// Get the value of type `T`, if one was attached
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    /// Derive a cancellable context
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (handle, signal) = cancel::pair();
        let mut signals = (*self.signals).clone();
        signals.push(signal);
        let ctx = Self {
            signals: Arc::new(signals),
            ..self.clone()
        };
        (ctx, handle)
    }

    /// Derive a context that is done at `deadline`
    ///
    /// A deadline later than an inherited one has no effect.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing <= deadline => existing,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    /// Derive a context that is done after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The effective deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the context is done, or `None` while it is still live
    pub fn err(&self) -> Option<Cancelled> {
        if self.signals.iter().any(CancelSignal::is_cancelled) {
            return Some(Cancelled::ByHandle);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Cancelled::DeadlineExceeded),
            _ => None,
        }
    }

    /// Returns true once the context is cancelled or past its deadline
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Wait until the context is done
    ///
    /// Never resolves for a context without cancellation or deadline.
    pub async fn done(&self) -> Cancelled {
        if let Some(reason) = self.err() {
            return reason;
        }

        let mut waiters: Vec<BoxFuture<'_, Cancelled>> = self
            .signals
            .iter()
            .map(|signal| signal.cancelled().map(|()| Cancelled::ByHandle).boxed())
            .collect();

        if let Some(deadline) = self.deadline {
            waiters.push(
                async move {
                    async_io::Timer::at(deadline).await;
                    Cancelled::DeadlineExceeded
                }
                .boxed(),
            );
        }

        if waiters.is_empty() {
            return future::pending().await;
        }

        let (reason, _, _) = future::select_all(waiters).await;
        reason
    }

    pub(crate) fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("values", &self.values.len())
            .field("cancellable", &!self.signals.is_empty())
            .field("deadline", &self.deadline)
            .finish()
    }
}
