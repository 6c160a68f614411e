//! # Callback Registry
//!
//! The FIFO buffer of continuations waiting on a pending instance.
//!
//! The registry is drained exactly once, at settlement. The owning state
//! machine swaps the registry out while holding the instance lock and calls
//! [`CallbackRegistry::dispatch`] after releasing it, so a continuation that
//! registers further continuations (on this instance or any other) can never
//! deadlock or be lost.
//!
//! Every continuation body runs inside an unwind guard: a panicking consumer
//! is logged and the remaining entries of the same drain pass still fire.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::Fault;
use crate::outcome::Outcome;
use crate::schedule::Scheduler;

/// Success handler half of a split continuation.
type SuccessHandler<T> = Box<dyn FnOnce(T) + Send>;
/// Failure handler half of a split continuation.
type FailureHandler<E> = Box<dyn FnOnce(E) + Send>;
/// Handler that observes the full outcome, cancellation included.
type OutcomeHandler<T, E> = Box<dyn FnOnce(Outcome<T, E>) + Send>;

/// A registered reaction to settlement.
///
/// Consumed exactly once: either at settlement (if registered while pending)
/// or immediately at registration (if the instance already settled).
pub enum Continuation<T, E> {
    /// A pair of per-channel handlers. Either half may be absent; a
    /// cancellation outcome invokes neither.
    Split {
        /// Runs with a clone of the success value.
        on_success: Option<SuccessHandler<T>>,
        /// Runs with a clone of the failure error.
        on_failure: Option<FailureHandler<E>>,
    },
    /// A single handler that receives the outcome itself. This is the form
    /// derived values are built from, since it is the only one that observes
    /// cancellation.
    Settled(OutcomeHandler<T, E>),
}

impl<T, E> Continuation<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Builds a split continuation from two handlers.
    pub fn split(
        on_success: impl FnOnce(T) + Send + 'static,
        on_failure: impl FnOnce(E) + Send + 'static,
    ) -> Self {
        Self::Split {
            on_success: Some(Box::new(on_success)),
            on_failure: Some(Box::new(on_failure)),
        }
    }

    /// Builds an outcome-level continuation from one handler.
    pub fn settled(handler: impl FnOnce(Outcome<T, E>) + Send + 'static) -> Self {
        Self::Settled(Box::new(handler))
    }

    /// Invokes the continuation with the given outcome, containing any panic
    /// the handler raises.
    ///
    /// A contained panic is reported through `tracing` and swallowed; the
    /// caller's drain pass continues with its remaining entries.
    pub fn run(self, outcome: Outcome<T, E>) {
        let result = catch_unwind(AssertUnwindSafe(move || self.invoke(outcome)));
        if let Err(payload) = result {
            let fault = Fault::from_panic(payload.as_ref());
            tracing::error!("continuation panicked during dispatch: {fault}");
        }
    }

    /// Routes the outcome to the matching handler.
    fn invoke(self, outcome: Outcome<T, E>) {
        match self {
            Self::Split {
                on_success,
                on_failure,
            } => match outcome {
                Outcome::Success(value) => {
                    if let Some(handler) = on_success {
                        handler(value);
                    }
                }
                Outcome::Failure(error) => {
                    if let Some(handler) = on_failure {
                        handler(error);
                    }
                }
                // Split continuations have no cancellation channel.
                Outcome::Cancelled => {}
            },
            Self::Settled(handler) => handler(outcome),
        }
    }
}

/// Delivers one continuation, inline or through the instance's scheduling
/// hook.
pub fn deliver<T, E>(
    continuation: Continuation<T, E>,
    outcome: Outcome<T, E>,
    hook: Option<&Arc<dyn Scheduler>>,
) where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    match hook {
        Some(scheduler) => scheduler.schedule(Box::new(move || continuation.run(outcome))),
        None => continuation.run(outcome),
    }
}

/// FIFO buffer of continuations registered while the instance was pending.
pub struct CallbackRegistry<T, E> {
    entries: Vec<Continuation<T, E>>,
}

impl<T, E> Default for CallbackRegistry<T, E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T, E> CallbackRegistry<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Appends a continuation. Registration order is delivery order.
    pub fn append(&mut self, continuation: Continuation<T, E>) {
        self.entries.push(continuation);
    }

    /// Invokes every buffered continuation with the outcome, in registration
    /// order, consuming the registry.
    ///
    /// The caller must have released the instance lock: entries run user code
    /// and may re-enter `subscribe` on any instance.
    pub fn dispatch(self, outcome: &Outcome<T, E>, hook: Option<&Arc<dyn Scheduler>>) {
        for continuation in self.entries {
            deliver(continuation, outcome.clone(), hook);
        }
    }
}
