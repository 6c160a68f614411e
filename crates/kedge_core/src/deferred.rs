//! # Deferred Value State Machine
//!
//! A deferred value represents a result that arrives at an unknown future
//! time. Producers hold a [`Settler`]; consumers hold a [`Deferred`]. Both are
//! cheap clones of the same shared instance.
//!
//! ## State Machine
//!
//! ```text
//!                  ┌───────────────────────────────┐
//!                  │            pending            │
//!                  │  (holds the callback registry)│
//!                  └───────┬───────┬───────┬───────┘
//!                 succeed  │  fail │       │ cancel
//!                          ▼       ▼       ▼
//!                  ┌─────────┐ ┌────────┐ ┌───────────┐
//!                  │succeeded│ │ failed │ │ cancelled │
//!                  └─────────┘ └────────┘ └───────────┘
//!                       (terminal - forever)
//! ```
//!
//! The first settlement wins. Later attempts are silent no-ops so racing
//! producers (a timeout racing a network reply) need no coordination.
//!
//! ## Thread Safety
//!
//! Every state read and transition happens under the instance's own
//! `parking_lot::Mutex`. Continuation bodies always run with that lock
//! released: settlement swaps the registry out under the lock and drains the
//! snapshot afterwards, so a continuation may freely subscribe to this or any
//! other instance.
//!
//! ## Example
//!
//! ```rust,ignore
//! use kedge_core::Deferred;
//!
//! let value: Deferred<u32, String> = Deferred::new(|settler| {
//!     std::thread::spawn(move || {
//!         settler.succeed(42);
//!     });
//! });
//!
//! value.subscribe(
//!     |n| println!("got {n}"),
//!     |e| println!("failed: {e}"),
//! );
//! ```

use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::outcome::Outcome;
use crate::registry::{deliver, CallbackRegistry, Continuation};
use crate::schedule::Scheduler;

/// Settlement state. While pending, the slot owns the callback registry;
/// settling swaps the registry out and installs the terminal outcome in its
/// place.
enum SlotState<T, E> {
    /// Not yet settled; continuations buffer here.
    Pending(CallbackRegistry<T, E>),
    /// Settled with a value.
    Succeeded(T),
    /// Settled with a domain error.
    Failed(E),
    /// Called off before producing either.
    Cancelled,
}

/// Shared per-instance state behind both capability handles.
struct Inner<T, E> {
    /// State tag, stored outcome, and registry - the only mutable shared
    /// resources, all guarded together.
    state: Mutex<SlotState<T, E>>,
    /// Optional delivery hook. When present, every continuation - early- or
    /// late-registered - goes through it instead of running on the settling
    /// or subscribing thread.
    hook: Option<Arc<dyn Scheduler>>,
}

impl<T, E> Inner<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Attempts the pending → terminal transition.
    ///
    /// Returns `false` without side effects if another settlement got there
    /// first. On the winning call, the registry snapshot is dispatched after
    /// the lock is released.
    fn settle(&self, outcome: Outcome<T, E>) -> bool {
        let mut state = self.state.lock();
        let registry = match &mut *state {
            SlotState::Pending(registry) => mem::take(registry),
            _ => return false,
        };
        *state = match &outcome {
            Outcome::Success(value) => SlotState::Succeeded(value.clone()),
            Outcome::Failure(error) => SlotState::Failed(error.clone()),
            Outcome::Cancelled => SlotState::Cancelled,
        };
        drop(state);

        registry.dispatch(&outcome, self.hook.as_ref());
        true
    }

    /// Registers a continuation: buffered while pending, delivered
    /// immediately (outside the lock) once terminal.
    fn register(&self, continuation: Continuation<T, E>) {
        let mut state = self.state.lock();
        let outcome = match &mut *state {
            SlotState::Pending(registry) => {
                registry.append(continuation);
                return;
            }
            SlotState::Succeeded(value) => Outcome::Success(value.clone()),
            SlotState::Failed(error) => Outcome::Failure(error.clone()),
            SlotState::Cancelled => Outcome::Cancelled,
        };
        drop(state);

        deliver(continuation, outcome, self.hook.as_ref());
    }

    /// Clones the terminal outcome, if any.
    fn snapshot(&self) -> Option<Outcome<T, E>> {
        match &*self.state.lock() {
            SlotState::Pending(_) => None,
            SlotState::Succeeded(value) => Some(Outcome::Success(value.clone())),
            SlotState::Failed(error) => Some(Outcome::Failure(error.clone())),
            SlotState::Cancelled => Some(Outcome::Cancelled),
        }
    }
}

/// Consumer handle: the subscribe capability.
///
/// Cloning shares the underlying instance. Dropping every handle (consumer
/// and producer alike) while still pending discards the buffered
/// continuations without invoking them.
pub struct Deferred<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Producer handle: the settlement capability.
///
/// Cloning lets independent producers race; the first settlement wins and
/// the rest become no-ops.
pub struct Settler<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for Settler<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> Deferred<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a pending instance and returns both capability handles.
    ///
    /// The channel-pair form of construction: hand the [`Settler`] to the
    /// producer, keep the [`Deferred`] for consumers.
    #[must_use]
    pub fn pending() -> (Self, Settler<T, E>) {
        Self::build(None)
    }

    /// Like [`Deferred::pending`], with a delivery hook attached.
    ///
    /// Every continuation on this instance is handed to `hook` instead of
    /// running on the settling or subscribing thread. A FIFO hook preserves
    /// registration-order delivery.
    #[must_use]
    pub fn pending_with_hook(hook: Arc<dyn Scheduler>) -> (Self, Settler<T, E>) {
        Self::build(Some(hook))
    }

    /// Creates an instance by running `setup` synchronously with the
    /// settlement capability, before returning.
    ///
    /// `setup` may settle immediately, hand the [`Settler`] to another thread
    /// to settle later, or never settle at all. A second settlement from
    /// anywhere is a no-op.
    pub fn new(setup: impl FnOnce(Settler<T, E>)) -> Self {
        let (deferred, settler) = Self::pending();
        setup(settler);
        deferred
    }

    /// Like [`Deferred::new`], with a delivery hook attached.
    pub fn with_hook(hook: Arc<dyn Scheduler>, setup: impl FnOnce(Settler<T, E>)) -> Self {
        let (deferred, settler) = Self::pending_with_hook(hook);
        setup(settler);
        deferred
    }

    /// Creates an instance that is already settled with `outcome`.
    ///
    /// Subscriptions on it deliver synchronously at registration.
    #[must_use]
    pub fn settled(outcome: Outcome<T, E>) -> Self {
        let state = match outcome {
            Outcome::Success(value) => SlotState::Succeeded(value),
            Outcome::Failure(error) => SlotState::Failed(error),
            Outcome::Cancelled => SlotState::Cancelled,
        };
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                hook: None,
            }),
        }
    }

    /// Creates an instance already settled with a value.
    #[must_use]
    pub fn succeeded(value: T) -> Self {
        Self::settled(Outcome::Success(value))
    }

    /// Creates an instance already settled with a domain error.
    #[must_use]
    pub fn failed(error: E) -> Self {
        Self::settled(Outcome::Failure(error))
    }

    /// Creates an instance that is already cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::settled(Outcome::Cancelled)
    }

    /// Returns `true` while no settlement has happened.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(&*self.inner.state.lock(), SlotState::Pending(_))
    }

    /// Returns `true` once settled (success, failure, or cancellation).
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Clones the terminal outcome, or `None` while pending.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome<T, E>> {
        self.inner.snapshot()
    }

    /// Registers a success handler and a failure handler.
    ///
    /// If the instance already settled, the matching handler runs
    /// synchronously before this call returns (through the hook when one is
    /// configured), making late subscription indistinguishable from early
    /// subscription except for timing. Otherwise the pair is buffered and
    /// fires exactly once at settlement, in registration order relative to
    /// other continuations on this instance.
    ///
    /// Cancellation invokes neither handler; use
    /// [`Deferred::subscribe_outcome`] to observe it.
    pub fn subscribe(
        &self,
        on_success: impl FnOnce(T) + Send + 'static,
        on_failure: impl FnOnce(E) + Send + 'static,
    ) {
        self.inner
            .register(Continuation::split(on_success, on_failure));
    }

    /// Registers a handler for the settlement outcome itself, cancellation
    /// included.
    ///
    /// Same timing and ordering rules as [`Deferred::subscribe`]. Derived
    /// values are built on this operation, which is how cancellation
    /// propagates through chains.
    pub fn subscribe_outcome(&self, handler: impl FnOnce(Outcome<T, E>) + Send + 'static) {
        self.inner.register(Continuation::settled(handler));
    }

    fn build(hook: Option<Arc<dyn Scheduler>>) -> (Self, Settler<T, E>) {
        let inner = Arc::new(Inner {
            state: Mutex::new(SlotState::Pending(CallbackRegistry::default())),
            hook,
        });
        (
            Self {
                inner: Arc::clone(&inner),
            },
            Settler { inner },
        )
    }
}

impl<T, E> Settler<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Settles with a value.
    ///
    /// Returns `true` if this call performed the settlement, `false` if the
    /// instance was already terminal. Losing the race is not an error.
    pub fn succeed(&self, value: T) -> bool {
        self.inner.settle(Outcome::Success(value))
    }

    /// Settles with a domain error. Same idempotence rules as
    /// [`Settler::succeed`].
    pub fn fail(&self, error: E) -> bool {
        self.inner.settle(Outcome::Failure(error))
    }

    /// Cancels the instance. Same idempotence rules as [`Settler::succeed`].
    pub fn cancel(&self) -> bool {
        self.inner.settle(Outcome::Cancelled)
    }

    /// Settles with a ready outcome - equivalent to the matching
    /// `succeed`/`fail`/`cancel` call. Used when forwarding the outcome of
    /// one instance into another.
    pub fn settle(&self, outcome: Outcome<T, E>) -> bool {
        self.inner.settle(outcome)
    }

    /// Returns `true` once the instance is terminal. Lets a racing producer
    /// skip expensive work it has already lost.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(&*self.inner.state.lock(), SlotState::Pending(_))
    }
}
