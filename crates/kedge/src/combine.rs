//! # Combinators
//!
//! Derived deferred values, built exclusively on the core's public
//! subscription API. `flat_map` is the fundamental combinator; `map` and
//! `try_map` are expressed through it, and `observe` is a thin wrapper over
//! `subscribe`.
//!
//! ## Failure Semantics
//!
//! - An upstream failure or cancellation short-circuits: the transform is
//!   never invoked and the derived value adopts the upstream outcome.
//! - A panic inside a transform is caught at the combinator boundary and
//!   becomes `Failure(E::from(Fault::TransformPanic { .. }))` on the derived
//!   value. It never unwinds into an unrelated chain.
//! - Nothing here panics or errors synchronously for ordinary data errors.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use kedge_core::{Deferred, Fault, Outcome};

/// Derivation operations for [`Deferred`].
///
/// Blanket-implemented for every `Deferred<T, E>`; import the trait to use
/// the combinators.
pub trait DeferredExt<T, E> {
    /// Registers side-effect handlers for success and failure.
    ///
    /// A thin wrapper over `subscribe`, for fire-and-forget reactions at the
    /// end of a chain.
    fn observe(
        &self,
        on_success: impl FnOnce(T) + Send + 'static,
        on_failure: impl FnOnce(E) + Send + 'static,
    );

    /// Derives a value by transforming the eventual success value.
    ///
    /// Failure and cancellation propagate to the derived value untouched,
    /// without invoking `transform`.
    fn map<U, F>(&self, transform: F) -> Deferred<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
        E: From<Fault>;

    /// Derives a value by a transform that may fail with a domain error.
    ///
    /// An `Err` settles the derived value as failed through the ordinary
    /// failure channel.
    fn try_map<U, F>(&self, transform: F) -> Deferred<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
        E: From<Fault>;

    /// Derives a value by chaining into a dependent deferred value.
    ///
    /// On upstream success, `transform` produces an inner instance whose
    /// eventual outcome settles the derived value. On upstream failure or
    /// cancellation, the derived value settles immediately with the same
    /// outcome and `transform` is never invoked.
    fn flat_map<U, F>(&self, transform: F) -> Deferred<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Deferred<U, E> + Send + 'static,
        E: From<Fault>;
}

impl<T, E> DeferredExt<T, E> for Deferred<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn observe(
        &self,
        on_success: impl FnOnce(T) + Send + 'static,
        on_failure: impl FnOnce(E) + Send + 'static,
    ) {
        self.subscribe(on_success, on_failure);
    }

    fn map<U, F>(&self, transform: F) -> Deferred<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
        E: From<Fault>,
    {
        self.flat_map(move |value| Deferred::succeeded(transform(value)))
    }

    fn try_map<U, F>(&self, transform: F) -> Deferred<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
        E: From<Fault>,
    {
        self.flat_map(move |value| match transform(value) {
            Ok(mapped) => Deferred::succeeded(mapped),
            Err(error) => Deferred::failed(error),
        })
    }

    fn flat_map<U, F>(&self, transform: F) -> Deferred<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Deferred<U, E> + Send + 'static,
        E: From<Fault>,
    {
        let (derived, settler) = Deferred::pending();
        self.subscribe_outcome(move |outcome| match outcome {
            Outcome::Success(value) => {
                match catch_unwind(AssertUnwindSafe(move || transform(value))) {
                    Ok(inner) => {
                        inner.subscribe_outcome(move |inner_outcome| {
                            settler.settle(inner_outcome);
                        });
                    }
                    Err(payload) => {
                        settler.fail(E::from(Fault::from_panic(payload.as_ref())));
                    }
                }
            }
            Outcome::Failure(error) => {
                settler.fail(error);
            }
            Outcome::Cancelled => {
                settler.cancel();
            }
        });
        derived
    }
}

/// Derives a value that succeeds with every input's value, in input order,
/// once all inputs have succeeded.
///
/// The first observed failure or cancellation settles the aggregate
/// immediately; settlements of the remaining inputs are then ignored.
/// `all(vec![])` succeeds immediately with an empty vector.
#[must_use]
pub fn all<T, E>(inputs: Vec<Deferred<T, E>>) -> Deferred<Vec<T>, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let (derived, settler) = Deferred::pending();
    if inputs.is_empty() {
        settler.succeed(Vec::new());
        return derived;
    }

    let slots: Arc<Mutex<Vec<Option<T>>>> = Arc::new(Mutex::new(vec![None; inputs.len()]));
    let remaining = Arc::new(AtomicUsize::new(inputs.len()));

    for (index, input) in inputs.iter().enumerate() {
        let slots = Arc::clone(&slots);
        let remaining = Arc::clone(&remaining);
        let settler = settler.clone();
        input.subscribe_outcome(move |outcome| match outcome {
            Outcome::Success(value) => {
                slots.lock()[index] = Some(value);
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    // Last input in: hand the ordered values over. Every slot
                    // is filled at this point; `collect` on options is the
                    // panic-free way to unwrap them together.
                    let values: Option<Vec<T>> =
                        slots.lock().iter_mut().map(Option::take).collect();
                    if let Some(values) = values {
                        settler.succeed(values);
                    }
                }
            }
            Outcome::Failure(error) => {
                settler.fail(error);
            }
            Outcome::Cancelled => {
                settler.cancel();
            }
        });
    }
    derived
}

/// Derives a value that adopts the outcome of whichever input settles first -
/// success, failure, or cancellation alike. Later settlements are ignored.
///
/// `race(vec![])` stays pending forever: there is no input to adopt an
/// outcome from.
#[must_use]
pub fn race<T, E>(inputs: Vec<Deferred<T, E>>) -> Deferred<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let (derived, settler) = Deferred::pending();
    for input in &inputs {
        let settler = settler.clone();
        input.subscribe_outcome(move |outcome| {
            settler.settle(outcome);
        });
    }
    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use kedge_core::Settler;
    use std::sync::atomic::AtomicBool;

    /// Domain error used across the combinator tests.
    #[derive(Clone, Debug, PartialEq, Eq)]
    enum TestError {
        Domain(String),
        Fault(Fault),
    }

    impl From<Fault> for TestError {
        fn from(fault: Fault) -> Self {
            Self::Fault(fault)
        }
    }

    fn pending() -> (Deferred<u32, TestError>, Settler<u32, TestError>) {
        Deferred::pending()
    }

    #[test]
    fn test_map_transforms_success() {
        let (deferred, settler) = pending();
        let doubled = deferred.map(|n| n * 2);

        settler.succeed(21);
        assert_eq!(doubled.outcome(), Some(Outcome::Success(42)));
    }

    #[test]
    fn test_map_identity_preserves_outcome() {
        let (deferred, settler) = pending();
        let same = deferred.map(|n| n);

        settler.succeed(7);
        assert_eq!(deferred.outcome(), same.outcome());

        let (deferred, settler) = pending();
        let same = deferred.map(|n| n);
        settler.fail(TestError::Domain("e".to_string()));
        assert_eq!(deferred.outcome(), same.outcome());
    }

    #[test]
    fn test_map_skips_transform_on_failure() {
        let (deferred, settler) = pending();
        let invoked = Arc::new(AtomicBool::new(false));
        let invoked_in_transform = Arc::clone(&invoked);
        let mapped = deferred.map(move |n| {
            invoked_in_transform.store(true, Ordering::SeqCst);
            n * 2
        });

        settler.fail(TestError::Domain("fetch failed".to_string()));
        assert!(!invoked.load(Ordering::SeqCst));
        assert_eq!(
            mapped.outcome(),
            Some(Outcome::Failure(TestError::Domain(
                "fetch failed".to_string()
            )))
        );
    }

    #[test]
    fn test_map_converts_transform_panic_into_failure() {
        let (deferred, settler) = pending();
        let mapped: Deferred<u32, TestError> = deferred.map(|_| panic!("transform bug"));

        settler.succeed(1);
        match mapped.outcome() {
            Some(Outcome::Failure(TestError::Fault(Fault::TransformPanic { message }))) => {
                assert_eq!(message, "transform bug");
            }
            other => panic!("expected a transform fault, got {other:?}"),
        }
    }

    #[test]
    fn test_try_map_err_uses_failure_channel() {
        let (deferred, settler) = pending();
        let checked = deferred.try_map(|n| {
            if n == 0 {
                Err(TestError::Domain("zero".to_string()))
            } else {
                Ok(n + 1)
            }
        });

        settler.succeed(0);
        assert_eq!(
            checked.outcome(),
            Some(Outcome::Failure(TestError::Domain("zero".to_string())))
        );
    }

    #[test]
    fn test_flat_map_chains_inner_settlement() {
        let (outer, outer_settler) = pending();
        let (inner, inner_settler) = pending();

        let inner_for_transform = inner.clone();
        let chained = outer.flat_map(move |_| inner_for_transform);

        outer_settler.succeed(1);
        assert!(chained.is_pending());

        inner_settler.succeed(99);
        assert_eq!(chained.outcome(), Some(Outcome::Success(99)));
    }

    #[test]
    fn test_flat_map_associativity() {
        let f = |n: u32| Deferred::<u32, TestError>::succeeded(n + 1);
        let g = |n: u32| Deferred::<u32, TestError>::succeeded(n * 10);

        let (left_src, left_settler) = pending();
        let left = left_src.flat_map(f).flat_map(g);

        let (right_src, right_settler) = pending();
        let right = right_src.flat_map(move |n| f(n).flat_map(g));

        left_settler.succeed(4);
        right_settler.succeed(4);

        assert_eq!(left.outcome(), Some(Outcome::Success(50)));
        assert_eq!(left.outcome(), right.outcome());
    }

    #[test]
    fn test_flat_map_propagates_cancellation_without_transform() {
        let (deferred, settler) = pending();
        let invoked = Arc::new(AtomicBool::new(false));
        let invoked_in_transform = Arc::clone(&invoked);
        let chained = deferred.flat_map(move |n| {
            invoked_in_transform.store(true, Ordering::SeqCst);
            Deferred::succeeded(n)
        });

        settler.cancel();
        assert!(!invoked.load(Ordering::SeqCst));
        assert_eq!(chained.outcome(), Some(Outcome::Cancelled));
    }

    #[test]
    fn test_all_preserves_input_order_under_reordered_settlement() {
        let (d1, s1) = pending();
        let (d2, s2) = pending();
        let (d3, s3) = pending();

        let joined = all(vec![d1, d2, d3]);

        // Settle out of order.
        s2.succeed(2);
        s3.succeed(3);
        assert!(joined.is_pending());
        s1.succeed(1);

        assert_eq!(joined.outcome(), Some(Outcome::Success(vec![1, 2, 3])));
    }

    #[test]
    fn test_all_short_circuits_on_first_failure() {
        let (d1, s1) = pending();
        let (d2, s2) = pending();

        let joined = all(vec![d1, d2]);

        s2.fail(TestError::Domain("second broke".to_string()));
        assert_eq!(
            joined.outcome(),
            Some(Outcome::Failure(TestError::Domain(
                "second broke".to_string()
            )))
        );

        // The straggler's settlement is ignored.
        s1.succeed(1);
        assert_eq!(
            joined.outcome(),
            Some(Outcome::Failure(TestError::Domain(
                "second broke".to_string()
            )))
        );
    }

    #[test]
    fn test_all_empty_succeeds_immediately() {
        let joined: Deferred<Vec<u32>, TestError> = all(Vec::new());
        assert_eq!(joined.outcome(), Some(Outcome::Success(Vec::new())));
    }

    #[test]
    fn test_all_propagates_cancellation() {
        let (d1, s1) = pending();
        let (d2, _s2) = pending();

        let joined = all(vec![d1, d2]);
        s1.cancel();
        assert_eq!(joined.outcome(), Some(Outcome::Cancelled));
    }

    #[test]
    fn test_race_adopts_first_settlement() {
        let (d1, s1) = pending();
        let (d2, s2) = pending();

        let winner = race(vec![d1, d2]);

        s2.succeed(2);
        assert_eq!(winner.outcome(), Some(Outcome::Success(2)));

        // The loser's settlement has no observable effect.
        s1.succeed(1);
        assert_eq!(winner.outcome(), Some(Outcome::Success(2)));
    }

    #[test]
    fn test_race_adopts_first_failure_too() {
        let (d1, s1) = pending();
        let (d2, _s2) = pending();

        let winner = race(vec![d1, d2]);
        s1.fail(TestError::Domain("lost the plot".to_string()));
        assert_eq!(
            winner.outcome(),
            Some(Outcome::Failure(TestError::Domain(
                "lost the plot".to_string()
            )))
        );
    }

    #[test]
    fn test_race_empty_stays_pending() {
        let winner: Deferred<u32, TestError> = race(Vec::new());
        assert!(winner.is_pending());
    }

    #[test]
    fn test_observe_runs_success_side_effect() {
        let (deferred, settler) = pending();
        let seen = Arc::new(Mutex::new(None));

        let seen_in_handler = Arc::clone(&seen);
        deferred.observe(
            move |value| {
                *seen_in_handler.lock() = Some(value);
            },
            |_| panic!("failure handler must not run"),
        );

        settler.succeed(3);
        assert_eq!(*seen.lock(), Some(3));
    }
}
