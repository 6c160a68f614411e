//! # Settlement Outcomes
//!
//! The terminal record of a deferred value. Once an instance settles, its
//! outcome never changes.

/// The terminal state of a deferred value.
///
/// Exactly one of these is stored at settlement time and delivered to every
/// continuation, early- or late-registered. Handlers receive their own clone,
/// which is why `T` and `E` carry `Clone` bounds throughout the crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The operation produced a value.
    Success(T),
    /// The operation failed with a domain error.
    Failure(E),
    /// The operation was called off before producing either.
    Cancelled,
}

impl<T, E> Outcome<T, E> {
    /// Returns `true` for a success outcome.
    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` for a failure outcome.
    #[inline]
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Returns `true` for a cancelled outcome.
    #[inline]
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Consumes the outcome, returning the success value if there is one.
    #[inline]
    #[must_use]
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Consumes the outcome, returning the failure error if there is one.
    #[inline]
    #[must_use]
    pub fn failure(self) -> Option<E> {
        match self {
            Self::Failure(error) => Some(error),
            _ => None,
        }
    }
}
