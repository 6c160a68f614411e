//! # Fault Types
//!
//! Faults raised by the library itself, as opposed to the domain errors (`E`)
//! that producers settle with. Combinators convert faults into the domain
//! channel via `E: From<Fault>`, so consumers only ever observe one failure
//! path.

use std::any::Any;

use thiserror::Error;

/// A failure originating inside the library boundary rather than from the
/// producer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// A user-supplied transform panicked. The panic is caught at the
    /// combinator boundary and redirected into the failure channel of the
    /// derived value, so it cannot unwind through a dispatch pass.
    #[error("transform panicked: {message}")]
    TransformPanic {
        /// Best-effort rendering of the panic payload.
        message: String,
    },
}

impl Fault {
    /// Builds a fault from a caught panic payload.
    ///
    /// Panic payloads are `&str` or `String` in practice; anything else is
    /// reported as opaque.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "opaque panic payload".to_string()
        };
        Self::TransformPanic { message }
    }
}

/// `String` is a common ad-hoc error type; rendering the fault through its
/// `Display` form lets such chains use the combinators without a dedicated
/// error enum.
impl From<Fault> for String {
    fn from(fault: Fault) -> Self {
        fault.to_string()
    }
}
