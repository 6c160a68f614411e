//! # KEDGE Core Engine
//!
//! Deferred values with exactly-once settlement. A kedge anchor is carried
//! out ahead of the vessel and hauled in later; a [`Deferred`] is a value
//! dropped ahead of its consumers, hauled in at settlement.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Deferred<T, E>                        │
//! │                                                              │
//! │  ┌────────────────┐   owns while    ┌────────────────────┐  │
//! │  │ Settlement     │────pending─────>│ Callback Registry  │  │
//! │  │ State Machine  │                 │ (FIFO, snapshot-   │  │
//! │  │ (per-instance  │<───swapped──────│  drained once)     │  │
//! │  │  mutex)        │    at settle    └────────────────────┘  │
//! │  └───────┬────────┘                                          │
//! │          │ optional                                          │
//! │          ▼                                                   │
//! │  ┌────────────────┐                                          │
//! │  │ Scheduler hook │  continuations delivered where the       │
//! │  │ (event loops)  │  host wants them, never under a lock     │
//! │  └────────────────┘                                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! 1. **First settlement wins** - later attempts are silent no-ops, so
//!    racing producers need no coordination.
//! 2. **Exactly-once, in-order delivery** - every continuation fires once
//!    with the final outcome, in registration order per instance; an
//!    instance dropped while pending discards its continuations silently.
//! 3. **No lock held around user code** - continuation bodies always run
//!    with the instance lock released.
//! 4. **No waiting threads** - waiting is expressed only by registering
//!    continuations, never by parking or spinning.
//!
//! Derived values (`map`, `flat_map`, `all`, `race`) live in the `kedge`
//! facade crate, built purely on this crate's public API.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod deferred;
pub mod error;
pub mod outcome;
pub mod schedule;

mod registry;

pub use deferred::{Deferred, Settler};
pub use error::Fault;
pub use outcome::Outcome;
pub use schedule::{InlineScheduler, Job, QueueConfig, QueueScheduler, Scheduler};
