//! # KEDGE
//!
//! Deferred values with exactly-once settlement and composable
//! continuations.
//!
//! ## Architecture (The Three Facets)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                             KEDGE                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌───────────────────┐        ┌───────────────────────────┐    │
//! │  │  kedge_core       │        │  kedge::combine           │    │
//! │  │                   │ public │                           │    │
//! │  │  • Deferred /     │  API   │  • observe                │    │
//! │  │    Settler        │◄───────│  • map / try_map          │    │
//! │  │  • Callback       │  only  │  • flat_map               │    │
//! │  │    registry       │        │  • all / race             │    │
//! │  │  • Scheduler hook │        │                           │    │
//! │  └───────────────────┘        └───────────────────────────┘    │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The crate boundary is the layering rule: combinators derive new values
//! through `pending`/`settled`/`subscribe_outcome` alone, with no reach into
//! registry representation or locking.
//!
//! ## Example
//!
//! ```rust,ignore
//! use kedge::{Deferred, DeferredExt};
//!
//! let fetched: Deferred<u32, String> = Deferred::new(|settler| {
//!     std::thread::spawn(move || {
//!         // ... some work on another thread ...
//!         settler.succeed(42);
//!     });
//! });
//!
//! fetched
//!     .map(|n| n * 2)
//!     .observe(|n| assert_eq!(n, 84), |e| eprintln!("failed: {e}"));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod combine;

// Re-export the settlement engine
pub use kedge_core as core;

// Re-export commonly used types
pub use combine::{all, race, DeferredExt};
pub use kedge_core::{
    Deferred, Fault, InlineScheduler, Job, Outcome, QueueConfig, QueueScheduler, Scheduler,
    Settler,
};
