//! Team developer contribution stats
//!
//! # Overview
//!
//! The crate keeps a roster of team developers and ranks them by what they contributed to the repositories the organization tracks.
//! Contribution rows are ingested elsewhere, one row per developer and repository; rows of untracked repositories never count.
//! For every roster entry the rows are merged into commit, addition and deletion totals, the number of repositories contributed to,
//! and the first and last commit timestamps. Entries are ranked by net lines (additions minus deletions), highest first.
//!
//! Storage and authentication are collaborators behind the [`api::Store`] and [`api::AccessGateway`] traits.
//! [`handler::TeamDevelopersHandler`] runs the read and write pipelines against them.

#[cfg(feature = "api")]
pub mod api;

#[cfg(feature = "service")]
pub mod aggregator;
#[cfg(feature = "service")]
pub mod handler;
#[cfg(feature = "service")]
pub mod roster;

#[cfg(all(feature = "api", any(test, feature = "memory")))]
pub mod memory;

#[cfg(feature = "service")]
pub use handler::{ErrorKind, HandlerError, TeamDevelopersHandler};
