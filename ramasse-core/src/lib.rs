//! Core building blocks for the Ramasse collection-schedule pipeline:
//! the domain model, feed expansion, the portal-facing ports, and the
//! service facade consumers talk to.

/// Feed parsing and recurrence expansion into concrete occurrences.
pub mod expand;
/// Domain model: categories, occurrences, snapshots, and the horizon window.
pub mod model;
/// Ports implemented by portal providers, plus the pipeline error taxonomy.
pub mod ports;
/// Service facade orchestrating lookups and the schedule pipeline.
pub mod service;

pub use expand::*;
pub use model::*;
pub use ports::*;
pub use service::*;
