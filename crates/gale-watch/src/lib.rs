//! Arrival watching, grouping, and temporal pairing.
//!
//! This crate owns the stateful heart of the pipeline:
//! - [`registry`]: the per-group state machine that fires the merge
//!   transform exactly once per complete raw triple
//! - [`pairing`]: the incremental engine that pairs merged groups six
//!   hours apart and drives the pair converter
//! - [`transform`]: typed invocation of the external merge/convert tools
//! - [`watcher`]: the long-running loop that ties a debounced filesystem
//!   event stream (plus a startup rescan) to the two registries
//!
//! All registries are explicit objects created at watcher start and
//! rebuilt from disk on restart; nothing here persists its own event log.

pub mod error;
pub mod pairing;
pub mod registry;
pub mod transform;
pub mod watcher;

pub use error::{Result, WatchError};
pub use pairing::PairingEngine;
pub use registry::{GroupRegistry, GroupState, Observation, REQUIRED_KINDS};
pub use transform::{CommandSpec, Transforms};
pub use watcher::{ArrivalWatcher, WatcherPaths};
