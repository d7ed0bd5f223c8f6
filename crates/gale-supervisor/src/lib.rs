//! Watcher process supervision.
//!
//! The supervisor owns the lifecycle of every long-running watcher:
//! spawning ([`process`]), single-instance enforcement ([`lock`]), and
//! the periodic health-check and collection timers ([`health`]).
//!
//! Supervision is handle-first: a process this supervisor spawned is
//! tracked through its native child handle, and the PID file it also
//! writes exists for `status` reporting and for adopting processes left
//! over from a previous supervisor life — the file is never the only
//! source of truth for a process we own.

pub mod error;
pub mod health;
pub mod lock;
pub mod process;

pub use error::{Result, SupervisorError};
pub use health::{run_supervisor, SupervisorPolicy};
pub use lock::InstanceLock;
pub use process::{pid_alive, ProcessSupervisor, StartOutcome, StopOutcome};
