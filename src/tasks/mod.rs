//! Task monitor for asynchronous appliance operations
//!
//! Polls task documents until they reach a terminal state, classifies the
//! outcome, and resolves the resource the task acted upon.

pub mod backoff;
pub mod clock;
pub mod model;
mod monitor;


pub use backoff::{poll_interval, ConnectionFailureControl, CONNECTION_FAILURE_TIMEOUT};
pub use clock::{Clock, ManualClock, SystemClock};
pub use model::{Task, TaskErrorDetail, TaskKind, TaskPhase};
pub use monitor::{AssociatedEntity, TaskMonitor, TaskOutcome, WaitTimeout, SUPPORT_DUMPS_SEGMENT};
