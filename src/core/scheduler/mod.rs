//! Job scheduling
//!
//! - [`trigger`] - cron expression parsing and fire times
//! - [`job_scheduler`] - one trigger task per job, overlap policy, drain on shutdown
//! - [`supervisor`] - startup and shutdown sequence for the `run` command

pub mod job_scheduler;
pub mod supervisor;
pub mod trigger;

pub use job_scheduler::{execute_job, JobScheduler, ShutdownReport};
pub use supervisor::Supervisor;
pub use trigger::Trigger;
