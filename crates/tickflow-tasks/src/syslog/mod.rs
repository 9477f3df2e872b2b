//! Syslog relay tasks.
//!
//! A typical relay is two workflows: one driven by a fast event runs
//! `SyslogInput` then `RunSyslogSchedule --name=Publish`; the `Publish`
//! workflow has no start event and runs `SyslogPublisher` once per message.

mod input;
mod message;
mod publisher;
mod schedule;

pub use input::SyslogInput;
pub use message::{DEFAULT_PRIORITY, Severity, SyslogMessage};
pub use publisher::SyslogPublisher;
pub use schedule::RunSyslogSchedule;

/// Workflow payload produced by [`SyslogInput`].
pub type SyslogList = Vec<SyslogMessage>;
