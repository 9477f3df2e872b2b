//! Built-in task templates for tickflow.
//!
//! [`default_factory`] returns a factory offering:
//!
//! | Template | Arguments | Payload |
//! |----------|-----------|---------|
//! | `InitDirectoryData` | `--root-dir`, `--include-filter`, `--exclude-filter` | creates [`DirectoryData`] |
//! | `ScanDirectoryData` | | rescans [`DirectoryData`] |
//! | `SyslogInput` | `--address`, `--port`, `--type` | replaces a [`SyslogList`] |
//! | `SyslogPublisher` | `--address`, `--port` | sends [`SyslogMessage`] / [`SyslogList`] |
//! | `RunSyslogSchedule` | `--name` | forwards each message to another workflow |

pub mod args;
pub mod directory;
pub mod factory;
pub mod syslog;

pub use args::{parse_arguments, split_arguments, split_list};
pub use directory::{DirectoryData, InitDirectoryData, ScanDirectoryData};
pub use factory::{
    DEFAULT_FACTORY, INIT_DIRECTORY_DATA, RUN_SYSLOG_SCHEDULE, SCAN_DIRECTORY_DATA, SYSLOG_INPUT,
    SYSLOG_PUBLISHER, default_factory,
};
pub use syslog::{RunSyslogSchedule, Severity, SyslogInput, SyslogList, SyslogMessage, SyslogPublisher};
