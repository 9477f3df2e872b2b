//! The `Default` template factory.

use tickflow_config::TaskSpec;
use tickflow_engine::TemplateFactory;

use crate::directory::{InitDirectoryData, ScanDirectoryData};
use crate::syslog::{RunSyslogSchedule, SyslogInput, SyslogPublisher};

pub const DEFAULT_FACTORY: &str = "Default";

pub const INIT_DIRECTORY_DATA: &str = "InitDirectoryData";
pub const SCAN_DIRECTORY_DATA: &str = "ScanDirectoryData";
pub const SYSLOG_INPUT: &str = "SyslogInput";
pub const SYSLOG_PUBLISHER: &str = "SyslogPublisher";
pub const RUN_SYSLOG_SCHEDULE: &str = "RunSyslogSchedule";

/// Build the factory holding the built-in templates.
///
/// Hosts register it on their server explicitly:
///
/// ```ignore
/// server.register_factory(Arc::new(tickflow_tasks::default_factory()));
/// ```
pub fn default_factory() -> TemplateFactory {
    TemplateFactory::new(DEFAULT_FACTORY, "Default task templates")
        .with_template(
            TaskSpec::new("", INIT_DIRECTORY_DATA)
                .with_description("Initiate workflow directory data")
                .with_arguments("--root-dir= --include-filter= --exclude-filter=")
                .with_documentation(
                    "Creates the workflow's directory payload. Filters are ';'-separated glob lists.",
                ),
            InitDirectoryData::boxed,
        )
        .with_template(
            TaskSpec::new("", SCAN_DIRECTORY_DATA)
                .with_description("Scan workflow directory data")
                .with_documentation("Rescans the directory payload's root on every tick."),
            ScanDirectoryData::boxed,
        )
        .with_template(
            TaskSpec::new("", SYSLOG_INPUT)
                .with_description("Server that receives syslog messages")
                .with_arguments("--address=0.0.0.0 --port=514 --type=UDP"),
            SyslogInput::boxed,
        )
        .with_template(
            TaskSpec::new("", SYSLOG_PUBLISHER)
                .with_description("TCP server that publishes syslog messages")
                .with_arguments("--address=0.0.0.0 --port=601"),
            SyslogPublisher::boxed,
        )
        .with_template(
            TaskSpec::new("", RUN_SYSLOG_SCHEDULE)
                .with_description("Forwards syslog messages to another workflow")
                .with_arguments("--name="),
            RunSyslogSchedule::boxed,
        )
}
