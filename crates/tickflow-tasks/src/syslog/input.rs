use std::io;
use std::net::{SocketAddr, UdpSocket};

use chrono::Utc;
use clap::Parser;
use tickflow_config::TaskSpec;
use tickflow_engine::{Task, TaskCore, TaskError};

use super::{SyslogList, SyslogMessage};
use crate::args::parse_arguments;

/// Largest datagram accepted (RFC 5426 recommends supporting 2048 or more).
const MAX_DATAGRAM: usize = 8192;

#[derive(Debug, Parser)]
#[command(no_binary_name = true)]
struct InputArgs {
    /// Address to bind, e.g. 127.0.0.1 for local access only
    #[arg(short = 'A', long, default_value = "0.0.0.0")]
    address: String,

    /// Port to listen on
    #[arg(short = 'P', long, default_value_t = 514)]
    port: u16,

    /// Transport: only UDP is supported
    #[arg(short = 'T', long = "type", default_value = "UDP")]
    transport: String,
}

/// Receives syslog datagrams.
///
/// Binds a non-blocking UDP socket on init and seeds the workflow with an
/// empty [`SyslogList`]. Each tick replaces that list with every datagram
/// waiting on the socket.
pub struct SyslogInput {
    core: TaskCore,
    socket: Option<UdpSocket>,
}

impl SyslogInput {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            core: TaskCore::new(spec),
            socket: None,
        }
    }

    pub fn boxed(spec: &TaskSpec) -> Box<dyn Task> {
        Box::new(Self::new(spec.clone()))
    }

    /// The bound address, once initialized.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn drain(socket: &UdpSocket) -> Result<SyslogList, TaskError> {
        let mut buffer = vec![0u8; MAX_DATAGRAM];
        let mut messages = SyslogList::new();
        loop {
            match socket.recv_from(&mut buffer) {
                Ok((len, from)) => {
                    let raw = String::from_utf8_lossy(&buffer[..len]);
                    messages.push(SyslogMessage::parse(&raw, Utc::now()).with_source(from));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(messages),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Task for SyslogInput {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_init(&mut self) -> Result<(), TaskError> {
        self.socket = None;
        let args: InputArgs = parse_arguments(self.core.spec())?;
        if !args.transport.eq_ignore_ascii_case("udp") {
            return Err(TaskError::InvalidArguments(format!(
                "unsupported server type '{}', only UDP is available",
                args.transport
            )));
        }

        let socket = UdpSocket::bind((args.address.as_str(), args.port))?;
        socket.set_nonblocking(true)?;
        tracing::info!(task = %self.core.spec().name, address = ?socket.local_addr().ok(), "syslog input listening");
        self.socket = Some(socket);

        self.core.owner()?.init_data(SyslogList::new());
        Ok(())
    }

    fn on_tick(&mut self) -> Result<(), TaskError> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| TaskError::Failed("syslog input is not listening".into()))?;
        let messages = Self::drain(socket)?;
        tracing::trace!(task = %self.core.spec().name, count = messages.len(), "syslog messages received");
        self.core.owner()?.init_data(messages);
        Ok(())
    }

    fn on_exit(&mut self) -> Result<(), TaskError> {
        self.socket = None;
        if let Some(workflow) = self.core.workflow() {
            workflow.clear_data();
        }
        Ok(())
    }
}
