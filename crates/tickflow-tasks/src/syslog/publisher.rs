use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use clap::Parser;
use tickflow_config::TaskSpec;
use tickflow_engine::{Task, TaskCore, TaskError, Workflow};

use super::{SyslogList, SyslogMessage};
use crate::args::parse_arguments;

/// Unsent bytes a subscriber may fall behind by before it is dropped.
pub const MAX_BACKLOG: usize = 256 * 1024;

#[derive(Debug, Parser)]
#[command(no_binary_name = true)]
struct PublisherArgs {
    /// Address to bind, e.g. 127.0.0.1 for local access only
    #[arg(short = 'A', long, default_value = "0.0.0.0")]
    address: String,

    /// Port subscribers connect to
    #[arg(short = 'P', long, default_value_t = 601)]
    port: u16,
}

/// Publishes syslog messages to TCP subscribers.
///
/// Each tick accepts pending subscribers, then sends the workflow's payload
/// to all of them, one message per line. A single [`SyslogMessage`] payload
/// is consumed when sent; a [`SyslogList`] payload is sent as is and left in
/// place for its producer to replace.
///
/// Subscriber sockets never block the tick. Whatever a subscriber cannot take
/// yet is kept and retried on later ticks; a subscriber more than
/// [`MAX_BACKLOG`] bytes behind is dropped.
pub struct SyslogPublisher {
    core: TaskCore,
    listener: Option<TcpListener>,
    subscribers: Vec<Subscriber>,
}

struct Subscriber {
    stream: TcpStream,
    peer: SocketAddr,
    backlog: Vec<u8>,
}

impl Subscriber {
    /// Write as much of the backlog as the socket takes right now.
    fn flush(&mut self) -> io::Result<()> {
        let mut written = 0;
        while written < self.backlog.len() {
            match self.stream.write(&self.backlog[written..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.backlog.drain(..written);
        Ok(())
    }
}

impl SyslogPublisher {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            core: TaskCore::new(spec),
            listener: None,
            subscribers: Vec::new(),
        }
    }

    pub fn boxed(spec: &TaskSpec) -> Box<dyn Task> {
        Box::new(Self::new(spec.clone()))
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn accept(&mut self, listener: &TcpListener) -> io::Result<()> {
        loop {
            match listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(true)?;
                    tracing::debug!(task = %self.core.spec().name, peer = %peer, "syslog subscriber connected");
                    self.subscribers.push(Subscriber {
                        stream,
                        peer,
                        backlog: Vec::new(),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn pending(workflow: &Workflow) -> Vec<SyslogMessage> {
        if let Some(message) = workflow.take_data::<SyslogMessage>() {
            return vec![message];
        }
        workflow
            .data::<SyslogList>()
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    fn publish(&mut self, messages: &[SyslogMessage]) {
        if self.subscribers.is_empty() {
            return;
        }
        let mut frame = String::new();
        for message in messages {
            frame.push_str(&message.to_string());
            frame.push('\n');
        }
        let name = &self.core.spec().name;
        self.subscribers.retain_mut(|subscriber| {
            subscriber.backlog.extend_from_slice(frame.as_bytes());
            if let Err(e) = subscriber.flush() {
                tracing::debug!(task = %name, peer = %subscriber.peer, error = %e, "syslog subscriber dropped");
                return false;
            }
            if subscriber.backlog.len() > MAX_BACKLOG {
                tracing::warn!(task = %name, peer = %subscriber.peer, backlog = subscriber.backlog.len(), "syslog subscriber too slow, dropped");
                return false;
            }
            true
        });
    }
}

impl Task for SyslogPublisher {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_init(&mut self) -> Result<(), TaskError> {
        self.listener = None;
        self.subscribers.clear();
        let args: PublisherArgs = parse_arguments(self.core.spec())?;

        let listener = TcpListener::bind((args.address.as_str(), args.port))?;
        listener.set_nonblocking(true)?;
        tracing::info!(task = %self.core.spec().name, address = ?listener.local_addr().ok(), "syslog publisher listening");
        self.listener = Some(listener);
        self.core.owner()?;
        Ok(())
    }

    fn on_tick(&mut self) -> Result<(), TaskError> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| TaskError::Failed("syslog publisher is not listening".into()))?;
        let accepted = self.accept(&listener);
        self.listener = Some(listener);
        accepted?;

        let owner = self.core.owner()?;
        let messages = Self::pending(&owner);
        self.publish(&messages);
        Ok(())
    }

    fn on_exit(&mut self) -> Result<(), TaskError> {
        self.listener = None;
        self.subscribers.clear();
        if let Some(workflow) = self.core.workflow() {
            workflow.take_data::<SyslogMessage>();
        }
        Ok(())
    }
}
