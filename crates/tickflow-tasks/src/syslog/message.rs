//! Syslog message front parsing.

use std::fmt;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};

/// Priority assumed when a message carries no valid `<PRI>` header
/// (facility `user`, severity `notice`).
pub const DEFAULT_PRIORITY: u8 = 13;

const MAX_PRIORITY: u8 = 191;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Informational,
    Debug,
}

impl Severity {
    fn from_code(code: u8) -> Self {
        match code & 0x07 {
            0 => Self::Emergency,
            1 => Self::Alert,
            2 => Self::Critical,
            3 => Self::Error,
            4 => Self::Warning,
            5 => Self::Notice,
            6 => Self::Informational,
            _ => Self::Debug,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Emergency => "emerg",
            Self::Alert => "alert",
            Self::Critical => "crit",
            Self::Error => "err",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Informational => "info",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A received syslog message.
///
/// Only the `<PRI>` header is decoded; everything after it is kept verbatim
/// as the message text (RFC 3164 and RFC 5424 alike).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyslogMessage {
    pub facility: u8,
    pub severity: Severity,
    pub text: String,
    pub received: DateTime<Utc>,
    pub source: Option<SocketAddr>,
}

impl SyslogMessage {
    pub fn new(facility: u8, severity: Severity, text: impl Into<String>) -> Self {
        Self {
            facility,
            severity,
            text: text.into(),
            received: Utc::now(),
            source: None,
        }
    }

    /// Parse a raw message received at `received`.
    pub fn parse(raw: &str, received: DateTime<Utc>) -> Self {
        let raw = raw.trim_end_matches(['\n', '\r', '\0']);
        let (priority, text) = split_priority(raw).unwrap_or((DEFAULT_PRIORITY, raw));
        Self {
            facility: priority >> 3,
            severity: Severity::from_code(priority),
            text: text.to_string(),
            received,
            source: None,
        }
    }

    pub fn with_source(mut self, source: SocketAddr) -> Self {
        self.source = Some(source);
        self
    }

    pub fn priority(&self) -> u8 {
        (self.facility << 3) | self.severity.code()
    }
}

/// Splits `<PRI>rest` into the priority value and `rest`.
fn split_priority(raw: &str) -> Option<(u8, &str)> {
    let rest = raw.strip_prefix('<')?;
    let end = rest.find('>')?;
    let digits = &rest[..end];
    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let priority: u8 = digits.parse().ok()?;
    (priority <= MAX_PRIORITY).then(|| (priority, &rest[end + 1..]))
}

/// Wire form: `<PRI>text`.
impl fmt::Display for SyslogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>{}", self.priority(), self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_priority() {
        let msg = SyslogMessage::parse("<34>Oct 11 22:14:15 mymachine su: 'su root' failed\n", Utc::now());
        assert_eq!(msg.facility, 4);
        assert_eq!(msg.severity, Severity::Critical);
        assert_eq!(msg.text, "Oct 11 22:14:15 mymachine su: 'su root' failed");
        assert_eq!(msg.priority(), 34);
    }

    #[test]
    fn test_parse_rfc5424_keeps_version() {
        let msg = SyslogMessage::parse("<165>1 2003-10-11T22:14:15.003Z host app - ID47 - hi", Utc::now());
        assert_eq!(msg.facility, 20);
        assert_eq!(msg.severity, Severity::Notice);
        assert!(msg.text.starts_with("1 2003-10-11"));
    }

    #[test]
    fn test_missing_or_bad_priority_uses_default() {
        for raw in ["plain text", "<>x", "<1234>x", "<192>x", "<a1>x", "<13"] {
            let msg = SyslogMessage::parse(raw, Utc::now());
            assert_eq!(msg.priority(), DEFAULT_PRIORITY, "{raw}");
            assert_eq!(msg.text, raw);
        }
    }

    #[test]
    fn test_display_is_wire_form() {
        let msg = SyslogMessage::new(1, Severity::Warning, "disk full");
        assert_eq!(msg.to_string(), "<12>disk full");
        assert_eq!(SyslogMessage::parse(&msg.to_string(), msg.received), msg);
    }
}
