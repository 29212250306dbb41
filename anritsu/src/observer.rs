//! Injected logging for the SCPI client.
//!
//! The client reports lifecycle and failure events to a [`ClientObserver`]
//! instead of writing to a process-wide logger. Production code uses
//! [`TracingObserver`], which forwards everything to `tracing`. Tests swap in
//! an observer that records events so log output can be asserted on.

use std::fmt;

use tracing::{debug, error, info};

/// Severity of an event reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Command and response text.
    Debug,
    /// Connect and disconnect lifecycle.
    Info,
    /// Every failure path.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Receiver for client log events.
///
/// Log output is a side channel only. Callers make decisions from the
/// `ScpiResult` returned by each operation, never from observed events.
pub trait ClientObserver: Send {
    /// Record a single event.
    fn record(&self, severity: Severity, message: &str);
}

/// Forwards client events to `tracing` under the `anritsu::scpi` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ClientObserver for TracingObserver {
    fn record(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => debug!(target: "anritsu::scpi", "{message}"),
            Severity::Info => info!(target: "anritsu::scpi", "{message}"),
            Severity::Error => error!(target: "anritsu::scpi", "{message}"),
        }
    }
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ClientObserver for NullObserver {
    fn record(&self, _severity: Severity, _message: &str) {}
}
