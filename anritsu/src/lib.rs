//! Remote control of Anritsu cable and antenna analyzers over SCPI.
//!
//! The instruments (MT9085 ACCESS Master and related models) accept SCPI
//! commands as CR LF terminated text on a raw TCP socket, port 2288 by default.
//! This crate provides a thin synchronous client for that service:
//!
//! - [`ScpiClient`] - connect, send commands, run single-read queries
//! - [`ScpiSession`] - scoped connection that always disconnects on drop
//! - [`ClientConfig`] / [`ConnectionArgs`] - endpoint settings from code, JSON, or CLI flags
//! - [`ClientObserver`] - injected logging; [`TracingObserver`] by default
//!
//! Responses are returned as raw trimmed text. The crate does not validate or
//! parse SCPI.
//!
//! # Binaries
//!
//! - `mt9085_idn` - connect and print the `*IDN?` identification string
//! - `scpi_shell` - interactive console for sending commands and queries

pub mod config;
pub mod observer;
pub mod scpi;
pub mod session;

pub use config::{ClientConfig, ConfigError, ConnectionArgs, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use observer::{ClientObserver, NullObserver, Severity, TracingObserver};
pub use scpi::{
    frame_command, ScpiClient, ScpiError, ScpiResult, COMMAND_SETTLE_DELAY, COMMAND_TERMINATOR,
    DEFAULT_BUFFER_SIZE,
};
pub use session::ScpiSession;
