//! SCPI client over a raw TCP socket.
//!
//! Anritsu field analyzers (MT9085 ACCESS Master and relatives) expose a SCPI
//! service on TCP port 2288. The protocol is plain text: each command is UTF-8
//! terminated by CR LF, and query commands (conventionally ending in `?`)
//! produce a single text response.
//!
//! # Framing
//!
//! Commands are written in full (`write_all`), followed by a fixed 100 ms pause
//! so the instrument firmware can process the command before anything else is
//! sent or read. Responses get no framing at all: [`ScpiClient::query`] performs
//! exactly one `read` of up to `buffer_size` bytes and returns whatever that
//! call yields, trimmed. A response longer than the buffer, or one the
//! instrument delivers in several TCP segments, comes back truncated.
//!
//! # Example
//!
//! ```no_run
//! use anritsu::{ClientConfig, ScpiClient};
//!
//! let mut client = ScpiClient::new(ClientConfig::new("192.168.1.2"));
//! client.connect()?;
//! let idn = client.query("*IDN?")?;
//! println!("Connected to: {idn}");
//! client.disconnect();
//! # Ok::<(), anritsu::ScpiError>(())
//! ```

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::string::FromUtf8Error;
use std::time::Duration;

use thiserror::Error;

use crate::config::ClientConfig;
use crate::observer::{ClientObserver, Severity, TracingObserver};
use crate::session::ScpiSession;

/// Line terminator appended to every command.
pub const COMMAND_TERMINATOR: &str = "\r\n";

/// Default read size for [`ScpiClient::query`].
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Pause after each command so the firmware can process it.
pub const COMMAND_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Failure kinds reported by [`ScpiClient`].
///
/// Every variant is logged through the client's observer before it is
/// returned. None of them are fatal: the client can keep being used (or be
/// reconnected) after any of them. A send or receive error that shows the peer
/// reset or closed the connection also leaves the client disconnected.
#[derive(Error, Debug)]
pub enum ScpiError {
    /// Operation requires a connection and the client has none. No I/O was
    /// attempted.
    #[error("No active connection")]
    NotConnected,

    /// TCP connection could not be established (refused, unreachable,
    /// handshake timeout, or name resolution failure).
    #[error("Failed to connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Writing a command failed (peer reset, broken pipe, write timeout).
    #[error("Error sending command '{command}': {source}")]
    Send {
        command: String,
        #[source]
        source: io::Error,
    },

    /// No response arrived within the configured timeout.
    #[error("Timed out waiting for response after {0:?}")]
    ReceiveTimeout(Duration),

    /// Reading the response failed for a reason other than the timeout.
    #[error("Error receiving response: {0}")]
    Receive(#[source] io::Error),

    /// Response bytes were not valid UTF-8.
    #[error("Response is not valid UTF-8: {0}")]
    InvalidResponse(#[from] FromUtf8Error),
}

impl ScpiError {
    /// True for [`ScpiError::ReceiveTimeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScpiError::ReceiveTimeout(_))
    }
}

/// Result type for SCPI client operations.
pub type ScpiResult<T> = Result<T, ScpiError>;

/// Append the CR LF terminator to a command and encode it for the wire.
pub fn frame_command(command: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(command.len() + COMMAND_TERMINATOR.len());
    bytes.extend_from_slice(command.as_bytes());
    bytes.extend_from_slice(COMMAND_TERMINATOR.as_bytes());
    bytes
}

/// Errors after which the socket can no longer carry commands.
fn is_connection_lost(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}

/// Synchronous client for one SCPI instrument endpoint.
///
/// The client starts disconnected. [`connect`](Self::connect) opens the socket,
/// [`disconnect`](Self::disconnect) closes it, and the client may be reconnected
/// any number of times. Host, port, and timeout are fixed at construction.
///
/// The client owns its socket exclusively and does no locking; use one client
/// per thread.
pub struct ScpiClient {
    config: ClientConfig,
    stream: Option<TcpStream>,
    observer: Box<dyn ClientObserver>,
}

impl ScpiClient {
    /// Create a disconnected client that logs through `tracing`.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_observer(config, TracingObserver)
    }

    /// Create a disconnected client that reports events to `observer`.
    pub fn with_observer(config: ClientConfig, observer: impl ClientObserver + 'static) -> Self {
        Self {
            config,
            stream: None,
            observer: Box::new(observer),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether the client holds a socket.
    ///
    /// Cleared by [`disconnect`](Self::disconnect) and also when a send or
    /// query finds the peer has reset or closed the connection.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Address of the connected instrument, if any.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().and_then(|s| s.peer_addr().ok())
    }

    fn log(&self, severity: Severity, message: &str) {
        self.observer.record(severity, message);
    }

    /// Open a TCP connection to the configured endpoint.
    ///
    /// Every address `host:port` resolves to is tried in turn with the
    /// configured timeout; the first that accepts wins. Read and write
    /// timeouts are set to the same value. A client that is already connected
    /// disconnects first.
    ///
    /// # Errors
    ///
    /// Returns [`ScpiError::Connection`] and leaves the client disconnected if
    /// no address accepts the connection.
    pub fn connect(&mut self) -> ScpiResult<()> {
        self.disconnect();

        let addr = self.config.address();
        self.log(Severity::Info, &format!("Connecting to {addr} ..."));

        match self.open_stream(&addr) {
            Ok(stream) => {
                self.stream = Some(stream);
                self.log(Severity::Info, "Connection established");
                Ok(())
            }
            Err(source) => {
                let err = ScpiError::Connection { addr, source };
                self.log(Severity::Error, &err.to_string());
                Err(err)
            }
        }
    }

    fn open_stream(&self, addr: &str) -> io::Result<TcpStream> {
        let timeout = self.config.timeout;
        let mut last_err = None;

        for sock_addr in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&sock_addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "host resolved to no addresses",
            )
        }))
    }

    /// Close the connection if one is open. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if self.close_stream() {
            self.log(Severity::Info, "Connection closed");
        }
    }

    fn close_stream(&mut self) -> bool {
        match self.stream.take() {
            Some(stream) => {
                // Peer may already be gone; the handle is dropped either way.
                let _ = stream.shutdown(Shutdown::Both);
                true
            }
            None => false,
        }
    }

    /// Drop the socket if `kind` means the peer is gone.
    fn drop_if_lost(&mut self, kind: io::ErrorKind) {
        if is_connection_lost(kind) && self.close_stream() {
            self.log(Severity::Info, "Connection lost");
        }
    }

    /// Send one command without reading anything back.
    ///
    /// Writes `command` followed by CR LF in full, then sleeps for
    /// [`COMMAND_SETTLE_DELAY`].
    ///
    /// # Errors
    ///
    /// - [`ScpiError::NotConnected`] if there is no connection (nothing is
    ///   written).
    /// - [`ScpiError::Send`] if the write fails.
    pub fn send_command(&mut self, command: &str) -> ScpiResult<()> {
        let frame = frame_command(command);
        let written = match self.stream.as_mut() {
            Some(stream) => stream.write_all(&frame).and_then(|()| stream.flush()),
            None => return Err(self.not_connected()),
        };

        if let Err(source) = written {
            let kind = source.kind();
            let err = ScpiError::Send {
                command: command.to_string(),
                source,
            };
            self.log(Severity::Error, &err.to_string());
            self.drop_if_lost(kind);
            return Err(err);
        }

        std::thread::sleep(COMMAND_SETTLE_DELAY);
        self.log(Severity::Debug, &format!("Command sent: {command}"));
        Ok(())
    }

    /// Send a query and read its response with the default buffer size.
    ///
    /// See [`query_with_buffer`](Self::query_with_buffer).
    pub fn query(&mut self, command: &str) -> ScpiResult<String> {
        self.query_with_buffer(command, DEFAULT_BUFFER_SIZE)
    }

    /// Send a query and perform a single read of up to `buffer_size` bytes.
    ///
    /// The response is decoded as UTF-8 and trimmed of surrounding whitespace,
    /// including the terminator. If the peer closed the connection the result
    /// is an empty string and the client is left disconnected.
    ///
    /// # Errors
    ///
    /// - [`ScpiError::NotConnected`] if there is no connection (nothing is
    ///   written or read).
    /// - [`ScpiError::Send`] if the command could not be written; no read is
    ///   attempted.
    /// - [`ScpiError::ReceiveTimeout`] if nothing arrives within the timeout.
    /// - [`ScpiError::Receive`] for any other read failure.
    /// - [`ScpiError::InvalidResponse`] if the bytes are not UTF-8.
    pub fn query_with_buffer(&mut self, command: &str, buffer_size: usize) -> ScpiResult<String> {
        if self.stream.is_none() {
            return Err(self.not_connected());
        }

        self.send_command(command)?;

        let mut buf = vec![0u8; buffer_size];
        let read = match self.stream.as_mut() {
            Some(stream) => stream.read(&mut buf),
            None => return Err(self.not_connected()),
        };

        let n = match read {
            Ok(n) => n,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                ) =>
            {
                let err = ScpiError::ReceiveTimeout(self.config.timeout);
                self.log(Severity::Error, &err.to_string());
                return Err(err);
            }
            Err(e) => {
                let kind = e.kind();
                let err = ScpiError::Receive(e);
                self.log(Severity::Error, &err.to_string());
                self.drop_if_lost(kind);
                return Err(err);
            }
        };

        if n == 0 && buffer_size > 0 {
            self.drop_if_lost(io::ErrorKind::UnexpectedEof);
        }

        buf.truncate(n);
        let text = match String::from_utf8(buf) {
            Ok(text) => text,
            Err(e) => {
                let err = ScpiError::from(e);
                self.log(Severity::Error, &err.to_string());
                return Err(err);
            }
        };

        let response = text.trim().to_string();
        self.log(Severity::Debug, &format!("Response received: {response}"));
        Ok(response)
    }

    fn not_connected(&self) -> ScpiError {
        let err = ScpiError::NotConnected;
        self.log(Severity::Error, &err.to_string());
        err
    }

    /// Connect and return a guard that disconnects when dropped.
    ///
    /// The guard is returned even if the connection failed; check
    /// [`ScpiSession::is_connected`] before issuing commands.
    ///
    /// ```no_run
    /// use anritsu::{ClientConfig, ScpiClient};
    ///
    /// let mut client = ScpiClient::new(ClientConfig::new("192.168.1.2"));
    /// let mut session = client.session();
    /// if session.is_connected() {
    ///     println!("{}", session.query("*IDN?")?);
    /// }
    /// # Ok::<(), anritsu::ScpiError>(())
    /// ```
    pub fn session(&mut self) -> ScpiSession<'_> {
        ScpiSession::open(self)
    }
}

impl Drop for ScpiClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(Severity, String)>>>);

    impl ClientObserver for Recorder {
        fn record(&self, severity: Severity, message: &str) {
            self.0.lock().unwrap().push((severity, message.to_string()));
        }
    }

    fn disconnected_client() -> (ScpiClient, Recorder) {
        let recorder = Recorder::default();
        let config = ClientConfig::new("127.0.0.1").with_port(1);
        (ScpiClient::with_observer(config, recorder.clone()), recorder)
    }

    #[test]
    fn test_frame_appends_crlf() {
        assert_eq!(frame_command("*IDN?"), b"*IDN?\r\n".to_vec());
        assert_eq!(frame_command(""), b"\r\n".to_vec());
    }

    #[test]
    fn test_frame_keeps_utf8_bytes() {
        assert_eq!(frame_command("UNIT µs"), "UNIT µs\r\n".as_bytes().to_vec());
    }

    #[test]
    fn test_new_client_is_disconnected() {
        let client = ScpiClient::new(ClientConfig::new("127.0.0.1"));
        assert!(!client.is_connected());
        assert!(client.peer_addr().is_none());
        assert_eq!(client.config().port, 2288);
    }

    #[test]
    fn test_send_without_connection_fails_fast() {
        let (mut client, recorder) = disconnected_client();
        let result = client.send_command("*RST");
        assert!(matches!(result, Err(ScpiError::NotConnected)));

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], (Severity::Error, "No active connection".to_string()));
    }

    #[test]
    fn test_query_without_connection_logs_once() {
        let (mut client, recorder) = disconnected_client();
        let result = client.query("*IDN?");
        assert!(matches!(result, Err(ScpiError::NotConnected)));
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_disconnect_when_disconnected_is_silent() {
        let (mut client, recorder) = disconnected_client();
        client.disconnect();
        client.disconnect();
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unresolvable_host_is_connection_error() {
        let config = ClientConfig::new("host.invalid").with_timeout(Duration::from_secs(1));
        let mut client = ScpiClient::with_observer(config, NullObserver);
        let result = client.connect();
        assert!(matches!(result, Err(ScpiError::Connection { .. })));
        assert!(!client.is_connected());
    }

    #[test]
    fn test_error_classification() {
        assert!(ScpiError::ReceiveTimeout(Duration::from_secs(1)).is_timeout());
        assert!(!ScpiError::NotConnected.is_timeout());
        assert!(!ScpiError::Receive(io::Error::from(io::ErrorKind::ConnectionReset)).is_timeout());
    }

    #[test]
    fn test_connection_lost_kinds() {
        assert!(is_connection_lost(io::ErrorKind::BrokenPipe));
        assert!(is_connection_lost(io::ErrorKind::ConnectionReset));
        assert!(is_connection_lost(io::ErrorKind::ConnectionAborted));
        assert!(!is_connection_lost(io::ErrorKind::TimedOut));
        assert!(!is_connection_lost(io::ErrorKind::WouldBlock));
    }

    #[test]
    fn test_error_messages() {
        let err = ScpiError::Connection {
            addr: "10.0.0.1:2288".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert!(err.to_string().starts_with("Failed to connect to 10.0.0.1:2288"));

        let err = ScpiError::ReceiveTimeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "Timed out waiting for response after 10s");
    }
}
