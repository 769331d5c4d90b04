//! # TCP Transport
//!
//! Network printers accept raw ESC/POS on a plain TCP socket, port 9100 by
//! convention ("JetDirect" / raw printing).

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use super::{AbortHandle, Channel, Connection, Connector};
use crate::error::ConnectionError;

pub const DEFAULT_PORT: u16 = 9100;

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

pub type TcpConnection = Connection<TcpConnector>;

/// Connects to a network printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpConnector {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    /// Parse `host` or `host:port`. IPv6 literals need brackets when a port
    /// is given (`[::1]:9100`).
    pub fn parse(address: &str) -> Result<Self, String> {
        if let Ok(addr) = address.parse::<SocketAddr>() {
            return Ok(Self::new(addr.ip().to_string(), addr.port()));
        }
        match address.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                let port = port
                    .parse()
                    .map_err(|_| format!("Invalid port in '{}'", address))?;
                if host.is_empty() {
                    return Err(format!("Missing host in '{}'", address));
                }
                Ok(Self::new(host, port))
            }
            _ if address.is_empty() => Err("Missing host".to_string()),
            _ => Ok(Self::new(address.trim_matches(['[', ']']), DEFAULT_PORT)),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Connector for TcpConnector {
    type Channel = TcpChannel;

    fn connect(&mut self) -> Result<TcpChannel, ConnectionError> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| ConnectionError::DeviceNotFound(format!("{}: {}", self.describe(), e)))?
            .collect();
        if addrs.is_empty() {
            return Err(ConnectionError::DeviceNotFound(self.describe()));
        }

        let mut last_error = None;
        for addr in addrs {
            debug!(%addr, "connecting");
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true).map_err(ConnectionError::Open)?;
                    return Ok(TcpChannel { stream });
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(match last_error {
            Some(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                ConnectionError::Timeout {
                    after_ms: self.connect_timeout.as_millis() as u64,
                }
            }
            Some(e) => ConnectionError::Open(e),
            None => ConnectionError::DeviceNotFound(self.describe()),
        })
    }

    fn describe(&self) -> String {
        format!("tcp:{}:{}", self.host, self.port)
    }
}

/// A connected printer socket.
#[derive(Debug)]
pub struct TcpChannel {
    stream: TcpStream,
}

impl Write for TcpChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Read for TcpChannel {
    /// End of stream is an error here: the printer hung up.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.read(buf)? {
            0 if !buf.is_empty() => Err(io::Error::new(
                ErrorKind::ConnectionAborted,
                "printer closed the connection",
            )),
            n => Ok(n),
        }
    }
}

impl Channel for TcpChannel {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        // a zero timeout is rejected by the OS
        self.stream
            .set_read_timeout(Some(timeout.max(Duration::from_millis(1))))
    }

    /// Shutting the socket down wakes a `send` blocked on a full buffer.
    fn abort_handle(&self) -> Option<AbortHandle> {
        let stream = match self.stream.try_clone() {
            Ok(stream) => stream,
            Err(e) => {
                debug!(error = %e, "socket cannot be cloned, interrupts wait for the next write");
                return None;
            }
        };
        Some(Box::new(move || {
            let _ = stream.shutdown(Shutdown::Both);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    use crate::error::TransportError;
    use crate::transport::{ConnectionState, Transport};

    #[test]
    fn test_parse_address() {
        let c = TcpConnector::parse("192.168.1.50").unwrap();
        assert_eq!((c.host(), c.port()), ("192.168.1.50", 9100));

        let c = TcpConnector::parse("printer.local:9101").unwrap();
        assert_eq!((c.host(), c.port()), ("printer.local", 9101));

        let c = TcpConnector::parse("[::1]:9100").unwrap();
        assert_eq!((c.host(), c.port()), ("::1", 9100));

        assert!(TcpConnector::parse("host:port").is_err());
        assert!(TcpConnector::parse(":9100").is_err());
    }

    #[test]
    fn test_unresolvable_host() {
        let mut connector = TcpConnector::new("no-such-printer.invalid", DEFAULT_PORT);
        assert!(matches!(
            connector.connect(),
            Err(ConnectionError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_loopback_printer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).unwrap();
            received
        });

        let mut conn = Connection::new(TcpConnector::new("127.0.0.1", port));
        conn.open().unwrap();
        assert_eq!(conn.write(&[0x1B, 0x40, 0x0A]).unwrap(), 3);

        // nothing is sent back
        let reply = conn.read_available(1, Duration::from_millis(20)).unwrap();
        assert!(reply.is_empty());

        conn.close();
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(server.join().unwrap(), vec![0x1B, 0x40, 0x0A]);

        assert!(matches!(
            conn.write(b"late"),
            Err(TransportError::Connection(ConnectionError::NotConnected { .. }))
        ));
    }

    #[test]
    fn test_interrupt_unblocks_stuck_write() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let server = thread::spawn(move || {
            // accept, then never read
            let (socket, _) = listener.accept().unwrap();
            let _ = done_rx.recv();
            drop(socket);
        });

        let mut conn = Connection::new(TcpConnector::new("127.0.0.1", port));
        conn.open().unwrap();
        let interrupter = conn.interrupter().unwrap();

        let writer = thread::spawn(move || {
            let payload = vec![0u8; 64 * 1024 * 1024];
            let started = Instant::now();
            let result = conn.write(&payload);
            (result, started.elapsed(), conn.state())
        });

        thread::sleep(Duration::from_millis(200));
        interrupter.interrupt();
        let (result, elapsed, state) = writer.join().unwrap();
        let _ = done_tx.send(());
        server.join().unwrap();

        match result {
            Err(TransportError::PartialWriteFailure {
                written,
                requested,
                source,
            }) => {
                assert!(written < requested);
                assert_eq!(source.kind(), ErrorKind::Interrupted);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
        assert_eq!(state, ConnectionState::Faulted);
    }

    #[test]
    fn test_peer_hangup_is_a_read_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            drop(socket);
        });

        let mut conn = Connection::new(TcpConnector::new("127.0.0.1", port));
        conn.open().unwrap();
        server.join().unwrap();

        let err = conn.read_available(1, Duration::from_millis(500)).unwrap_err();
        assert!(matches!(err, TransportError::ReadFailure(ref e) if e.kind() == ErrorKind::ConnectionAborted));
        assert_eq!(conn.state(), ConnectionState::Faulted);
    }
}
