//! A trait-object-free abstraction over the plain, TLS and simulated
//! connection variants

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use native_tls::{TlsConnector, TlsStream};

use crate::transport::smtp::client::SmtpSimulator;
use crate::transport::smtp::error::Error;

/// The underlying connection of an SMTP session
#[derive(Debug)]
pub enum NetworkStream {
    /// Plain TCP
    Tcp(TcpStream),
    /// TCP wrapped in TLS after a `STARTTLS` upgrade
    Tls(Box<TlsStream<TcpStream>>),
    /// In-process simulator, no socket involved
    Simulated(SmtpSimulator),
}

impl NetworkStream {
    /// Opens a TCP connection to the given server
    pub fn connect<A: ToSocketAddrs>(server: A, timeout: Option<Duration>) -> Result<NetworkStream, Error> {
        let stream = match timeout {
            Some(duration) => {
                let mut addrs = server.to_socket_addrs()?;
                let addr = addrs
                    .next()
                    .ok_or(Error::Client("could not resolve the server address"))?;
                TcpStream::connect_timeout(&addr, duration)?
            }
            None => TcpStream::connect(server)?,
        };
        Ok(NetworkStream::Tcp(stream))
    }

    /// Wraps a dry-run simulator
    pub fn simulated(host: &str, port: u16) -> NetworkStream {
        NetworkStream::Simulated(SmtpSimulator::connect(host, port))
    }

    /// Tells if the stream is encrypted
    pub fn is_encrypted(&self) -> bool {
        matches!(self, NetworkStream::Tls(_))
    }

    /// Upgrades a plain stream to TLS
    ///
    /// Does nothing on an already-encrypted or simulated stream.
    pub fn upgrade_tls(&mut self, connector: &TlsConnector, domain: &str) -> Result<(), Error> {
        if let NetworkStream::Tcp(stream) = self {
            // try_clone shares the socket, the plain variant is dropped right
            // after the handshake
            let tls = connector
                .connect(domain, stream.try_clone()?)
                .map_err(|e| match e {
                    native_tls::HandshakeError::Failure(e) => Error::Tls(e),
                    native_tls::HandshakeError::WouldBlock(_) => {
                        Error::Client("TLS handshake interrupted")
                    }
                })?;
            *self = NetworkStream::Tls(Box::new(tls));
        }
        Ok(())
    }

    /// Shuts down the write half of the connection
    pub fn shutdown(&mut self) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(stream) => stream.shutdown(Shutdown::Write),
            NetworkStream::Tls(stream) => stream.shutdown(),
            NetworkStream::Simulated(_) => Ok(()),
        }
    }

    /// Sets the read timeout of the underlying socket
    pub fn set_read_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(stream) => stream.set_read_timeout(duration),
            NetworkStream::Tls(stream) => stream.get_ref().set_read_timeout(duration),
            NetworkStream::Simulated(_) => Ok(()),
        }
    }

    /// Sets the write timeout of the underlying socket
    pub fn set_write_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(stream) => stream.set_write_timeout(duration),
            NetworkStream::Tls(stream) => stream.get_ref().set_write_timeout(duration),
            NetworkStream::Simulated(_) => Ok(()),
        }
    }
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            NetworkStream::Tcp(stream) => stream.read(buf),
            NetworkStream::Tls(stream) => stream.read(buf),
            NetworkStream::Simulated(simulator) => simulator.read(buf),
        }
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            NetworkStream::Tcp(stream) => stream.write(buf),
            NetworkStream::Tls(stream) => stream.write(buf),
            NetworkStream::Simulated(simulator) => simulator.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(stream) => stream.flush(),
            NetworkStream::Tls(stream) => stream.flush(),
            NetworkStream::Simulated(simulator) => simulator.flush(),
        }
    }
}
