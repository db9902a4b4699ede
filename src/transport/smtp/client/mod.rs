//! SMTP client
//!
//! `SmtpConnection` drives one synchronous SMTP session over a
//! [`NetworkStream`], which is either a real socket (plain or TLS) or the
//! in-process [`SmtpSimulator`] used for dry runs.

use std::fmt::Display;
use std::io::{BufRead, BufReader, Write};
use std::time::Duration;

use log::debug;
use native_tls::TlsConnector;

use crate::envelope::Envelope;
use crate::transport::smtp::authentication::{Credentials, Mechanism};
use crate::transport::smtp::commands::{Auth, Data, Ehlo, Mail, Quit, Rcpt, Starttls};
use crate::transport::smtp::error::Error;
use crate::transport::smtp::extension::{
    ClientId, Extension, MailBodyParameter, MailParameter, ServerInfo,
};
use crate::transport::smtp::response::{parse_response, Response};
use crate::transport::smtp::{CRLF, MESSAGE_ENDING};

mod net;
mod simulator;

pub use self::net::NetworkStream;
pub use self::simulator::SmtpSimulator;

/// Incremental dot-stuffing encoder for the `DATA` payload
///
/// [RFC 5321, section 4.5.2](https://tools.ietf.org/html/rfc5321#section-4.5.2)
#[derive(Debug)]
pub struct ClientCodec {
    at_line_start: bool,
}

impl ClientCodec {
    /// Creates a new codec, positioned at the start of a line
    pub fn new() -> ClientCodec {
        ClientCodec {
            at_line_start: true,
        }
    }

    /// Appends the dot-stuffed form of `frame` to `buf`
    pub fn encode(&mut self, frame: &[u8], buf: &mut Vec<u8>) {
        for &byte in frame {
            if self.at_line_start && byte == b'.' {
                buf.push(b'.');
            }
            buf.push(byte);
            self.at_line_start = byte == b'\n';
        }
    }
}

impl Default for ClientCodec {
    fn default() -> Self {
        ClientCodec::new()
    }
}

/// Makes a line-oriented exchange printable on a single log line
fn escape_crlf(string: &str) -> String {
    string
        .replace("\r\n", "<CRLF>")
        .replace('\r', "<CR>")
        .replace('\n', "<LF>")
}

/// A connected SMTP session
///
/// The connection starts out without server information. An explicit
/// [`ehlo`](SmtpConnection::ehlo) fills it in and unlocks the feature and
/// authentication negotiation built on top of it.
#[derive(Debug)]
pub struct SmtpConnection {
    stream: BufReader<NetworkStream>,
    server_info: ServerInfo,
    panic: bool,
}

impl SmtpConnection {
    /// Connects to the given server and reads its greeting
    pub fn connect(server: &str, port: u16, timeout: Option<Duration>) -> Result<SmtpConnection, Error> {
        let stream = NetworkStream::connect((server, port), timeout)?;
        let mut conn = SmtpConnection {
            stream: BufReader::new(stream),
            server_info: ServerInfo::default(),
            panic: false,
        };
        conn.set_timeout(timeout)?;
        conn.read_response()?;
        Ok(conn)
    }

    /// Opens a simulated session that never touches the network
    pub fn simulated(server: &str, port: u16) -> Result<SmtpConnection, Error> {
        let mut conn = SmtpConnection {
            stream: BufReader::new(NetworkStream::simulated(server, port)),
            server_info: ServerInfo::default(),
            panic: false,
        };
        conn.read_response()?;
        Ok(conn)
    }

    /// What the server announced about itself, empty before `ehlo`
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Tells if the underlying stream is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.stream.get_ref().is_encrypted()
    }

    /// Tells if the connection was left in an unusable state
    pub fn has_broken(&self) -> bool {
        self.panic
    }

    /// Sends `EHLO` and records the advertised features
    pub fn ehlo(&mut self, client_id: &ClientId) -> Result<(), Error> {
        let response = self.command(Ehlo::new(client_id.clone()))?;
        self.server_info = ServerInfo::from_response(&response)?;
        debug!("server {}", self.server_info);
        Ok(())
    }

    /// Upgrades the session to TLS, then re-identifies with `EHLO`
    ///
    /// The previous feature set is discarded since servers may advertise a
    /// different one once encrypted.
    pub fn starttls(&mut self, domain: &str, client_id: &ClientId) -> Result<(), Error> {
        if !self.server_info.supports_feature(Extension::StartTls) {
            return Err(Error::Client("the server does not support STARTTLS"));
        }
        self.command(Starttls)?;
        let connector = TlsConnector::new()?;
        self.stream.get_mut().upgrade_tls(&connector, domain)?;
        debug!("connection encrypted");
        self.ehlo(client_id)
    }

    /// Authenticates with the first of `mechanisms` the server supports
    pub fn auth(
        &mut self,
        mechanisms: &[Mechanism],
        credentials: &Credentials,
    ) -> Result<Response, Error> {
        let mechanism = self
            .server_info
            .get_auth_mechanism(mechanisms)
            .ok_or(Error::Client("no compatible authentication mechanism"))?;

        let mut response = self.command(Auth::new(mechanism, credentials, None)?)?;
        // 334 replies carry a base64 challenge to answer; no sane mechanism
        // needs more than a couple of rounds
        for _ in 0..4 {
            if !response.has_code(334) {
                return Ok(response);
            }
            response = self.command(Auth::from_response(mechanism, credentials, &response)?)?;
        }
        Err(Error::Client("the server keeps sending auth challenges"))
    }

    /// Sends a full message to the given envelope
    pub fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        let mut parameters = Vec::new();
        if self.server_info.supports_feature(Extension::EightBitMime) {
            parameters.push(MailParameter::Body(MailBodyParameter::EightBitMime));
        }
        if self.server_info.supports_feature(Extension::SmtpUtfEight)
            && !envelope.is_ascii()
        {
            parameters.push(MailParameter::SmtpUtfEight);
        }

        self.command(Mail::new(Some(envelope.from().clone()), parameters))?;
        for recipient in envelope.to() {
            self.command(Rcpt::new(recipient.clone()))?;
        }
        self.command(Data)?;
        self.message(email)
    }

    /// Sends the message content after `DATA` was accepted
    fn message(&mut self, message: &[u8]) -> Result<Response, Error> {
        let mut codec = ClientCodec::new();
        let mut out = Vec::with_capacity(message.len());
        codec.encode(message, &mut out);
        if out.ends_with(CRLF.as_bytes()) {
            out.extend_from_slice(b".\r\n");
        } else {
            out.extend_from_slice(MESSAGE_ENDING.as_bytes());
        }
        self.write(&out)?;
        self.read_response()
    }

    /// Sends `QUIT` and lets the server close the session
    pub fn quit(&mut self) -> Result<Response, Error> {
        self.command(Quit)
    }

    /// Tears the connection down without the closing handshake
    pub fn abort(&mut self) {
        // Only try a clean shutdown once
        if !self.panic {
            self.panic = true;
            let _ = self.command(Quit);
        }
        let _ = self.stream.get_mut().shutdown();
    }

    /// Sets the socket read and write timeouts
    pub fn set_timeout(&mut self, duration: Option<Duration>) -> Result<(), Error> {
        self.stream.get_mut().set_read_timeout(duration)?;
        self.stream.get_mut().set_write_timeout(duration)?;
        Ok(())
    }

    /// Sends a command and reads the reply, erroring on negative replies
    pub fn command<C: Display>(&mut self, command: C) -> Result<Response, Error> {
        self.write(command.to_string().as_bytes())?;
        self.read_response()
    }

    fn write(&mut self, string: &[u8]) -> Result<(), Error> {
        self.stream.get_mut().write_all(string)?;
        self.stream.get_mut().flush()?;
        debug!(">> {}", escape_crlf(&String::from_utf8_lossy(string)));
        Ok(())
    }

    /// Reads lines until they form a complete reply
    pub fn read_response(&mut self) -> Result<Response, Error> {
        let mut buffer = String::with_capacity(100);

        loop {
            let read = self.stream.read_line(&mut buffer)?;
            if read == 0 {
                self.panic = true;
                return Err(Error::ResponseParsing(
                    "connection closed mid-response".to_owned(),
                ));
            }

            match parse_response(&buffer) {
                Ok((_, response)) => {
                    debug!("<< {}", escape_crlf(&buffer));
                    if response.is_positive() {
                        return Ok(response);
                    }
                    return Err(response.into());
                }
                Err(nom::Err::Incomplete(_)) => continue,
                Err(e) => {
                    self.panic = true;
                    return Err(Error::ResponseParsing(e.to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{escape_crlf, ClientCodec};

    fn encoded(frames: &[&[u8]]) -> Vec<u8> {
        let mut codec = ClientCodec::new();
        let mut out = Vec::new();
        for frame in frames {
            codec.encode(frame, &mut out);
        }
        out
    }

    #[test]
    fn dot_stuffing() {
        assert_eq!(encoded(&[b"test\r\n"]), b"test\r\n");
        assert_eq!(encoded(&[b".test\r\n"]), b"..test\r\n");
        assert_eq!(encoded(&[b"a\r\n.b\r\n"]), b"a\r\n..b\r\n");
        assert_eq!(encoded(&[b"a\r\nb.c\r\n"]), b"a\r\nb.c\r\n");
        // Line state carries across frames
        assert_eq!(encoded(&[b"a\r\n", b".b\r\n"]), b"a\r\n..b\r\n");
        assert_eq!(encoded(&[b"a", b".b\r\n"]), b"a.b\r\n");
    }

    #[test]
    fn escape_crlf_for_logging() {
        assert_eq!(escape_crlf("hello"), "hello");
        assert_eq!(
            escape_crlf("EHLO me\r\nMAIL FROM:<a@b.c>\r\n"),
            "EHLO me<CRLF>MAIL FROM:<a@b.c><CRLF>"
        );
        assert_eq!(escape_crlf("a\rb\nc"), "a<CR>b<LF>c");
    }
}
