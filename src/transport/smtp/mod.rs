//! A synchronous SMTP client
//!
//! Follows [RFC 5321](https://tools.ietf.org/html/rfc5321) and relies on the
//! remote server for most sanity and compliance checks. Implemented
//! extensions:
//!
//! * 8BITMIME ([RFC 6152](https://tools.ietf.org/html/rfc6152))
//! * AUTH ([RFC 4954](https://tools.ietf.org/html/rfc4954)) with the PLAIN
//!   and LOGIN mechanisms
//! * STARTTLS ([RFC 2487](https://tools.ietf.org/html/rfc2487))
//!
//! The client runs over a [`NetworkStream`](client::NetworkStream), which is
//! either a TCP socket (optionally upgraded to TLS) or the in-process
//! [`SmtpSimulator`](client::SmtpSimulator).

pub mod authentication;
pub mod client;
pub mod commands;
pub mod error;
pub mod extension;
pub mod response;

/// The line ending for SMTP transactions
pub const CRLF: &str = "\r\n";

/// The terminator for message content sent after `DATA`
pub const MESSAGE_ENDING: &str = "\r\n.\r\n";
