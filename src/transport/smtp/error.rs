//! Error type for the SMTP client

use std::io;

use crate::transport::smtp::response::{Code, Response, Severity};

/// The errors that may occur during an SMTP conversation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transient SMTP error, 4yz reply code
    ///
    /// [RFC 5321, section 4.2.1](https://tools.ietf.org/html/rfc5321#section-4.2.1)
    #[error("transient error ({code}): {}", .message.join(" / "))]
    Transient {
        /// The remote status code
        code: Code,
        /// The remote status text, one entry per reply line
        message: Vec<String>,
    },

    /// Permanent SMTP error, 5yz reply code
    #[error("permanent error ({code}): {}", .message.join(" / "))]
    Permanent {
        /// The remote status code
        code: Code,
        /// The remote status text, one entry per reply line
        message: Vec<String>,
    },

    /// The server reply could not be parsed
    #[error("could not parse the server response: {0}")]
    ResponseParsing(String),

    /// Internal client error
    #[error("client error: {0}")]
    Client(&'static str),

    /// Underlying network I/O error
    #[error("network error")]
    Network(#[from] io::Error),

    /// TLS handshake or configuration error
    #[error("TLS error")]
    Tls(#[from] native_tls::Error),
}

impl From<Response> for Error {
    /// Maps a negative reply to the matching error kind, keeping the remote
    /// status text
    fn from(response: Response) -> Error {
        let code = response.code();
        let message = response.message().map(str::to_owned).collect();
        match code.severity() {
            Severity::TransientNegativeCompletion => Error::Transient { code, message },
            Severity::PermanentNegativeCompletion => Error::Permanent { code, message },
            _ => Error::Client("unexpected positive response"),
        }
    }
}
