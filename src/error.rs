//! Crate-level error type

use std::io;

use hickory_resolver::error::ResolveError;

use crate::transport::smtp;

/// The errors that may occur while building or delivering a message
///
/// Every variant is fatal to the invocation: this is a single-shot tool, so
/// no error is recovered locally and none are swallowed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required header was absent or unparseable while inferring an
    /// envelope field from the message data
    #[error("cannot infer the \"{field}\" address from the message data: {reason}")]
    AddressInference {
        /// The envelope field that could not be filled (`from` or `to`)
        field: &'static str,
        /// Why inference failed
        reason: String,
    },

    /// The MX lookup for a recipient domain returned no usable record
    #[error("no mail server found for domain {0}")]
    NoMailServer(String),

    /// The DNS query itself failed
    #[error("MX lookup failed")]
    Dns(#[from] ResolveError),

    /// The SMTP conversation failed
    #[error(transparent)]
    Transport(#[from] smtp::error::Error),

    /// Loading the signing key or computing the DKIM signature failed
    #[error("DKIM signing failed: {0}")]
    Dkim(#[from] mail_auth::Error),

    /// Contradictory or insufficient command-line flags
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The input message could not be parsed at all
    #[error("cannot parse the message data")]
    MessageParse(#[from] mailparse::MailParseError),

    /// Reading input or writing output failed
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn inference(field: &'static str, reason: impl Into<String>) -> Self {
        Error::AddressInference {
            field,
            reason: reason.into(),
        }
    }
}
