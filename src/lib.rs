//! Mailforge is a command-line toolkit to compose, decorate, sign and send
//! email messages.
//!
//! Each subcommand reads a serialized message on standard input and writes
//! its result to standard output, so the tools compose into pipelines:
//!
//! ```text
//! mailforge compose -f a@x.com -t b@y.com -s hi < body.txt \
//!     | mailforge dkim -p key.pem -d x.com \
//!     | mailforge send --dry
//! ```
//!
//! The library half of the crate contains the delivery machinery: envelope
//! inference from message headers, MX resolution with memoization, SMTP wire
//! normalization, and a synchronous SMTP client that runs over either a real
//! socket or an in-process protocol simulator for dry runs.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod command;
pub mod envelope;
pub mod normalize;
pub mod resolver;
pub mod transport;

mod error;

pub use crate::envelope::{EmailAddress, Envelope};
pub use crate::error::Error;
