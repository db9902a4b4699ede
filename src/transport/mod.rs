//! Message transport
//!
//! Only one transport exists: SMTP, either over a real socket or over the
//! in-process protocol simulator used for dry runs.

pub mod smtp;

/// Default SMTP port
pub const SMTP_PORT: u16 = 25;

/// Default submission port
pub const SUBMISSION_PORT: u16 = 587;
