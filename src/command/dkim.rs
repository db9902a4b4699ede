//! `dkim`: sign a message with an RSA-SHA256 DKIM signature
//!
//! The signature header is computed over the CRLF-normalized message, and the
//! normalized form is what gets printed, so the signed bytes are exactly the
//! bytes a later `send` puts on the wire.

use std::fs;

use mail_auth::common::crypto::{RsaKey, Sha256};
use mail_auth::common::headers::HeaderWriter;
use mail_auth::dkim::DkimSigner;

use crate::cli::DkimArgs;
use crate::command::{read_input, write_output};
use crate::normalize::normalize_crlf;
use crate::Error;

/// The header fields covered by the signature
const SIGNED_HEADERS: [&str; 6] = ["From", "To", "Cc", "Subject", "Date", "Message-ID"];

/// Signs the message and prints it, signature header first, on standard
/// output
pub fn run(args: DkimArgs) -> Result<(), Error> {
    let message = normalize_crlf(&read_input(&args.message)?);

    let pem = fs::read_to_string(&args.private_key)?;
    let key = RsaKey::<Sha256>::from_pkcs1_pem(&pem)?;

    let signature = DkimSigner::from_key(key)
        .domain(&args.domain)
        .selector(&args.selector)
        .headers(SIGNED_HEADERS)
        .sign(&message)?;

    let mut signed = signature.to_header().into_bytes();
    signed.extend_from_slice(&message);
    write_output(&signed)
}
