//! SMTP envelope and header-based address inference
//!
//! The envelope (in the SMTP sense) is the sender/recipient pair used for
//! protocol-level routing. It is distinct from the `From`/`To` header fields
//! shown to humans, but when the caller does not supply envelope addresses
//! explicitly, they are derived from those headers.

use std::fmt::{self, Display, Formatter};

use mailparse::{addrparse, parse_mail, MailAddr, MailHeaderMap};

use crate::Error;

/// A bare email address, kept as an opaque string
///
/// Deliberately unvalidated: this tool forwards whatever the caller supplies
/// and lets the server do the rejecting.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a new email address
    pub fn new(address: String) -> EmailAddress {
        EmailAddress(address)
    }

    /// The domain part: everything after the last `@`, or the whole address
    /// when it contains none
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or(self.0.as_str(), |(_, d)| d)
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for EmailAddress {
    fn from(address: String) -> Self {
        EmailAddress(address)
    }
}

impl From<&str> for EmailAddress {
    fn from(address: &str) -> Self {
        EmailAddress(address.to_owned())
    }
}

/// The delivery unit for one SMTP transaction
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Envelope {
    /// The envelope-from address, used for `MAIL FROM`
    from: EmailAddress,
    /// The envelope recipients, one `RCPT TO` each, in order
    to: Vec<EmailAddress>,
}

impl Envelope {
    /// Builds an envelope from explicit addresses
    ///
    /// Fails when the recipient list is empty; transport must never start
    /// with an incomplete envelope.
    pub fn new(from: EmailAddress, to: Vec<EmailAddress>) -> Result<Envelope, Error> {
        if to.is_empty() {
            return Err(Error::Configuration(
                "the recipient list must not be empty".to_owned(),
            ));
        }
        Ok(Envelope { from, to })
    }

    /// Completes an envelope, inferring missing fields from the message
    /// headers
    ///
    /// Explicit values always win: inference for a field is skipped entirely
    /// when that field was supplied, even if the headers disagree. A missing
    /// sender is filled from the first `From` header, missing recipients
    /// from **all** `To` headers in order of appearance.
    pub fn resolve(
        message: &[u8],
        from: Option<String>,
        to: Vec<String>,
    ) -> Result<Envelope, Error> {
        match (from, to) {
            (Some(from), to) if !to.is_empty() => Envelope::new(
                EmailAddress::new(from),
                to.into_iter().map(EmailAddress::new).collect(),
            ),
            (from, to) => {
                let parsed = parse_mail(message)?;
                let from = match from {
                    Some(from) => EmailAddress::new(from),
                    None => infer_sender(&parsed)?,
                };
                let to = if to.is_empty() {
                    infer_recipients(&parsed)?
                } else {
                    to.into_iter().map(EmailAddress::new).collect()
                };
                Envelope::new(from, to)
            }
        }
    }

    /// The envelope-from address
    pub fn from(&self) -> &EmailAddress {
        &self.from
    }

    /// The envelope recipients
    pub fn to(&self) -> &[EmailAddress] {
        &self.to
    }

    /// Tells if every envelope address is pure ASCII
    ///
    /// Internationalized addresses need the `SMTPUTF8` extension.
    pub fn is_ascii(&self) -> bool {
        self.from.as_ref().is_ascii() && self.to.iter().all(|to| to.as_ref().is_ascii())
    }
}

fn infer_sender(parsed: &mailparse::ParsedMail<'_>) -> Result<EmailAddress, Error> {
    let value = parsed
        .headers
        .get_first_value("From")
        .ok_or_else(|| Error::inference("from", "no From header present"))?;

    bare_addresses(&value)
        .map_err(|e| Error::inference("from", e.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| Error::inference("from", "the From header contains no address"))
}

fn infer_recipients(parsed: &mailparse::ParsedMail<'_>) -> Result<Vec<EmailAddress>, Error> {
    let values = parsed.headers.get_all_values("To");
    if values.is_empty() {
        return Err(Error::inference("to", "no To header present"));
    }

    let mut recipients = Vec::new();
    for value in values {
        recipients
            .extend(bare_addresses(&value).map_err(|e| Error::inference("to", e.to_string()))?);
    }

    if recipients.is_empty() {
        return Err(Error::inference("to", "the To headers contain no address"));
    }
    Ok(recipients)
}

/// Extracts the bare addresses from a header value, discarding display
/// names and flattening address groups, in order of appearance
pub(crate) fn bare_addresses(
    header_value: &str,
) -> Result<Vec<EmailAddress>, mailparse::MailParseError> {
    let mut addresses = Vec::new();
    for addr in addrparse(header_value)?.iter() {
        match addr {
            MailAddr::Single(single) => addresses.push(EmailAddress::new(single.addr.clone())),
            MailAddr::Group(group) => addresses
                .extend(group.addrs.iter().map(|a| EmailAddress::new(a.addr.clone()))),
        }
    }
    Ok(addresses)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    const MESSAGE: &[u8] = b"From: Alice <alice@x.com>\r\n\
        To: a@x.com, Bob <b@x.com>\r\n\
        To: c@y.com\r\n\
        Subject: test\r\n\
        \r\n\
        body\r\n";

    fn addresses(addrs: &[&str]) -> Vec<EmailAddress> {
        addrs.iter().map(|a| EmailAddress::from(*a)).collect()
    }

    #[test]
    fn infers_sender_from_header() {
        let envelope = Envelope::resolve(MESSAGE, None, vec!["r@e.com".to_owned()]).unwrap();
        assert_eq!(envelope.from(), &EmailAddress::from("alice@x.com"));
    }

    #[test]
    fn infers_recipients_from_all_to_headers_in_order() {
        let envelope = Envelope::resolve(MESSAGE, Some("s@d.com".to_owned()), vec![]).unwrap();
        assert_eq!(envelope.to(), addresses(&["a@x.com", "b@x.com", "c@y.com"]));
    }

    #[test]
    fn explicit_values_take_precedence_over_headers() {
        let envelope = Envelope::resolve(
            MESSAGE,
            Some("explicit@d.com".to_owned()),
            vec!["explicit@e.com".to_owned()],
        )
        .unwrap();
        assert_eq!(envelope.from(), &EmailAddress::from("explicit@d.com"));
        assert_eq!(envelope.to(), addresses(&["explicit@e.com"]));
    }

    #[test]
    fn explicit_values_never_parse_the_message() {
        // Unparseable header block: inference would fail, explicit values
        // must not even look at it.
        let garbage = b"\xff\xfe not a message";
        let envelope = Envelope::resolve(
            garbage,
            Some("s@d.com".to_owned()),
            vec!["r@e.com".to_owned()],
        )
        .unwrap();
        assert_eq!(envelope.from(), &EmailAddress::from("s@d.com"));
    }

    #[test]
    fn missing_from_header_fails_inference() {
        let message = b"To: r@e.com\r\n\r\nbody\r\n";
        let err = Envelope::resolve(message, None, vec!["r@e.com".to_owned()]).unwrap_err();
        assert!(matches!(err, Error::AddressInference { field: "from", .. }));
    }

    #[test]
    fn missing_to_header_fails_inference() {
        let message = b"From: s@d.com\r\n\r\nbody\r\n";
        let err = Envelope::resolve(message, Some("s@d.com".to_owned()), vec![]).unwrap_err();
        assert!(matches!(err, Error::AddressInference { field: "to", .. }));
    }

    #[test]
    fn group_addresses_are_flattened() {
        let message = b"From: s@d.com\r\n\
            To: friends: a@x.com, b@x.com;\r\n\
            \r\nbody\r\n";
        let envelope = Envelope::resolve(message, Some("s@d.com".to_owned()), vec![]).unwrap();
        assert_eq!(envelope.to(), addresses(&["a@x.com", "b@x.com"]));
    }

    #[test]
    fn empty_explicit_recipients_are_rejected() {
        let err = Envelope::new(EmailAddress::from("s@d.com"), vec![]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn domain_is_taken_after_the_last_at() {
        assert_eq!(EmailAddress::from("a@b@x.com").domain(), "x.com");
        assert_eq!(EmailAddress::from("a@x.com").domain(), "x.com");
        assert_eq!(EmailAddress::from("no-at-sign").domain(), "no-at-sign");
    }
}
