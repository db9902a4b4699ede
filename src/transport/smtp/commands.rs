//! SMTP commands
//!
//! Each command knows how to render itself onto the wire through `Display`,
//! CRLF included.

use std::fmt::{self, Display, Formatter};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::debug;

use crate::envelope::EmailAddress;
use crate::transport::smtp::authentication::{Credentials, Mechanism};
use crate::transport::smtp::error::Error;
use crate::transport::smtp::extension::{ClientId, MailParameter};
use crate::transport::smtp::response::Response;

/// EHLO command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Ehlo {
    client_id: ClientId,
}

impl Ehlo {
    /// Creates an EHLO command
    pub fn new(client_id: ClientId) -> Ehlo {
        Ehlo { client_id }
    }
}

impl Display for Ehlo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "EHLO {}\r\n", self.client_id)
    }
}

/// STARTTLS command
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Starttls;

impl Display for Starttls {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("STARTTLS\r\n")
    }
}

/// MAIL command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Mail {
    sender: Option<EmailAddress>,
    parameters: Vec<MailParameter>,
}

impl Mail {
    /// Creates a MAIL command
    ///
    /// A `None` sender renders as the null return path `<>`.
    pub fn new(sender: Option<EmailAddress>, parameters: Vec<MailParameter>) -> Mail {
        Mail { sender, parameters }
    }
}

impl Display for Mail {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAIL FROM:<{}>",
            self.sender.as_ref().map(AsRef::as_ref).unwrap_or("")
        )?;
        for parameter in &self.parameters {
            write!(f, " {parameter}")?;
        }
        f.write_str("\r\n")
    }
}

/// RCPT command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Rcpt {
    recipient: EmailAddress,
}

impl Rcpt {
    /// Creates an RCPT command
    pub fn new(recipient: EmailAddress) -> Rcpt {
        Rcpt { recipient }
    }
}

impl Display for Rcpt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RCPT TO:<{}>\r\n", self.recipient)
    }
}

/// DATA command
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Data;

impl Display for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DATA\r\n")
    }
}

/// QUIT command
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Quit;

impl Display for Quit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("QUIT\r\n")
    }
}

/// AUTH command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Auth {
    mechanism: Mechanism,
    response: Option<String>,
}

impl Auth {
    /// Creates an AUTH command, with an initial response when the mechanism
    /// supports one
    pub fn new(
        mechanism: Mechanism,
        credentials: &Credentials,
        challenge: Option<&str>,
    ) -> Result<Auth, Error> {
        let response = if mechanism.supports_initial_response() || challenge.is_some() {
            Some(mechanism.response(credentials, challenge)?)
        } else {
            None
        };
        Ok(Auth {
            mechanism,
            response,
        })
    }

    /// Creates the follow-up command for a 334 challenge reply
    pub fn from_response(
        mechanism: Mechanism,
        credentials: &Credentials,
        response: &Response,
    ) -> Result<Auth, Error> {
        if !response.has_code(334) {
            return Err(Error::ResponseParsing("expected a challenge".to_owned()));
        }

        let encoded = response
            .first_word()
            .ok_or_else(|| Error::ResponseParsing("could not read the challenge".to_owned()))?;
        let decoded = String::from_utf8(
            BASE64
                .decode(encoded)
                .map_err(|e| Error::ResponseParsing(e.to_string()))?,
        )
        .map_err(|e| Error::ResponseParsing(e.to_string()))?;
        debug!("auth challenge: {decoded}");

        let response = mechanism.response(credentials, Some(&decoded))?;
        Ok(Auth {
            mechanism,
            response: Some(response),
        })
    }
}

impl Display for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let encoded = self.response.as_ref().map(|r| BASE64.encode(r.as_bytes()));

        if self.mechanism.supports_initial_response() {
            // The initial response is always present for such mechanisms
            write!(f, "AUTH {} {}", self.mechanism, encoded.as_deref().unwrap_or(""))?;
        } else {
            match encoded {
                Some(response) => f.write_str(&response)?,
                None => write!(f, "AUTH {}", self.mechanism)?,
            }
        }
        f.write_str("\r\n")
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::transport::smtp::extension::MailBodyParameter;

    #[test]
    fn wire_rendering() {
        let id = ClientId::Domain("localhost".to_owned());
        let email = EmailAddress::from("test@example.com");

        assert_eq!(Ehlo::new(id).to_string(), "EHLO localhost\r\n");
        assert_eq!(
            Mail::new(Some(email.clone()), vec![]).to_string(),
            "MAIL FROM:<test@example.com>\r\n"
        );
        assert_eq!(Mail::new(None, vec![]).to_string(), "MAIL FROM:<>\r\n");
        assert_eq!(
            Mail::new(
                Some(email.clone()),
                vec![
                    MailParameter::Size(42),
                    MailParameter::Body(MailBodyParameter::EightBitMime),
                ],
            )
            .to_string(),
            "MAIL FROM:<test@example.com> SIZE=42 BODY=8BITMIME\r\n"
        );
        assert_eq!(
            Rcpt::new(email).to_string(),
            "RCPT TO:<test@example.com>\r\n"
        );
        assert_eq!(Data.to_string(), "DATA\r\n");
        assert_eq!(Quit.to_string(), "QUIT\r\n");
        assert_eq!(Starttls.to_string(), "STARTTLS\r\n");
    }

    #[test]
    fn auth_rendering() {
        let credentials = Credentials::new("user".to_owned(), "password".to_owned());

        assert_eq!(
            Auth::new(Mechanism::Plain, &credentials, None)
                .unwrap()
                .to_string(),
            "AUTH PLAIN AHVzZXIAcGFzc3dvcmQ=\r\n"
        );
        assert_eq!(
            Auth::new(Mechanism::Login, &credentials, None)
                .unwrap()
                .to_string(),
            "AUTH LOGIN\r\n"
        );
    }

    #[test]
    fn auth_challenge_round() {
        let credentials = Credentials::new("alice".to_owned(), "wonderland".to_owned());
        // "Username:" base64-encoded, as a LOGIN server would send it
        let challenge: Response = "334 VXNlcm5hbWU6\r\n".parse().unwrap();
        let auth = Auth::from_response(Mechanism::Login, &credentials, &challenge).unwrap();
        assert_eq!(auth.to_string(), "YWxpY2U=\r\n");
    }
}
