//! Limited SASL authentication mechanisms

use std::fmt::{self, Debug, Display, Formatter};

use crate::transport::smtp::error::Error;

/// Accepted authentication mechanisms
///
/// LOGIN is tried last as it is deprecated.
pub const DEFAULT_MECHANISMS: &[Mechanism] = &[Mechanism::Plain, Mechanism::Login];

/// User credentials for SMTP AUTH
#[derive(PartialEq, Eq, Clone)]
pub struct Credentials {
    authentication_identity: String,
    secret: String,
}

impl Credentials {
    /// Creates credentials from a username and password
    pub fn new(username: String, password: String) -> Credentials {
        Credentials {
            authentication_identity: username,
            secret: password,
        }
    }
}

impl Debug for Credentials {
    // Never print the secret
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish()
    }
}

/// Supported authentication mechanisms
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
pub enum Mechanism {
    /// PLAIN mechanism, defined in
    /// [RFC 4616](https://tools.ietf.org/html/rfc4616)
    Plain,
    /// LOGIN mechanism
    ///
    /// Obsolete but still required by some providers.
    Login,
}

impl Display for Mechanism {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Mechanism::Plain => "PLAIN",
            Mechanism::Login => "LOGIN",
        })
    }
}

impl Mechanism {
    /// Does the mechanism support an initial response
    pub fn supports_initial_response(self) -> bool {
        match self {
            Mechanism::Plain => true,
            Mechanism::Login => false,
        }
    }

    /// Returns the raw response to send for the given (decoded) challenge
    pub fn response(
        self,
        credentials: &Credentials,
        challenge: Option<&str>,
    ) -> Result<String, Error> {
        match self {
            Mechanism::Plain => match challenge {
                Some(_) => Err(Error::Client("PLAIN does not expect a challenge")),
                None => Ok(format!(
                    "\u{0}{}\u{0}{}",
                    credentials.authentication_identity, credentials.secret
                )),
            },
            Mechanism::Login => {
                let challenge =
                    challenge.ok_or(Error::Client("LOGIN expects a challenge"))?;

                if ["User Name", "Username:", "Username"].contains(&challenge) {
                    return Ok(credentials.authentication_identity.clone());
                }
                if ["Password", "Password:"].contains(&challenge) {
                    return Ok(credentials.secret.clone());
                }

                Err(Error::Client("unrecognized LOGIN challenge"))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Credentials, Mechanism};

    #[test]
    fn plain_response() {
        let credentials = Credentials::new("username".to_owned(), "password".to_owned());

        assert_eq!(
            Mechanism::Plain.response(&credentials, None).unwrap(),
            "\u{0}username\u{0}password"
        );
        assert!(Mechanism::Plain.response(&credentials, Some("test")).is_err());
    }

    #[test]
    fn login_response() {
        let credentials = Credentials::new("alice".to_owned(), "wonderland".to_owned());

        assert_eq!(
            Mechanism::Login.response(&credentials, Some("Username")).unwrap(),
            "alice"
        );
        assert_eq!(
            Mechanism::Login.response(&credentials, Some("Password")).unwrap(),
            "wonderland"
        );
        assert!(Mechanism::Login.response(&credentials, None).is_err());
    }

    #[test]
    fn credentials_debug_hides_the_secret() {
        let credentials = Credentials::new("alice".to_owned(), "wonderland".to_owned());
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("wonderland"));
    }
}
