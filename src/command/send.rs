//! `send`: deliver a message over SMTP
//!
//! The envelope and the destination server are inferred from the message
//! itself unless overridden on the command line. With `--dry`, the whole
//! SMTP conversation runs against the in-process simulator and nothing
//! touches the network.

use std::time::Duration;

use log::info;

use crate::cli::SendArgs;
use crate::command::read_input;
use crate::envelope::Envelope;
use crate::normalize::normalize_crlf;
use crate::resolver::{MailServerResolver, MxResolve};
use crate::transport::smtp::authentication::{Credentials, DEFAULT_MECHANISMS};
use crate::transport::smtp::client::SmtpConnection;
use crate::transport::smtp::extension::ClientId;
use crate::Error;

/// Everything one delivery needs, already validated
pub struct SendOptions {
    /// Name to identify as in `EHLO`, the local hostname when absent
    pub ehlo: Option<String>,
    /// Destination server, inferred from the first recipient when absent
    pub server: Option<String>,
    /// Destination TCP port
    pub port: u16,
    /// Upgrade the connection with `STARTTLS`
    pub tls: bool,
    /// Explicit envelope sender
    pub from: Option<String>,
    /// Explicit envelope recipients
    pub to: Vec<String>,
    /// Authentication credentials
    pub credentials: Option<Credentials>,
    /// Run against the simulator instead of the network
    pub dry: bool,
    /// Socket timeout
    pub timeout: Option<Duration>,
}

impl TryFrom<&SendArgs> for SendOptions {
    type Error = Error;

    fn try_from(args: &SendArgs) -> Result<SendOptions, Error> {
        let credentials = match (&args.username, &args.password) {
            (Some(username), Some(password)) => {
                Some(Credentials::new(username.clone(), password.clone()))
            }
            (Some(_), None) => {
                return Err(Error::Configuration(
                    "a username was given without a password".to_owned(),
                ));
            }
            (None, _) => None,
        };

        Ok(SendOptions {
            ehlo: args.ehlo.clone(),
            server: args.server.clone(),
            port: args.port,
            tls: args.use_tls(),
            from: args.from.clone(),
            to: args.to.clone(),
            credentials,
            dry: args.dry,
            timeout: Some(Duration::from_secs(args.timeout)),
        })
    }
}

/// Reads the message and delivers it with the system DNS resolver
pub fn run(args: SendArgs) -> Result<(), Error> {
    let options = SendOptions::try_from(&args)?;
    let message = read_input(&args.message)?;
    deliver(&options, &MailServerResolver::system()?, &message)
}

/// Delivers one message: normalize, resolve the envelope and the server,
/// then run the SMTP session
///
/// Envelope resolution happens before any DNS query, so a message with
/// unusable headers fails without network traffic. When several recipients
/// are given, only the first one decides the destination server.
pub fn deliver<R: MxResolve>(
    options: &SendOptions,
    resolver: &MailServerResolver<R>,
    message: &[u8],
) -> Result<(), Error> {
    let data = normalize_crlf(message);
    let envelope = Envelope::resolve(&data, options.from.clone(), options.to.clone())?;

    let server = match &options.server {
        Some(server) => server.clone(),
        None => resolver.mail_server_for(envelope.to()[0].as_ref())?,
    };

    let mut conn = if options.dry {
        SmtpConnection::simulated(&server, options.port)?
    } else {
        SmtpConnection::connect(&server, options.port, options.timeout)?
    };

    let result = session(&mut conn, options, &server, &envelope, &data);
    if result.is_err() {
        conn.abort();
    }
    result
}

fn session(
    conn: &mut SmtpConnection,
    options: &SendOptions,
    server: &str,
    envelope: &Envelope,
    data: &[u8],
) -> Result<(), Error> {
    let client_id = match &options.ehlo {
        Some(name) => ClientId::Domain(name.clone()),
        None => ClientId::default(),
    };
    conn.ehlo(&client_id)?;

    if options.tls && !options.dry {
        conn.starttls(server, &client_id)?;
    }

    if let Some(credentials) = &options.credentials {
        conn.auth(DEFAULT_MECHANISMS, credentials)?;
    }

    let response = conn.send(envelope, data)?;
    info!(
        "message accepted by {server}: {}",
        response.first_word().unwrap_or_default()
    );
    conn.quit()?;
    Ok(())
}
