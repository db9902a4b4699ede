//! Command-line interface definition
//!
//! Every subcommand takes its message (or body) as a trailing file argument
//! defaulting to `-`, standard input, and prints its result on standard
//! output so invocations chain into pipelines.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// A suite of tools to compose and/or send emails
#[derive(Debug, Parser)]
#[command(name = "mailforge", version, about)]
pub struct Cli {
    /// Increase diagnostic verbosity, may be repeated
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// The tool to run
    #[command(subcommand)]
    pub command: Command,
}

/// The available tools
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compose a new email message
    ///
    /// The message body is read from the given file, or from standard input.
    Compose(ComposeArgs),
    /// Attach a file to the given email message
    Attach(AttachArgs),
    /// Sign the given email message with DKIM
    Dkim(DkimArgs),
    /// Send an email message using SMTP
    ///
    /// If not explicitly specified, the destination server is inferred from
    /// the first recipient address, and the envelope addresses from the
    /// message headers. Bare newlines are fixed to CRLF before sending.
    Send(SendArgs),
}

/// Arguments to `compose`
#[derive(Debug, Args)]
pub struct ComposeArgs {
    /// The email address for the "From" header
    #[arg(short, long)]
    pub from: String,

    /// An email address for the "To" header, may be repeated
    #[arg(short, long, required = true)]
    pub to: Vec<String>,

    /// The message's subject
    #[arg(short, long)]
    pub subject: Option<String>,

    /// A custom header, as a "Name: Value" pair, may be repeated
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Compose the mail as HTML (default: plain text)
    #[arg(long)]
    pub html: bool,

    /// The body file, `-` for standard input
    #[arg(default_value = "-")]
    pub body: PathBuf,
}

/// Arguments to `attach`
#[derive(Debug, Args)]
pub struct AttachArgs {
    /// File to attach to the message
    #[arg(short = 'f', long)]
    pub attachment: PathBuf,

    /// File name of the attachment (default: the file's own name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Mime type of the attachment (default: guessed from the name)
    #[arg(short, long)]
    pub mimetype: Option<String>,

    /// The message file, `-` for standard input
    #[arg(default_value = "-")]
    pub message: PathBuf,
}

/// Arguments to `dkim`
#[derive(Debug, Args)]
pub struct DkimArgs {
    /// PEM-encoded RSA private key for signing the message
    #[arg(short, long)]
    pub private_key: PathBuf,

    /// DKIM selector, used when querying the public key
    #[arg(short, long, default_value = "selector")]
    pub selector: String,

    /// Domain for querying the public key
    #[arg(short, long, env = "HOST")]
    pub domain: String,

    /// The message file, `-` for standard input
    #[arg(default_value = "-")]
    pub message: PathBuf,
}

/// Arguments to `send`
#[derive(Debug, Args)]
pub struct SendArgs {
    /// Server name to be sent in the EHLO command
    #[arg(short, long)]
    pub ehlo: Option<String>,

    /// Server name to connect to (default: infer from the first recipient's
    /// address)
    #[arg(short, long)]
    pub server: Option<String>,

    /// TCP port to use for the SMTP connection
    #[arg(short, long, default_value_t = crate::transport::SMTP_PORT)]
    pub port: u16,

    /// Upgrade the connection with STARTTLS (the default)
    #[arg(long, overrides_with = "no_tls")]
    pub tls: bool,

    /// Do not upgrade the connection with STARTTLS
    #[arg(long, overrides_with = "tls")]
    pub no_tls: bool,

    /// "MAIL FROM" address (default: infer from the From header)
    #[arg(short, long)]
    pub from: Option<String>,

    /// "RCPT TO" address, may be repeated (default: infer from the To
    /// headers)
    #[arg(short, long)]
    pub to: Vec<String>,

    /// Username for authentication
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password for authentication
    #[arg(long)]
    pub password: Option<String>,

    /// Do not actually send the message
    #[arg(short = 'n', long)]
    pub dry: bool,

    /// Socket timeout, in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// The message file, `-` for standard input
    #[arg(default_value = "-")]
    pub message: PathBuf,
}

impl SendArgs {
    /// The effective TLS setting: on unless `--no-tls` won
    pub fn use_tls(&self) -> bool {
        !self.no_tls
    }
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_flag_defaults() {
        let cli = Cli::try_parse_from(["mailforge", "send"]).unwrap();
        let Command::Send(args) = cli.command else {
            panic!("expected the send subcommand");
        };
        assert_eq!(args.port, 25);
        assert_eq!(args.timeout, 60);
        assert!(args.use_tls());
        assert!(!args.dry);
        assert_eq!(args.message, std::path::PathBuf::from("-"));
    }

    #[test]
    fn the_last_tls_flag_wins() {
        let parse = |argv: &[&str]| {
            let cli = Cli::try_parse_from(argv).unwrap();
            match cli.command {
                Command::Send(args) => args.use_tls(),
                _ => unreachable!(),
            }
        };
        assert!(!parse(&["mailforge", "send", "--no-tls"]));
        assert!(!parse(&["mailforge", "send", "--tls", "--no-tls"]));
        assert!(parse(&["mailforge", "send", "--no-tls", "--tls"]));
    }

    #[test]
    fn compose_requires_sender_and_recipient() {
        assert!(Cli::try_parse_from(["mailforge", "compose", "-f", "a@x.com"]).is_err());
        assert!(Cli::try_parse_from(["mailforge", "compose", "-t", "b@y.com"]).is_err());
        assert!(
            Cli::try_parse_from(["mailforge", "compose", "-f", "a@x.com", "-t", "b@y.com"])
                .is_ok()
        );
    }
}
