//! `compose`: build a fresh message around a body read from a file or
//! standard input

use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use mail_builder::headers::address::Address;
use mail_builder::headers::raw::Raw;
use mail_builder::MessageBuilder;

use crate::cli::ComposeArgs;
use crate::command::{read_input, write_output};
use crate::envelope::EmailAddress;
use crate::Error;

/// Composes a new message and prints it on standard output
pub fn run(args: ComposeArgs) -> Result<(), Error> {
    if args.body.as_os_str() == "-" && std::io::stdin().is_terminal() {
        eprintln!("Enter mail body (terminate with Ctrl+D): ");
    }
    let body = String::from_utf8_lossy(&read_input(&args.body)?).into_owned();

    let mut builder = MessageBuilder::new()
        .from(args.from.as_str())
        .to(Address::new_list(
            args.to.iter().map(|to| Address::from(to.as_str())).collect(),
        ))
        .message_id(message_id(&args.from));

    if let Some(subject) = &args.subject {
        builder = builder.subject(subject.as_str());
    }

    for header in &args.headers {
        let (name, value) = header.split_once(": ").ok_or_else(|| {
            Error::Configuration(format!(
                "header {header:?} is not a \"Name: Value\" pair"
            ))
        })?;
        builder = builder.header(name.to_owned(), Raw::from(value.to_owned()));
    }

    builder = if args.html {
        builder.html_body(body)
    } else {
        builder.text_body(body)
    };

    write_output(&builder.write_to_vec()?)
}

/// A unique Message-ID under the sender's domain
fn message_id(from: &str) -> String {
    let domain = crate::envelope::bare_addresses(from)
        .ok()
        .and_then(|addresses| addresses.into_iter().next())
        .map_or_else(
            || EmailAddress::from(from).domain().to_owned(),
            |address| address.domain().to_owned(),
        );
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!(
        "{:x}.{:x}.mailforge@{domain}",
        now.as_nanos(),
        std::process::id()
    )
}
