//! `attach`: add a file to an existing message
//!
//! The input message is parsed, its top-level headers and existing parts are
//! carried over, and the new attachment is appended. Structural MIME headers
//! are regenerated rather than copied, since the multipart layout changes.

use std::borrow::Cow;
use std::fs;

use mail_builder::headers::raw::Raw;
use mail_builder::MessageBuilder;
use mailparse::{parse_mail, ParsedMail};

use crate::cli::AttachArgs;
use crate::command::{read_input, write_output};
use crate::Error;

/// Headers owned by the MIME structure, regenerated on output
const STRUCTURAL_HEADERS: &[&str] = &["content-type", "content-transfer-encoding", "mime-version"];

/// The decoded content of a message, one field per part kind
#[derive(Default)]
struct Parts {
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<(String, String, Vec<u8>)>,
}

/// Attaches a file to the message and prints the result on standard output
pub fn run(args: AttachArgs) -> Result<(), Error> {
    let data = read_input(&args.message)?;
    let message = parse_mail(&data)?;

    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .attachment
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::Configuration("the attachment path has no file name".to_owned())
            })?,
    };
    let mimetype = args.mimetype.clone().unwrap_or_else(|| {
        mime_guess::from_path(&name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_owned()
    });
    let contents = fs::read(&args.attachment)?;

    let mut parts = Parts::default();
    collect_parts(&message, &mut parts)?;

    let mut builder = MessageBuilder::new();
    for header in &message.headers {
        let key = header.get_key_ref();
        if STRUCTURAL_HEADERS.contains(&key.to_lowercase().as_str()) {
            continue;
        }
        builder = builder.header(key.to_owned(), Raw::from(header.get_value()));
    }

    if let Some(text) = parts.text {
        builder = builder.text_body(text);
    }
    if let Some(html) = parts.html {
        builder = builder.html_body(html);
    }
    for (ctype, filename, body) in parts.attachments {
        builder = builder.attachment(ctype, filename, body);
    }
    builder = builder.attachment(mimetype, name, contents);

    write_output(&builder.write_to_vec()?)
}

/// Splits a parsed message into body texts and attachments, depth first
fn collect_parts(part: &ParsedMail<'_>, parts: &mut Parts) -> Result<(), Error> {
    if !part.subparts.is_empty() {
        for subpart in &part.subparts {
            collect_parts(subpart, parts)?;
        }
        return Ok(());
    }

    let disposition = part.get_content_disposition();
    let filename = disposition.params.get("filename").cloned();
    let mimetype = part.ctype.mimetype.to_lowercase();

    if filename.is_none() && mimetype == "text/plain" && parts.text.is_none() {
        parts.text = Some(part.get_body()?);
    } else if filename.is_none() && mimetype == "text/html" && parts.html.is_none() {
        parts.html = Some(part.get_body()?);
    } else {
        let filename = filename.unwrap_or_else(|| untitled(&mimetype));
        parts
            .attachments
            .push((mimetype, filename, part.get_body_raw()?));
    }
    Ok(())
}

/// A placeholder name for attachments that never carried one
fn untitled(mimetype: &str) -> String {
    let extension = mime_guess::get_mime_extensions_str(mimetype)
        .and_then(|extensions| extensions.first())
        .map_or(Cow::Borrowed(""), |ext| Cow::Owned(format!(".{ext}")));
    format!("untitled{extension}")
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{collect_parts, Parts};

    #[test]
    fn splits_a_plain_message_into_a_text_body() {
        let message = mailparse::parse_mail(
            b"From: a@x.com\r\nTo: b@y.com\r\nSubject: hi\r\n\r\nhello there\r\n",
        )
        .unwrap();
        let mut parts = Parts::default();
        collect_parts(&message, &mut parts).unwrap();
        assert_eq!(parts.text.as_deref(), Some("hello there\r\n"));
        assert!(parts.html.is_none());
        assert!(parts.attachments.is_empty());
    }

    #[test]
    fn keeps_existing_attachments() {
        let message = mailparse::parse_mail(
            b"From: a@x.com\r\n\
              Content-Type: multipart/mixed; boundary=\"sep\"\r\n\
              \r\n\
              --sep\r\n\
              Content-Type: text/plain\r\n\
              \r\n\
              body\r\n\
              --sep\r\n\
              Content-Type: application/pdf\r\n\
              Content-Disposition: attachment; filename=\"doc.pdf\"\r\n\
              \r\n\
              %PDF-\r\n\
              --sep--\r\n",
        )
        .unwrap();
        let mut parts = Parts::default();
        collect_parts(&message, &mut parts).unwrap();
        assert_eq!(parts.text.as_deref().map(str::trim_end), Some("body"));
        assert_eq!(parts.attachments.len(), 1);
        let (ctype, filename, _) = &parts.attachments[0];
        assert_eq!(ctype, "application/pdf");
        assert_eq!(filename, "doc.pdf");
    }

    #[test]
    fn untitled_names_get_a_guessed_extension() {
        assert_eq!(super::untitled("application/x-nonexistent"), "untitled");
    }
}
