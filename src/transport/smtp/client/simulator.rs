//! In-process SMTP server stand-in for dry runs
//!
//! The simulator answers every command a real submission server would during
//! a normal session, without opening a socket. Everything the client writes
//! is echoed to stderr so the user can inspect the exact wire traffic.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use colored::Colorize;

/// A scripted SMTP peer implementing `Read` and `Write`
///
/// Replies are generated one line at a time from the last command received,
/// so the conversation stays valid whatever order the client issues commands
/// in. Unknown commands get a generic `250 OK`.
#[derive(Debug, Default)]
pub struct SmtpSimulator {
    /// Continuation lines queued by a multi-line reply, oldest first
    pending: VecDeque<String>,
    /// First line of the last chunk the client wrote
    last_command: Option<String>,
    /// Reply bytes currently being served to `read`
    current: Vec<u8>,
    pos: usize,
}

impl SmtpSimulator {
    /// Creates a simulator, announcing the connection that would have been
    /// opened
    pub fn connect(host: &str, port: u16) -> SmtpSimulator {
        eprintln!("{}", format!("Would connect to {host}:{port} ...").blue());
        SmtpSimulator::default()
    }

    fn next_line(&mut self) -> String {
        if let Some(line) = self.pending.pop_front() {
            return line;
        }

        let command = self
            .last_command
            .as_deref()
            .and_then(|c| c.split_whitespace().next())
            .map(str::to_lowercase);
        match command.as_deref() {
            Some("data") => "354 Go ahead.".to_owned(),
            Some("quit") => "221 Goodbye.".to_owned(),
            Some("auth") => "235 Authentication succeeded".to_owned(),
            Some("ehlo") => {
                self.pending.push_back("250-SIZE 14680064".to_owned());
                self.pending.push_back("250-SMTPUTF8".to_owned());
                self.pending.push_back("250 AUTH PLAIN LOGIN".to_owned());
                "250-Hello, I'm dummy. Glad to meet you.".to_owned()
            }
            Some(_) => "250 OK".to_owned(),
            None => "250 ok".to_owned(),
        }
    }
}

impl Read for SmtpSimulator {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.current.len() {
            let line = self.next_line();
            self.current = line.into_bytes();
            self.current.extend_from_slice(b"\r\n");
            self.pos = 0;
        }

        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for SmtpSimulator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.last_command = text.lines().next().map(|l| l.trim().to_owned());
        eprint!("{}", text.dimmed());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SmtpSimulator {
    fn drop(&mut self) {
        eprintln!("{}", "Closing connection.".blue());
    }
}
