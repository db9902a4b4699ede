//! SMTP response, containing a mandatory return code and an optional text
//! message

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use nom::{
    bytes::streaming::{tag, take_until, take_while_m_n},
    combinator::{complete, map_opt},
    multi::many0,
    sequence::{preceded, tuple},
    IResult,
};

use crate::transport::smtp::{error::Error, CRLF};

/// First digit of a response code, indicating severity
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Severity {
    /// 2yz
    PositiveCompletion,
    /// 3yz
    PositiveIntermediate,
    /// 4yz
    TransientNegativeCompletion,
    /// 5yz
    PermanentNegativeCompletion,
}

/// A 3-digit SMTP response code
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Code(u16);

impl Code {
    /// Wraps a raw code, which must be in the 200..=599 range
    pub fn new(code: u16) -> Option<Code> {
        (200..=599).contains(&code).then_some(Code(code))
    }

    /// The severity digit
    pub fn severity(self) -> Severity {
        match self.0 / 100 {
            2 => Severity::PositiveCompletion,
            3 => Severity::PositiveIntermediate,
            4 => Severity::TransientNegativeCompletion,
            _ => Severity::PermanentNegativeCompletion,
        }
    }

    /// Tells if the code announces success (2yz or 3yz)
    pub fn is_positive(self) -> bool {
        matches!(
            self.severity(),
            Severity::PositiveCompletion | Severity::PositiveIntermediate
        )
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Code> for u16 {
    fn from(code: Code) -> u16 {
        code.0
    }
}

/// An SMTP reply with separated code and message lines
///
/// Multi-line replies carry one entry per line in `message`.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Response {
    code: Code,
    message: Vec<String>,
}

impl Response {
    /// Creates a new `Response`
    pub fn new(code: Code, message: Vec<String>) -> Response {
        Response { code, message }
    }

    /// Tells if the response is positive
    pub fn is_positive(&self) -> bool {
        self.code.is_positive()
    }

    /// Tests code equality
    pub fn has_code(&self, code: u16) -> bool {
        u16::from(self.code) == code
    }

    /// Response code
    pub fn code(&self) -> Code {
        self.code
    }

    /// The first word of the first message line, if any
    pub fn first_word(&self) -> Option<&str> {
        self.message
            .first()
            .and_then(|line| line.split_whitespace().next())
    }

    /// The message lines
    pub fn message(&self) -> impl Iterator<Item = &str> {
        self.message.iter().map(String::as_str)
    }
}

impl FromStr for Response {
    type Err = Error;

    fn from_str(s: &str) -> Result<Response, Error> {
        parse_response(s)
            .map(|(_, r)| r)
            .map_err(|e| Error::ResponseParsing(e.to_string()))
    }
}

fn parse_code(i: &str) -> IResult<&str, Code> {
    map_opt(
        take_while_m_n(3, 3, |c: char| c.is_ascii_digit()),
        |digits: &str| digits.parse().ok().and_then(Code::new),
    )(i)
}

/// Parses a full (possibly multi-line) reply
///
/// Returns `Incomplete` while the final line (code followed by a space) has
/// not been seen yet, so the caller can keep reading from the wire.
pub(crate) fn parse_response(i: &str) -> IResult<&str, Response> {
    let (i, lines) = many0(tuple((
        parse_code,
        preceded(tag("-"), take_until(CRLF)),
        tag(CRLF),
    )))(i)?;
    let (i, (last_code, last_line)) =
        tuple((parse_code, preceded(tag(" "), take_until(CRLF))))(i)?;
    let (i, _) = complete(tag(CRLF))(i)?;

    // All lines of one reply must repeat the same code.
    if !lines.iter().all(|&(code, _, _)| code == last_code) {
        return Err(nom::Err::Failure(nom::error::Error::new(
            "",
            nom::error::ErrorKind::Not,
        )));
    }

    let mut message: Vec<String> = lines.into_iter().map(|(_, text, _)| text.into()).collect();
    message.push(last_line.into());

    Ok((
        i,
        Response {
            code: last_code,
            message,
        },
    ))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn code_severity() {
        assert_eq!(
            Code::new(250).unwrap().severity(),
            Severity::PositiveCompletion
        );
        assert_eq!(
            Code::new(354).unwrap().severity(),
            Severity::PositiveIntermediate
        );
        assert_eq!(
            Code::new(421).unwrap().severity(),
            Severity::TransientNegativeCompletion
        );
        assert_eq!(
            Code::new(550).unwrap().severity(),
            Severity::PermanentNegativeCompletion
        );
        assert!(Code::new(199).is_none());
        assert!(Code::new(600).is_none());
    }

    #[test]
    fn parses_single_line_reply() {
        let response: Response = "220 smtp.example.org ready\r\n".parse().unwrap();
        assert!(response.is_positive());
        assert!(response.has_code(220));
        assert_eq!(response.first_word(), Some("smtp.example.org"));
    }

    #[test]
    fn parses_multi_line_reply() {
        let raw = "250-me\r\n250-8BITMIME\r\n250-SIZE 42\r\n250 AUTH PLAIN LOGIN\r\n";
        let response: Response = raw.parse().unwrap();
        assert_eq!(
            response.message().collect::<Vec<_>>(),
            vec!["me", "8BITMIME", "SIZE 42", "AUTH PLAIN LOGIN"]
        );
        assert!(response.has_code(250));
    }

    #[test]
    fn rejects_mismatched_codes() {
        let raw = "250-me\r\n251-8BITMIME\r\n250 AUTH PLAIN LOGIN\r\n";
        assert!(raw.parse::<Response>().is_err());
    }

    #[test]
    fn rejects_unterminated_reply() {
        let raw = "250-me\r\n250-8BITMIME\r\n250-AUTH PLAIN LOGIN\r\n";
        assert!(raw.parse::<Response>().is_err());
    }

    #[test]
    fn partial_reply_is_incomplete() {
        let res = parse_response("250-smtp.example.org\r\n");
        assert!(matches!(res, Err(nom::Err::Incomplete(_))));
    }

    #[test]
    fn negative_reply_is_not_positive() {
        let response: Response = "554 rejected for policy reasons\r\n".parse().unwrap();
        assert!(!response.is_positive());
        assert!(response.has_code(554));
    }
}
