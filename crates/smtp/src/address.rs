//! RFC 5321 `Path` (`<...>`-enclosed mailbox) parsing.
//!
//! Unlike a general-purpose mailbox validator, this only implements the
//! wire-level shape the session needs to extract an address and hand the
//! service-extension remainder (`SIZE=...`, `BODY=...`) back to the caller.

use nom::{
    bytes::complete::{tag, take_until},
    sequence::delimited,
    IResult,
};

/// Longest local-part this parser will accept, including any quoting and
/// escape characters.
pub const MAX_LOCAL_PART_LEN: usize = 129;

#[derive(Debug, PartialEq, Eq)]
pub struct ParseError;

fn bracketed(i: &str) -> IResult<&str, &str> {
    delimited(tag("<"), take_until(">"), tag(">"))(i)
}

/// Splits a bareword (unquoted) local part off of its domain at the last
/// unescaped `@`.
fn split_local_domain(addr: &str) -> Result<(&str, &str), ParseError> {
    if let Some(local) = addr.strip_prefix('"') {
        // Quoted local part: find the matching unescaped closing quote.
        let bytes = local.as_bytes();
        let mut i = 0;
        let mut escaped = false;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' if !escaped => escaped = true,
                b'"' if !escaped => break,
                _ => escaped = false,
            }
            i += 1;
        }
        if i >= bytes.len() {
            return Err(ParseError);
        }
        let quoted_local = &addr[..=i + 1]; // include both quotes
        let rest = &addr[i + 2..];
        let domain = rest.strip_prefix('@').ok_or(ParseError)?;
        return Ok((quoted_local, domain));
    }

    let at = addr.rfind('@').ok_or(ParseError)?;
    Ok((&addr[..at], &addr[at + 1..]))
}

fn bareword_char_ok(c: char) -> bool {
    c.is_ascii_digit() || c == '@' || c.is_ascii_alphabetic() || c == '-' || c == '.' || c == '_'
}

/// Validates and normalizes the contents of a `<...>`-delimited path,
/// stripping any source route.
///
/// Returns the empty string for `<>`.
fn validate_mailbox(path: &str) -> Result<String, ParseError> {
    if path.is_empty() {
        return Ok(String::new());
    }

    // Discard a source route: `@hosta,@hostb:local@domain`.
    let addr = match path.rfind(':') {
        Some(colon) if path.starts_with('@') => &path[colon + 1..],
        _ => path,
    };

    let (local, domain) = split_local_domain(addr)?;

    if local.is_empty() || domain.is_empty() {
        return Err(ParseError);
    }
    if local.len() > MAX_LOCAL_PART_LEN {
        return Err(ParseError);
    }

    if !local.starts_with('"') && !local.chars().all(bareword_char_ok) {
        return Err(ParseError);
    }

    Ok(format!("{local}@{domain}"))
}

/// Parses a `MAIL FROM:`/`RCPT TO:` argument (the text after the colon,
/// e.g. `<alice@example.com> SIZE=1024`).
///
/// Returns the normalized mailbox and the trimmed remainder (service
/// extensions), or [`ParseError`] if the syntax is invalid.
pub fn parse(input: &str) -> Result<(String, String), ParseError> {
    let input = input.trim();

    if !input.starts_with('<') {
        return Err(ParseError);
    }

    let (remainder, path) = bracketed(input).map_err(|_| ParseError)?;
    let mailbox = validate_mailbox(path)?;

    Ok((mailbox, remainder.trim_start().to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mailbox() {
        assert_eq!(parse("<>"), Ok((String::new(), String::new())));
    }

    #[test]
    fn plain_address() {
        assert_eq!(
            parse("<alice@example.com>"),
            Ok(("alice@example.com".to_owned(), String::new()))
        );
    }

    #[test]
    fn address_with_extensions() {
        assert_eq!(
            parse("<alice@example.com> SIZE=1024 BODY=8BITMIME"),
            Ok((
                "alice@example.com".to_owned(),
                "SIZE=1024 BODY=8BITMIME".to_owned()
            ))
        );
    }

    #[test]
    fn source_route_discarded() {
        assert_eq!(
            parse("<@hosta,@hostb:alice@example.com>"),
            Ok(("alice@example.com".to_owned(), String::new()))
        );
    }

    #[test]
    fn quoted_local() {
        assert_eq!(
            parse(r#"<"john doe"@example.com>"#),
            Ok((r#""john doe"@example.com"#.to_owned(), String::new()))
        );
    }

    #[test]
    fn asymmetric_brackets_rejected() {
        assert!(parse("<alice@example.com").is_err());
        assert!(parse("alice@example.com>").is_err());
    }

    #[test]
    fn overlong_local_part_rejected() {
        let local = "a".repeat(MAX_LOCAL_PART_LEN + 1);
        assert!(parse(&format!("<{local}@example.com>")).is_err());
    }

    #[test]
    fn bad_bareword_chars_rejected() {
        assert!(parse("<al ice@example.com>").is_err());
    }
}
