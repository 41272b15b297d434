use std::{str::Utf8Error, time::Duration};

use line::{read_line, write_flush, ReadLineError};
use tokio::{
    io::{AsyncBufRead, AsyncRead, AsyncReadExt, AsyncWrite},
    time::timeout,
};
use tracing::debug;

use crate::{address, LINE_LIMIT};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Helo {
        domain: String,
    },
    Ehlo {
        domain: String,
    },
    Mail {
        from: String,
        /// Trimmed remainder after the address (e.g. `SIZE=1024 BODY=8BITMIME`).
        extensions: String,
    },
    Rcpt {
        to: String,
        extensions: String,
    },
    Rset,
    Data,
    Noop,
    Quit,
    Starttls {
        /// Non-empty if the client sent an (illegal) argument.
        arg: String,
    },
    Vrfy {
        arg: String,
    },
    /// `AUTH <mechanism> [initial-response]`.
    ///
    /// See [RFC 4954](https://datatracker.ietf.org/doc/html/rfc4954#section-4).
    Auth {
        mechanism: String,
        initial_response: Option<String>,
    },
    /// Any verb the parser doesn't recognize; forwarded to the handler.
    Other {
        verb: String,
        arg: String,
    },
}

#[derive(Debug)]
pub enum Error {
    Syntax(&'static str),
    InvalidUtf8,
}

impl From<Utf8Error> for Error {
    fn from(_e: Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}

/// Splits a command line into an uppercased verb and its (original-case)
/// argument. An empty line yields `("", "")`.
fn split_verb_arg(s: &str) -> (String, String) {
    let s = s.trim();
    match s.split_once(' ') {
        Some((verb, arg)) => (verb.to_ascii_uppercase(), arg.trim_start().to_owned()),
        None => (s.to_ascii_uppercase(), String::new()),
    }
}

/// Case-insensitively strips a required keyword prefix (e.g. `FROM:`),
/// tolerating the optional space RFC 5321 allows before the colon.
fn strip_keyword<'a>(args: &'a str, keyword: &str) -> Option<&'a str> {
    let args = args.trim_start();
    if args.len() < keyword.len() {
        return None;
    }
    let (head, tail) = args.split_at(keyword.len());
    head.eq_ignore_ascii_case(keyword).then_some(tail)
}

impl TryFrom<&[u8]> for Command {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let s = std::str::from_utf8(bytes)?;
        debug!(?s, "parsing command");
        let (verb, args) = split_verb_arg(s);

        let cmd = match verb.as_str() {
            "HELO" => Command::Helo { domain: args },
            "EHLO" => Command::Ehlo { domain: args },
            "MAIL" => {
                let rest =
                    strip_keyword(&args, "FROM:").ok_or(Error::Syntax("MAIL FROM:<address>"))?;
                let (from, extensions) =
                    address::parse(rest).map_err(|_| Error::Syntax("MAIL FROM:<address>"))?;
                Command::Mail { from, extensions }
            }
            "RCPT" => {
                let rest = strip_keyword(&args, "TO:").ok_or(Error::Syntax("RCPT TO:<address>"))?;
                let (to, extensions) =
                    address::parse(rest).map_err(|_| Error::Syntax("RCPT TO:<address>"))?;
                if to.is_empty() {
                    return Err(Error::Syntax("RCPT TO:<address>"));
                }
                Command::Rcpt { to, extensions }
            }
            "DATA" => Command::Data,
            "RSET" => Command::Rset,
            "NOOP" => Command::Noop,
            "QUIT" => Command::Quit,
            "STARTTLS" => Command::Starttls { arg: args },
            "VRFY" => Command::Vrfy { arg: args },
            "AUTH" => {
                let mut parts = args.splitn(2, ' ');
                Command::Auth {
                    mechanism: parts
                        .next()
                        .filter(|s| !s.is_empty())
                        .ok_or(Error::Syntax("AUTH <mechanism> [initial-response]"))?
                        .to_ascii_uppercase(),
                    initial_response: parts.next().map(ToOwned::to_owned),
                }
            }
            _ => Command::Other { verb, arg: args },
        };

        Ok(cmd)
    }
}

async fn read_cmd_inner<S: AsyncRead + AsyncBufRead + AsyncWrite + Unpin>(
    stream: &mut S,
) -> std::io::Result<Option<Command>> {
    let mut buf = Vec::new();
    loop {
        match read_line(&mut stream.take(LINE_LIMIT as _), &mut buf).await {
            Ok(()) => (),
            Err(ReadLineError::Eof) => return Ok(None),
            Err(ReadLineError::Io(e)) => return Err(e),
        }

        match Command::try_from(buf.as_ref()) {
            Ok(cmd) => return Ok(Some(cmd)),
            Err(Error::InvalidUtf8) => debug!("invalid utf8"),
            Err(Error::Syntax(correct)) => {
                write_flush(stream, format!("501 Syntax: {correct}\r\n")).await?;
            }
        }

        buf.clear();
    }
}

/// Reads the next command from the stream, bounded by `idle_timeout`.
pub async fn read_cmd<S: AsyncRead + AsyncBufRead + AsyncWrite + Unpin>(
    stream: &mut S,
    idle_timeout: Duration,
) -> std::io::Result<Option<Command>> {
    match timeout(idle_timeout, read_cmd_inner(stream)).await {
        Ok(Ok(cmd)) => Ok(cmd),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            debug!("timeout reading command");
            Err(std::io::Error::from(std::io::ErrorKind::TimedOut))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use line::write_flush;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

    use super::{read_cmd, Command};

    const TEST_TIMEOUT: Duration = Duration::from_secs(30);

    #[test]
    fn mail_from() {
        assert_eq!(
            Command::try_from(b"MAIL FROM:<alice@example.com>".as_ref()).unwrap(),
            Command::Mail {
                from: "alice@example.com".to_owned(),
                extensions: String::new(),
            }
        );
    }

    #[test]
    fn mail_from_with_size() {
        assert_eq!(
            Command::try_from(b"MAIL FROM:<alice@example.com> SIZE=1024".as_ref()).unwrap(),
            Command::Mail {
                from: "alice@example.com".to_owned(),
                extensions: "SIZE=1024".to_owned(),
            }
        );
    }

    #[test]
    fn rcpt_requires_nonempty_address() {
        assert!(Command::try_from(b"RCPT TO:<>".as_ref()).is_err());
    }

    #[test]
    fn unrecognized_verb_forwarded() {
        assert_eq!(
            Command::try_from(b"XWHATEVER foo".as_ref()).unwrap(),
            Command::Other {
                verb: "XWHATEVER".to_owned(),
                arg: "foo".to_owned(),
            }
        );
    }

    #[test]
    fn empty_line() {
        assert_eq!(
            Command::try_from(b"".as_ref()).unwrap(),
            Command::Other {
                verb: String::new(),
                arg: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn cmd() -> anyhow::Result<()> {
        let (mut client, server) = tokio::io::duplex(8192);

        let task = tokio::spawn(async move {
            let mut server = BufReader::new(server);

            assert_eq!(
                read_cmd(&mut server, TEST_TIMEOUT).await?,
                Some(Command::Helo {
                    domain: "world".to_owned()
                })
            );
            write_flush(&mut server, "250 yo\r\n").await?;

            assert_eq!(
                read_cmd(&mut server, TEST_TIMEOUT).await?,
                Some(Command::Quit)
            );
            write_flush(&mut server, "221 bye\r\n").await?;

            assert_eq!(read_cmd(&mut server, TEST_TIMEOUT).await?, None);

            anyhow::Ok(())
        });

        client.write_all(b"HELO world\r\n").await?;
        client.write_all(b"QUIT\r\n").await?;
        client.shutdown().await?;

        task.await??;

        let mut buf = String::new();
        client.read_to_string(&mut buf).await?;

        assert_eq!(buf, "250 yo\r\n221 bye\r\n");

        Ok(())
    }
}
