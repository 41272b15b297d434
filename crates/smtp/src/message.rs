//! Envelope assembly and the `DATA` body receiver.

use line::{framer::RawFramer, read_line, ReadLineError};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite};
use tracing::{debug, instrument};

use self::data::Unstuffer;

mod data;

/// The in-progress message for one mail transaction.
#[derive(Debug, Default)]
pub struct Envelope {
    /// Set exactly once, by `MAIL`. Empty for the null reverse-path (`<>`).
    pub from: String,
    /// Ordered, duplicates allowed; appended by `RCPT`.
    pub to: Vec<String>,
    /// Advisory `SIZE=` value declared on `MAIL FROM`.
    pub expected_size: Option<u64>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// `(username, credential)`, set once AUTH succeeds.
    pub auth: Option<(String, String)>,
}

impl Envelope {
    #[must_use]
    pub fn new(from: String) -> Self {
        Self {
            from,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub enum BodyError {
    Io(std::io::Error),
    TooLarge,
    /// The transport closed before the end-of-data sentinel was seen.
    UnexpectedEof,
}

impl From<std::io::Error> for BodyError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

fn header_name_ok(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| (33..=126).contains(&b) && b != b':')
}

/// Runs the headers phase: reads line-mode input until a lone CRLF, a
/// folded continuation with no preceding header, or a line that doesn't
/// parse as `name: value`. In the latter two cases the line is handed back
/// as the first line of the body (it was already consumed off the wire).
async fn read_headers<S: AsyncBufRead + Unpin>(
    stream: &mut S,
    total: &mut u64,
    size_cap: u64,
) -> Result<(Vec<(String, String)>, Option<Vec<u8>>), BodyError> {
    let mut headers: Vec<(String, String)> = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match read_line(stream, &mut buf).await {
            Ok(()) => (),
            Err(ReadLineError::Eof) => return Err(BodyError::UnexpectedEof),
            Err(ReadLineError::Io(e)) => return Err(e.into()),
        }
        *total += buf.len() as u64 + 2;
        if *total > size_cap {
            return Err(BodyError::TooLarge);
        }

        if buf.is_empty() {
            return Ok((headers, None));
        }

        if buf[0] == b' ' || buf[0] == b'\t' {
            let Some((_, last_value)) = headers.last_mut() else {
                let mut fallthrough = buf.clone();
                fallthrough.extend_from_slice(b"\r\n");
                return Ok((headers, Some(fallthrough)));
            };
            let continuation = std::str::from_utf8(&buf).unwrap_or_default().trim();
            last_value.push(' ');
            last_value.push_str(continuation);
            continue;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(_) => {
                let mut fallthrough = buf.clone();
                fallthrough.extend_from_slice(b"\r\n");
                return Ok((headers, Some(fallthrough)));
            }
        };

        match line.split_once(':') {
            Some((name, value)) if header_name_ok(name) => {
                headers.push((name.to_owned(), value.trim().to_owned()));
            }
            _ => {
                let mut fallthrough = buf.clone();
                fallthrough.extend_from_slice(b"\r\n");
                return Ok((headers, Some(fallthrough)));
            }
        }
    }
}

/// Runs the body phase: adaptively sized raw reads fed through the
/// dot-unstuffing state machine until the `CRLF.CRLF` sentinel is found or
/// the size cap is exceeded.
async fn read_body<S: AsyncRead + Unpin>(
    stream: &mut S,
    seed: Option<Vec<u8>>,
    total: &mut u64,
    size_cap: u64,
) -> Result<Vec<u8>, BodyError> {
    let mut unstuffer = Unstuffer::new();
    let mut body = Vec::new();

    if let Some(seed) = seed {
        for b in seed {
            if unstuffer.feed(b, &mut body) {
                return Ok(body);
            }
        }
    }

    let mut framer = RawFramer::new();
    let mut chunk = vec![0u8; 65536];

    loop {
        let n = match framer.read_chunk_timed(stream, &mut chunk).await? {
            Some(0) => return Err(BodyError::UnexpectedEof),
            Some(n) => n,
            None => continue, // timed-receive miss; framer stepped down, try again
        };

        *total += n as u64;
        if *total > size_cap {
            return Err(BodyError::TooLarge);
        }

        for &b in &chunk[..n] {
            if unstuffer.feed(b, &mut body) {
                return Ok(body);
            }
        }
    }
}

/// Receives a full message: headers phase followed by body phase, bounded
/// by `size_cap` total bytes (headers + body). `already_used` accounts for
/// any bytes already charged against the cap (none, currently, but kept for
/// symmetry with `MAIL FROM ... SIZE=`).
#[instrument(skip_all)]
pub async fn receive<S: AsyncBufRead + AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    size_cap: u64,
    already_used: u64,
) -> Result<(Vec<(String, String)>, Vec<u8>), BodyError> {
    let mut total = already_used;
    let (headers, fallthrough) = read_headers(stream, &mut total, size_cap).await?;
    debug!(header_count = headers.len(), "headers phase complete");
    let body = read_body(stream, fallthrough, &mut total, size_cap).await?;
    Ok((headers, body))
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncWriteExt, BufReader};

    use super::receive;

    #[tokio::test]
    async fn simple_message() -> anyhow::Result<()> {
        let (mut client, server) = tokio::io::duplex(8192);
        let mut server = BufReader::new(server);

        client
            .write_all(b"Subject: hello\r\nFrom: a@b.c\r\n\r\nbody line\r\n.\r\n")
            .await?;
        client.shutdown().await?;

        let (headers, body) = receive(&mut server, 1_000_000, 0).await.unwrap();
        assert_eq!(
            headers,
            vec![
                ("Subject".to_owned(), "hello".to_owned()),
                ("From".to_owned(), "a@b.c".to_owned()),
            ]
        );
        assert_eq!(body, b"body line\r\n");

        Ok(())
    }

    #[tokio::test]
    async fn folded_header_continuation() -> anyhow::Result<()> {
        let (mut client, server) = tokio::io::duplex(8192);
        let mut server = BufReader::new(server);

        client
            .write_all(b"Subject: hello\r\n world\r\n\r\nbody\r\n.\r\n")
            .await?;
        client.shutdown().await?;

        let (headers, body) = receive(&mut server, 1_000_000, 0).await.unwrap();
        assert_eq!(
            headers,
            vec![("Subject".to_owned(), "hello world".to_owned())]
        );
        assert_eq!(body, b"body\r\n");

        Ok(())
    }

    #[tokio::test]
    async fn no_headers_straight_to_body() -> anyhow::Result<()> {
        let (mut client, server) = tokio::io::duplex(8192);
        let mut server = BufReader::new(server);

        client.write_all(b"just a body line\r\n.\r\n").await?;
        client.shutdown().await?;

        let (headers, body) = receive(&mut server, 1_000_000, 0).await.unwrap();
        assert!(headers.is_empty());
        assert_eq!(body, b"just a body line\r\n");

        Ok(())
    }

    #[tokio::test]
    async fn size_cap_exceeded() -> anyhow::Result<()> {
        let (mut client, server) = tokio::io::duplex(8192);
        let mut server = BufReader::new(server);

        client.write_all(b"Subject: hi\r\n\r\n").await?;
        client.write_all(&vec![b'x'; 100]).await?;
        client.write_all(b"\r\n.\r\n").await?;
        client.shutdown().await?;

        let result = receive(&mut server, 10, 0).await;
        assert!(matches!(result, Err(super::BodyError::TooLarge)));

        Ok(())
    }
}
