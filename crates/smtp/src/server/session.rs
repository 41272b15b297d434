use std::{sync::Arc, time::Duration};

use auth::sasl::{plain, CramMd5, MechanismKind};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use line::{
    read_line,
    stream::{MaybeTls, ServerTlsStream},
    Connection, ReadLineError,
};
use secrecy::ExposeSecret;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::rustls;
use tracing::{debug, instrument};

use crate::{
    capability::Capabilities,
    command::{read_cmd, Command},
    handler::{Credential, DataOutcome, Decision, Handler, InitDecision, VrfyOutcome},
    io::bye,
    message::{self, Envelope},
};

/// SMTP session with a client, driven by an application-supplied [`Handler`].
pub struct Session<IO: AsyncRead + AsyncWrite + Unpin, H: Handler> {
    connection: Connection<ServerTlsStream<IO>, IO>,
    hostname: String,
    tls: Option<Arc<rustls::ServerConfig>>,
    size_cap: u64,
    idle_timeout: Duration,
    envelope: Option<Envelope>,
    helo_domain: Option<String>,
    authenticated_as: Option<String>,
    handler: H,
    session_count: u64,
    peer: String,
}

impl<IO: AsyncRead + AsyncWrite + Unpin, H: Handler> Session<IO, H> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stream: impl Into<MaybeTls<ServerTlsStream<IO>, IO>>,
        hostname: String,
        tls: Option<Arc<rustls::ServerConfig>>,
        size_cap: u64,
        idle_timeout: Duration,
        handler: H,
        session_count: u64,
        peer: String,
    ) -> Self {
        Self {
            connection: Connection::new(stream),
            hostname,
            tls,
            size_cap,
            idle_timeout,
            envelope: None,
            helo_domain: None,
            authenticated_as: None,
            handler,
            session_count,
            peer,
        }
    }

    fn reset_mail_txn(&mut self) {
        self.envelope = None;
    }

    /// Writes the banner. `banner` is the handler-chosen full reply line
    /// (from [`InitDecision::Proceed`]); `None` falls back to the default
    /// `220 <hostname>` greeting.
    async fn greet(&mut self, banner: Option<String>) -> std::io::Result<()> {
        let line = banner.unwrap_or_else(|| format!("220 {}", self.hostname));
        self.connection.write_flush(format!("{line}\r\n")).await
    }

    fn builtin_capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::builtin(self.size_cap);
        caps.set_param("AUTH", "PLAIN LOGIN CRAM-MD5");
        if self.tls.is_some() && self.connection.is_plain() {
            caps.set_flag("STARTTLS");
        }
        caps
    }

    async fn ehlo(&mut self, domain: String) -> std::io::Result<()> {
        debug!(?domain, "received ehlo");
        self.reset_mail_txn();
        self.helo_domain = Some(domain.clone());

        let builtin = self.builtin_capabilities();
        let capabilities = self.handler.handle_ehlo(&domain, builtin).await;

        self.connection
            .write_flush(crate::capability::format_ehlo_response(
                &self.hostname,
                &capabilities,
            ))
            .await
    }

    async fn helo(&mut self, domain: String) -> std::io::Result<()> {
        debug!(?domain, "received helo");
        self.reset_mail_txn();
        match self.handler.handle_helo(&domain).await {
            Decision::Ok => {
                self.helo_domain = Some(domain);
                self.connection
                    .write_flush(format!("250 {}\r\n", self.hostname))
                    .await
            }
            Decision::Reject(reply) => self.connection.write_flush(format!("{reply}\r\n")).await,
        }
    }

    async fn starttls(&mut self, arg: String) -> std::io::Result<()> {
        if !arg.is_empty() {
            self.connection
                .write_flush("501 Syntax error (no parameters allowed)\r\n")
                .await?;
            return Ok(());
        }

        if self.connection.is_tls() {
            self.connection
                .write_flush("500 TLS already negotiated\r\n")
                .await?;
            return Ok(());
        }

        let Some(tls_config) = &self.tls else {
            self.connection
                .write_flush("454 TLS not available\r\n")
                .await?;
            return Ok(());
        };
        let acceptor = tokio_rustls::TlsAcceptor::from(tls_config.clone());

        self.connection.write_flush("220 Go ahead\r\n").await?;
        self.connection.upgrade(&acceptor).await?;

        self.helo_domain = None;
        self.authenticated_as = None;
        self.reset_mail_txn();

        Ok(())
    }

    async fn write_challenge(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        if bytes.is_empty() {
            self.connection.write_flush("334 \r\n").await
        } else {
            self.connection
                .write_flush(format!("334 {}\r\n", STANDARD.encode(bytes)))
                .await
        }
    }

    /// Reads one base64-encoded auth continuation line. `None` means the
    /// client aborted with a lone `*` or the connection closed.
    async fn read_continuation(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        match read_line(self.connection.stream_mut(), &mut buf).await {
            Ok(()) => (),
            Err(ReadLineError::Eof) => return Ok(None),
            Err(ReadLineError::Io(e)) => return Err(e),
        }
        if buf == b"*" {
            return Ok(None);
        }
        match STANDARD.decode(&buf) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(_) => Ok(Some(Vec::new())),
        }
    }

    /// Drives one full AUTH exchange and replies with `235`/`535`/`504`.
    async fn authenticate(
        &mut self,
        mechanism: String,
        initial_response: Option<String>,
    ) -> std::io::Result<()> {
        let Ok(kind) = mechanism.parse::<MechanismKind>() else {
            self.connection
                .write_flush("504 Unrecognized authentication type\r\n")
                .await?;
            return Ok(());
        };

        let initial = match initial_response {
            Some(text) if text == "=" => Some(Vec::new()),
            Some(text) => match STANDARD.decode(&text) {
                Ok(bytes) => Some(bytes),
                Err(_) => {
                    self.connection
                        .write_flush("501 Syntax error in parameters\r\n")
                        .await?;
                    return Ok(());
                }
            },
            None => None,
        };

        let username = match kind {
            MechanismKind::Plain => self.run_plain(initial).await?,
            MechanismKind::Login => self.run_login().await?,
            MechanismKind::CramMd5 => self.run_cram_md5().await?,
        };

        match username {
            Some(username) => {
                self.authenticated_as = Some(username);
                self.connection
                    .write_flush("235 Authentication successful.\r\n")
                    .await
            }
            None => {
                self.connection
                    .write_flush("535 Authentication failed.\r\n")
                    .await
            }
        }
    }

    /// Decodes a `PLAIN` payload and asks the handler to validate it.
    ///
    /// This calls `auth::sasl::plain::decode` directly rather than going
    /// through `Mechanism::eat`, since that trait method takes an
    /// `auth::Validator` by shared reference — a poor fit for a handler that
    /// owns its state exclusively per spec's "the handler decides validity".
    async fn run_plain(&mut self, initial: Option<Vec<u8>>) -> std::io::Result<Option<String>> {
        let bytes = match initial {
            Some(bytes) => bytes,
            None => {
                self.write_challenge(&[]).await?;
                match self.read_continuation().await? {
                    Some(bytes) => bytes,
                    None => return Ok(None),
                }
            }
        };

        let Ok(credentials) = plain::decode(&bytes) else {
            return Ok(None);
        };
        let ok = self
            .handler
            .handle_auth(
                &credentials.username,
                &Credential::Password(credentials.password.expose_secret().to_owned()),
            )
            .await;
        Ok(ok.then_some(credentials.username))
    }

    async fn run_login(&mut self) -> std::io::Result<Option<String>> {
        self.write_challenge(b"Username:").await?;
        let Some(username_bytes) = self.read_continuation().await? else {
            return Ok(None);
        };
        let Ok(username) = String::from_utf8(username_bytes) else {
            return Ok(None);
        };

        self.write_challenge(b"Password:").await?;
        let Some(password_bytes) = self.read_continuation().await? else {
            return Ok(None);
        };
        let Ok(password) = String::from_utf8(password_bytes) else {
            return Ok(None);
        };

        let ok = self
            .handler
            .handle_auth(&username, &Credential::Password(password))
            .await;
        Ok(ok.then_some(username))
    }

    async fn run_cram_md5(&mut self) -> std::io::Result<Option<String>> {
        let (_, challenge) = CramMd5::with_hostname(&self.hostname);
        self.write_challenge(&challenge).await?;
        let Some(response) = self.read_continuation().await? else {
            return Ok(None);
        };

        let Ok(text) = std::str::from_utf8(&response) else {
            return Ok(None);
        };
        let Some((username, digest)) = text.split_once(' ') else {
            return Ok(None);
        };

        let ok = self
            .handler
            .handle_auth(
                username,
                &Credential::CramMd5 {
                    challenge: challenge.clone(),
                    digest: digest.to_owned(),
                },
            )
            .await;
        Ok(ok.then_some(username.to_owned()))
    }

    async fn mail(&mut self, from: String, extensions: String) -> std::io::Result<()> {
        if self.helo_domain.is_none() {
            return self
                .connection
                .write_flush("503 Error: send HELO/EHLO first\r\n")
                .await;
        }
        if self.envelope.is_some() {
            return self
                .connection
                .write_flush("503 Error: Nested MAIL command\r\n")
                .await;
        }

        let mut expected_size = None;
        for token in extensions.split_whitespace() {
            let upper = token.to_ascii_uppercase();
            if let Some(value) = upper.strip_prefix("SIZE=") {
                let size: u64 = value.parse().unwrap_or(u64::MAX);
                if size > self.size_cap {
                    return self
                        .connection
                        .write_flush(format!(
                            "552 Estimated message length {size} exceeds limit of {}\r\n",
                            self.size_cap
                        ))
                        .await;
                }
                expected_size = Some(size);
            } else if upper.starts_with("BODY=") {
                // 8BITMIME is always in the built-in set, so BODY= is always
                // acceptable here.
            } else if let Decision::Reject(reply) =
                self.handler.handle_mail_extension(token).await
            {
                return self.connection.write_flush(format!("{reply}\r\n")).await;
            }
        }

        match self.handler.handle_mail(&from).await {
            Decision::Ok => {
                let mut envelope = Envelope::new(from);
                envelope.expected_size = expected_size;
                self.envelope = Some(envelope);
                self.connection.write_flush("250 sender Ok\r\n").await
            }
            Decision::Reject(reply) => self.connection.write_flush(format!("{reply}\r\n")).await,
        }
    }

    async fn rcpt(&mut self, to: String, extensions: String) -> std::io::Result<()> {
        if self.envelope.is_none() {
            return self
                .connection
                .write_flush("503 Error: need MAIL command\r\n")
                .await;
        }

        for token in extensions.split_whitespace() {
            if let Decision::Reject(reply) = self.handler.handle_rcpt_extension(token).await {
                return self.connection.write_flush(format!("{reply}\r\n")).await;
            }
        }

        match self.handler.handle_rcpt(&to).await {
            Decision::Ok => {
                self.envelope.as_mut().expect("checked above").to.push(to);
                self.connection.write_flush("250 recipient Ok\r\n").await
            }
            Decision::Reject(reply) => self.connection.write_flush(format!("{reply}\r\n")).await,
        }
    }

    async fn data(&mut self) -> std::io::Result<()> {
        let Some(envelope) = self.envelope.take() else {
            let reply = if self.helo_domain.is_none() {
                "503 Error: send HELO/EHLO first\r\n"
            } else {
                "503 Error: need MAIL command\r\n"
            };
            return self.connection.write_flush(reply).await;
        };
        if envelope.to.is_empty() {
            self.envelope = Some(envelope);
            return self
                .connection
                .write_flush("503 Error: need RCPT command\r\n")
                .await;
        }

        self.connection
            .write_flush("354 enter mail, end with line containing only '.'\r\n")
            .await?;

        match message::receive(self.connection.stream_mut(), self.size_cap, 0).await {
            Ok((headers, body)) => {
                match self
                    .handler
                    .handle_data(&envelope.from, &envelope.to, &headers, &body)
                    .await
                {
                    DataOutcome::Queued(reference) => {
                        self.connection
                            .write_flush(format!("250 queued as {reference}\r\n"))
                            .await
                    }
                    DataOutcome::Reject(reply) => {
                        self.connection.write_flush(format!("{reply}\r\n")).await
                    }
                }
            }
            Err(message::BodyError::TooLarge) => {
                self.connection
                    .write_flush("552 Message too large\r\n")
                    .await
            }
            Err(message::BodyError::UnexpectedEof) => {
                Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof))
            }
            Err(message::BodyError::Io(e)) => Err(e),
        }
    }

    /// Drives the session to completion: banner, command loop, and a final
    /// `terminate` callback on every exit path.
    #[instrument(skip_all)]
    pub async fn run(&mut self) -> std::io::Result<()> {
        let peer = self.peer.clone();
        match self
            .handler
            .init(&self.hostname, self.session_count, &peer)
            .await
        {
            InitDecision::Proceed(banner) => self.greet(banner).await?,
            InitDecision::Reject { goodbye } => {
                self.connection
                    .write_flush(format!("{goodbye}\r\n"))
                    .await?;
                self.handler.terminate("rejected during init").await;
                return Ok(());
            }
        }

        let reason = self.serve().await;
        self.handler.terminate(reason).await;
        Ok(())
    }

    async fn serve(&mut self) -> &'static str {
        loop {
            let cmd = match read_cmd(self.connection.stream_mut(), self.idle_timeout).await {
                Ok(Some(cmd)) => cmd,
                Ok(None) => return "transport closed",
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    let _ = self
                        .connection
                        .write_flush("421 Error: timeout exceeded\r\n")
                        .await;
                    return "idle timeout";
                }
                Err(_) => return "transport error",
            };

            match self.dispatch(cmd).await {
                Ok(true) => return "quit",
                Ok(false) => continue,
                Err(_) => return "io error",
            }
        }
    }

    /// Handles one parsed command. Returns `Ok(true)` once `QUIT` has been
    /// answered and the session should stop.
    async fn dispatch(&mut self, cmd: Command) -> std::io::Result<bool> {
        match cmd {
            Command::Helo { domain } => self.helo(domain).await.map(|()| false),
            Command::Ehlo { domain } => self.ehlo(domain).await.map(|()| false),
            Command::Mail { from, extensions } => self.mail(from, extensions).await.map(|()| false),
            Command::Rcpt { to, extensions } => self.rcpt(to, extensions).await.map(|()| false),
            Command::Data => self.data().await.map(|()| false),
            Command::Rset => {
                self.reset_mail_txn();
                self.handler.handle_rset().await;
                self.connection.write_flush("250 Ok\r\n").await.map(|()| false)
            }
            Command::Noop => self.connection.write_flush("250 Ok\r\n").await.map(|()| false),
            Command::Quit => {
                bye(self.connection.stream_mut()).await?;
                Ok(true)
            }
            Command::Starttls { arg } => self.starttls(arg).await.map(|()| false),
            Command::Vrfy { arg } => {
                let reply = match self.handler.handle_vrfy(&arg).await {
                    VrfyOutcome::Ok(reply) | VrfyOutcome::Reject(reply) => reply,
                };
                self.connection
                    .write_flush(format!("{reply}\r\n"))
                    .await
                    .map(|()| false)
            }
            Command::Auth {
                mechanism,
                initial_response,
            } => {
                if self.helo_domain.is_none() {
                    return self
                        .connection
                        .write_flush("503 Error: send EHLO first\r\n")
                        .await
                        .map(|()| false);
                }
                if self.envelope.is_some() {
                    return self
                        .connection
                        .write_flush("503 Error: transaction in progress\r\n")
                        .await
                        .map(|()| false);
                }
                self.authenticate(mechanism, initial_response)
                    .await
                    .map(|()| false)
            }
            Command::Other { verb, arg } => {
                let reply = self.handler.handle_other(&verb, &arg).await;
                self.connection
                    .write_flush(format!("{reply}\r\n"))
                    .await
                    .map(|()| false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::handler::{Credential, DataOutcome, Handler};

    struct EchoHandler {
        queued: Vec<(String, Vec<String>, Vec<u8>)>,
    }

    #[async_trait]
    impl Handler for EchoHandler {
        async fn handle_auth(&mut self, username: &str, credential: &Credential) -> bool {
            match credential {
                Credential::Password(p) => username == "alice" && p == "hunter2",
                Credential::CramMd5 { challenge, digest } => {
                    username == "alice"
                        && *digest == CramMd5::expected_digest(challenge, b"hunter2")
                }
            }
        }

        async fn handle_data(
            &mut self,
            from: &str,
            to: &[String],
            _headers: &[(String, String)],
            body: &[u8],
        ) -> DataOutcome {
            self.queued
                .push((from.to_owned(), to.to_vec(), body.to_vec()));
            DataOutcome::Queued("abc123".to_owned())
        }
    }

    async fn run_transcript(script: &'static [u8]) -> anyhow::Result<String> {
        let (mut client, server) = tokio::io::duplex(16384);

        let task = tokio::spawn(async move {
            let handler = EchoHandler { queued: Vec::new() };
            let mut session = Session::new(
                server,
                "mail.example.com".to_owned(),
                None,
                1_000_000,
                Duration::from_secs(5),
                handler,
                1,
                "127.0.0.1:0".to_owned(),
            );
            session.run().await
        });

        client.write_all(script).await?;
        client.shutdown().await?;

        let mut out = String::new();
        client.read_to_string(&mut out).await?;
        task.await??;

        Ok(out)
    }

    #[tokio::test]
    async fn full_delivery_with_plain_auth() -> anyhow::Result<()> {
        let script = b"EHLO there\r\n\
AUTH PLAIN AGFsaWNlAGh1bnRlcjI=\r\n\
MAIL FROM:<alice@example.com>\r\n\
RCPT TO:<bob@example.com>\r\n\
DATA\r\n\
Subject: hi\r\n\
\r\n\
hello\r\n\
.\r\n\
QUIT\r\n";

        let transcript = run_transcript(script).await?;
        assert!(transcript.starts_with("220 mail.example.com\r\n"));
        assert!(transcript.contains("235 Authentication successful.\r\n"));
        assert!(transcript.contains("250 sender Ok\r\n"));
        assert!(transcript.contains("250 recipient Ok\r\n"));
        assert!(transcript.contains("250 queued as abc123\r\n"));
        assert!(transcript.ends_with("221 Bye\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn rcpt_without_mail_is_rejected() -> anyhow::Result<()> {
        let script = b"EHLO there\r\nRCPT TO:<bob@example.com>\r\nQUIT\r\n";
        let transcript = run_transcript(script).await?;
        assert!(transcript.contains("503 Error: need MAIL command\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn auth_before_ehlo_rejected() -> anyhow::Result<()> {
        let script = b"AUTH PLAIN AGFsaWNlAGh1bnRlcjI=\r\nQUIT\r\n";
        let transcript = run_transcript(script).await?;
        assert!(transcript.contains("503 Error: send EHLO first\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn unrecognized_mechanism_rejected() -> anyhow::Result<()> {
        let script = b"EHLO there\r\nAUTH FOOBAR\r\nQUIT\r\n";
        let transcript = run_transcript(script).await?;
        assert!(transcript.contains("504 Unrecognized authentication type\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn auth_login_prompts_for_username_then_password() -> anyhow::Result<()> {
        let script = format!(
            "EHLO there\r\nAUTH LOGIN\r\n{}\r\n{}\r\nQUIT\r\n",
            STANDARD.encode("alice"),
            STANDARD.encode("hunter2"),
        );
        let transcript = run_transcript(script.into_bytes().leak()).await?;
        assert!(transcript.contains(&format!("334 {}\r\n", STANDARD.encode("Username:"))));
        assert!(transcript.contains(&format!("334 {}\r\n", STANDARD.encode("Password:"))));
        assert!(transcript.contains("235 Authentication successful.\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn auth_login_wrong_password_fails() -> anyhow::Result<()> {
        let script = format!(
            "EHLO there\r\nAUTH LOGIN\r\n{}\r\n{}\r\nQUIT\r\n",
            STANDARD.encode("alice"),
            STANDARD.encode("wrong"),
        );
        let transcript = run_transcript(script.into_bytes().leak()).await?;
        assert!(transcript.contains("535 Authentication failed.\r\n"));

        Ok(())
    }

    /// Drives CRAM-MD5 interactively since the challenge is random: reads
    /// the `334`-prefixed challenge off the wire, computes the expected
    /// digest the way a real client would, and answers it.
    #[tokio::test]
    async fn auth_cram_md5_round_trip() -> anyhow::Result<()> {
        let (mut client, server) = tokio::io::duplex(16384);

        let task = tokio::spawn(async move {
            let handler = EchoHandler { queued: Vec::new() };
            let mut session = Session::new(
                server,
                "mail.example.com".to_owned(),
                None,
                1_000_000,
                Duration::from_secs(5),
                handler,
                1,
                "127.0.0.1:0".to_owned(),
            );
            session.run().await
        });

        async fn read_line(stream: &mut (impl AsyncReadExt + Unpin)) -> anyhow::Result<String> {
            let mut line = Vec::new();
            loop {
                let mut byte = [0u8; 1];
                stream.read_exact(&mut byte).await?;
                line.push(byte[0]);
                if line.ends_with(b"\r\n") {
                    break;
                }
            }
            Ok(String::from_utf8(line)?)
        }

        client.write_all(b"EHLO there\r\n").await?;
        loop {
            let line = read_line(&mut client).await?;
            if line.starts_with("250 ") {
                break;
            }
        }
        client.write_all(b"AUTH CRAM-MD5\r\n").await?;
        let challenge_line = read_line(&mut client).await?;
        let encoded = challenge_line
            .strip_prefix("334 ")
            .and_then(|s| s.strip_suffix("\r\n"))
            .expect("challenge line");
        let challenge = STANDARD.decode(encoded)?;
        let digest = CramMd5::expected_digest(&challenge, b"hunter2");

        let response = STANDARD.encode(format!("alice {digest}"));
        client.write_all(response.as_bytes()).await?;
        client.write_all(b"\r\n").await?;
        let reply = read_line(&mut client).await?;
        assert_eq!(reply, "235 Authentication successful.\r\n");

        client.write_all(b"QUIT\r\n").await?;
        client.shutdown().await?;
        task.await??;

        Ok(())
    }

    #[tokio::test]
    async fn starttls_unavailable_without_tls_config() -> anyhow::Result<()> {
        let script = b"EHLO there\r\nSTARTTLS\r\nQUIT\r\n";
        let transcript = run_transcript(script).await?;
        assert!(transcript.contains("454 TLS not available\r\n"));
        assert!(!transcript.contains("STARTTLS"));

        Ok(())
    }

    #[tokio::test]
    async fn starttls_rejects_arguments() -> anyhow::Result<()> {
        let script = b"EHLO there\r\nSTARTTLS foo\r\nQUIT\r\n";
        let transcript = run_transcript(script).await?;
        assert!(transcript.contains("501 Syntax error (no parameters allowed)\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn mail_over_size_limit_rejected() -> anyhow::Result<()> {
        let script = b"EHLO there\r\nMAIL FROM:<alice@example.com> SIZE=999999999\r\nQUIT\r\n";
        let transcript = run_transcript(script).await?;
        assert!(transcript.contains("552 Estimated message length 999999999 exceeds limit of 1000000\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn nested_mail_rejected() -> anyhow::Result<()> {
        let script = b"EHLO there\r\n\
MAIL FROM:<alice@example.com>\r\n\
MAIL FROM:<bob@example.com>\r\n\
QUIT\r\n";
        let transcript = run_transcript(script).await?;
        assert!(transcript.contains("503 Error: Nested MAIL command\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn data_before_mail_reports_missing_helo_or_mail() -> anyhow::Result<()> {
        let transcript = run_transcript(b"DATA\r\nQUIT\r\n").await?;
        assert!(transcript.contains("503 Error: send HELO/EHLO first\r\n"));

        let transcript = run_transcript(b"EHLO there\r\nDATA\r\nQUIT\r\n").await?;
        assert!(transcript.contains("503 Error: need MAIL command\r\n"));

        Ok(())
    }
}
