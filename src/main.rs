use std::sync::Arc;

use async_trait::async_trait;
use listener::MultiListener;
use smtp::handler::{Credential, DataOutcome, Decision, Handler, InitDecision};
use tokio_rustls::rustls::{self, Certificate, PrivateKey};
use tracing::{error, info, instrument};

mod config;
mod listener;

use config::Config;

/// Demonstration handler: accepts any HELO/MAIL/RCPT, any AUTH credential,
/// and logs each delivered message instead of actually queueing it anywhere.
#[derive(Default)]
struct LoggingHandler {
    peer: String,
}

#[async_trait]
impl Handler for LoggingHandler {
    async fn init(&mut self, _hostname: &str, session_count: u64, peer: &str) -> InitDecision {
        self.peer = peer.to_owned();
        info!(peer = %self.peer, session_count, "session started");
        InitDecision::Proceed(None)
    }

    async fn handle_helo(&mut self, domain: &str) -> Decision {
        info!(%domain, "helo");
        Decision::Ok
    }

    async fn handle_mail(&mut self, from: &str) -> Decision {
        info!(%from, "mail from");
        Decision::Ok
    }

    async fn handle_rcpt(&mut self, to: &str) -> Decision {
        info!(%to, "rcpt to");
        Decision::Ok
    }

    async fn handle_auth(&mut self, username: &str, _credential: &Credential) -> bool {
        info!(%username, "authenticated (demo handler accepts everyone)");
        true
    }

    async fn handle_data(
        &mut self,
        from: &str,
        to: &[String],
        headers: &[(String, String)],
        body: &[u8],
    ) -> DataOutcome {
        info!(
            %from,
            ?to,
            header_count = headers.len(),
            body_bytes = body.len(),
            "message received"
        );
        DataOutcome::Queued(uuid_like_id())
    }

    async fn terminate(&mut self, reason: &str) {
        info!(peer = %self.peer, %reason, "session ended");
    }
}

/// A short, dependency-free stand-in for a real queue reference.
fn uuid_like_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap())
        .collect()
}

fn load_tls_config(config: &Config) -> anyhow::Result<Arc<rustls::ServerConfig>> {
    let (cert_der, key_der) = match (&config.tls_cert_path, &config.tls_key_path) {
        (Some(cert_path), Some(key_path)) => {
            (std::fs::read(cert_path)?, std::fs::read(key_path)?)
        }
        _ => {
            let cert = rcgen::generate_simple_self_signed([config.hostname.clone()])?;
            (cert.serialize_der()?, cert.serialize_private_key_der())
        }
    };

    Ok(Arc::new(
        rustls::ServerConfig::builder()
            .with_safe_defaults()
            .with_no_client_auth()
            .with_single_cert(vec![Certificate(cert_der)], PrivateKey(key_der))?,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let tls_config = load_tls_config(&config)?;

    smtp(config, tls_config).await
}

#[instrument(skip_all)]
async fn smtp(config: Config, tls_config: Arc<rustls::ServerConfig>) -> anyhow::Result<()> {
    let mut listener = MultiListener::new(config.plain_addr.as_str()).await?;
    if let Some(tls_addr) = &config.tls_addr {
        listener = listener
            .with_tls(tls_addr.as_str(), tls_config.clone())
            .await?;
    }

    let context = smtp::server::Context {
        hostname: config.hostname,
        tls: Some(tls_config),
        size_cap: config.size_cap,
        idle_timeout: config.idle_timeout,
        new_handler: LoggingHandler::default,
    };
    let server = smtp::Server::new(context);

    loop {
        let (socket, addr) = listener.accept().await?;
        info!("got connection from: {addr}");

        let mut session = server.accept(socket, addr.to_string());

        tokio::spawn(async move {
            if let Err(e) = session.run().await {
                error!("an error occurred: {e:?}");
            }
        });
    }
}
