use std::time::Duration;

use smtp::server::Context as SmtpContext;

/// Environment-driven server configuration, loaded once at startup.
pub struct Config {
    pub plain_addr: String,
    pub tls_addr: Option<String>,
    pub hostname: String,
    pub size_cap: u64,
    pub idle_timeout: Duration,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let size_cap = std::env::var("SMTP_SIZE_CAP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(SmtpContext::<()>::DEFAULT_SIZE_CAP);

        let idle_timeout = std::env::var("SMTP_IDLE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(SmtpContext::<()>::DEFAULT_IDLE_TIMEOUT, Duration::from_secs);

        Ok(Self {
            plain_addr: env_or("SMTP_LISTEN_ADDR", "0.0.0.0:25"),
            tls_addr: std::env::var("SMTP_TLS_LISTEN_ADDR").ok(),
            hostname: env_or("SMTP_HOSTNAME", "localhost"),
            size_cap,
            idle_timeout,
            tls_cert_path: std::env::var("SMTP_TLS_CERT").ok(),
            tls_key_path: std::env::var("SMTP_TLS_KEY").ok(),
        })
    }
}
