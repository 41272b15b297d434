use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use line::stream::{MaybeTls, ServerTlsStream};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::rustls;

use self::session::Session;
use crate::handler::Handler;

pub mod session;

/// Shared server configuration plus a factory for a fresh [`Handler`]
/// instance per accepted connection (the handler owns per-session
/// application state, so it cannot be shared).
pub struct Context<F> {
    pub hostname: String,
    pub tls: Option<Arc<rustls::ServerConfig>>,
    pub size_cap: u64,
    pub idle_timeout: Duration,
    pub new_handler: F,
}

impl<F: Clone> Clone for Context<F> {
    fn clone(&self) -> Self {
        Self {
            hostname: self.hostname.clone(),
            tls: self.tls.clone(),
            size_cap: self.size_cap,
            idle_timeout: self.idle_timeout,
            new_handler: self.new_handler.clone(),
        }
    }
}

impl<F> Context<F> {
    /// 10 MiB, the default `SIZE` cap.
    pub const DEFAULT_SIZE_CAP: u64 = 10 * 1024 * 1024;
    /// 180s idle timeout between commands.
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(180);
}

pub struct Server<F> {
    context: Context<F>,
    session_count: Arc<AtomicU64>,
}

impl<F, H> Server<F>
where
    F: Fn() -> H + Send + Sync,
    H: Handler,
{
    #[must_use]
    pub fn new(context: Context<F>) -> Self {
        Self {
            context,
            session_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Accepts a connection handed back by something like `MultiListener`,
    /// which already knows at accept time whether the socket is plaintext
    /// or TLS. `peer` is a human-readable description of the remote address,
    /// forwarded to [`Handler::init`] along with this process's running
    /// count of accepted sessions.
    #[must_use]
    pub fn accept<IO: AsyncRead + AsyncWrite + Unpin>(
        &self,
        stream: MaybeTls<ServerTlsStream<IO>, IO>,
        peer: impl Into<String>,
    ) -> Session<IO, H> {
        let handler = (self.context.new_handler)();
        let session_count = self.session_count.fetch_add(1, Ordering::Relaxed) + 1;
        Session::new(
            stream,
            self.context.hostname.clone(),
            self.context.tls.clone(),
            self.context.size_cap,
            self.context.idle_timeout,
            handler,
            session_count,
            peer.into(),
        )
    }
}
