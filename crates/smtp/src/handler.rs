//! The policy seam the session calls into for every decision that isn't
//! pure protocol mechanics: accepting addresses, authenticating, and
//! ultimately consuming a finished message.
//!
//! Every callback has a default implementation so a minimal handler only
//! needs to override what it cares about, in the spirit of `mailin`'s
//! `Handler` trait.

use async_trait::async_trait;

use crate::capability::Capabilities;

/// Outcome of a callback that just accepts or rejects, with a handler-chosen
/// rejection reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Ok,
    Reject(String),
}

impl Decision {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Outcome of `handle_DATA`: either the message is queued (with a
/// handler-chosen reference included in the `250` reply) or rejected with a
/// handler-chosen reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOutcome {
    Queued(String),
    Reject(String),
}

/// Outcome of [`Handler::init`]: either proceed to the banner (optionally
/// overriding its text) or refuse the connection outright before the
/// command loop ever starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitDecision {
    /// Continue normally. `Some(line)` replaces the default `220 <hostname>`
    /// greeting with a handler-chosen full reply line (no trailing CRLF);
    /// `None` uses the default.
    Proceed(Option<String>),
    /// Refuse the connection. `goodbye` is written verbatim as the only
    /// reply before the transport is closed.
    Reject { goodbye: String },
}

/// Outcome of `handle_VRFY`: either an affirmative reply or a rejection,
/// both handler-chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VrfyOutcome {
    Ok(String),
    Reject(String),
}

/// A decoded AUTH attempt, passed to [`Handler::handle_auth`] regardless of
/// mechanism. For PLAIN/LOGIN, `credential` holds the password; for
/// CRAM-MD5 it holds `{challenge, digest}` rendered as `"challenge digest"`
/// since the handler (not the session) owns the secret store needed to
/// check it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Password(String),
    CramMd5 { challenge: Vec<u8>, digest: String },
}

/// Application-supplied policy and final envelope consumer.
///
/// Implementors own `Self` as the per-session state; the session holds one
/// instance per connection and calls these methods in the order described
/// by the protocol (HELO/EHLO, optional AUTH, MAIL, one or more RCPT, DATA).
#[async_trait]
pub trait Handler: Send {
    /// Called once, after the transport is accepted but before the banner
    /// is sent. `session_count` is this server process's ordinal count of
    /// accepted connections (including this one); `peer` is a
    /// human-readable description of the remote address. Lets a handler
    /// customize the greeting or refuse the connection outright (e.g. to
    /// enforce a connection-rate limit) before any command is read.
    async fn init(&mut self, _hostname: &str, _session_count: u64, _peer: &str) -> InitDecision {
        InitDecision::Proceed(None)
    }

    async fn handle_helo(&mut self, _domain: &str) -> Decision {
        Decision::Ok
    }

    /// Returns the final capability set to advertise, starting from the
    /// built-in `SIZE`/`8BITMIME`/`PIPELINING` set. The default
    /// implementation advertises the built-ins unchanged.
    async fn handle_ehlo(&mut self, _domain: &str, builtin: Capabilities) -> Capabilities {
        builtin
    }

    async fn handle_mail(&mut self, _from: &str) -> Decision {
        Decision::Ok
    }

    /// Called for each unrecognized `MAIL FROM:<addr>` parameter token
    /// (`SIZE=` and `BODY=` are handled by the session itself).
    async fn handle_mail_extension(&mut self, _token: &str) -> Decision {
        Decision::Reject("555 Unsupported option".to_owned())
    }

    async fn handle_rcpt(&mut self, _to: &str) -> Decision {
        Decision::Ok
    }

    async fn handle_rcpt_extension(&mut self, _token: &str) -> Decision {
        Decision::Reject("555 Unsupported option".to_owned())
    }

    /// Invoked once the body receiver has assembled a complete message.
    async fn handle_data(
        &mut self,
        from: &str,
        to: &[String],
        headers: &[(String, String)],
        body: &[u8],
    ) -> DataOutcome;

    async fn handle_rset(&mut self) {}

    async fn handle_vrfy(&mut self, _arg: &str) -> VrfyOutcome {
        VrfyOutcome::Reject("252 Cannot VRFY".to_owned())
    }

    /// Decides whether a decoded AUTH attempt succeeds. The default
    /// implementation rejects everything, so a handler that doesn't
    /// override this gets the "auth not implemented" behavior for free.
    async fn handle_auth(&mut self, _username: &str, _credential: &Credential) -> bool {
        false
    }

    /// Called for any verb the command parser didn't recognize.
    async fn handle_other(&mut self, _verb: &str, _arg: &str) -> String {
        "500 Command unrecognized".to_owned()
    }

    /// Called exactly once, on every exit path (QUIT, transport close,
    /// idle timeout, or a fatal protocol error), before the transport is
    /// released.
    async fn terminate(&mut self, _reason: &str) {}
}
