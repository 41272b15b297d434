//! Session-level error taxonomy.
//!
//! Most protocol errors are recoverable: the session writes a reply and
//! keeps going. [`SessionError`] is reserved for conditions that end the
//! session outright — the transport is gone, or the client has
//! misbehaved badly enough that continuing isn't safe.

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("idle timeout exceeded")]
    Timeout,
}
