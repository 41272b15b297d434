use secrecy::SecretString;

pub mod sasl;

pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unknown error")]
    Unknown,
}

#[async_trait::async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, credentials: &Credentials) -> Result<Identity, ValidationError>;

    /// Validates a CRAM-MD5 response. Unlike [`Self::validate`], the
    /// password is never seen in the clear: the client proves knowledge of
    /// it by hashing the server's challenge, so the implementor must hold
    /// (or be able to recompute) the shared secret to check `digest`.
    ///
    /// `challenge` is the decoded challenge the server issued; `digest` is
    /// the lowercase hex HMAC-MD5 the client returned.
    async fn validate_cram_md5(
        &self,
        username: &str,
        challenge: &[u8],
        digest: &str,
    ) -> Result<Identity, ValidationError> {
        let _ = (username, challenge, digest);
        Err(ValidationError::Unknown)
    }
}
