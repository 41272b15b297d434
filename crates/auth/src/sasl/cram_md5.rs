use async_trait::async_trait;
use hmac::{Hmac, Mac};
use md5::Md5;
use rand::Rng;

use super::{Mechanism, MechanismError, Response};

type HmacMd5 = Hmac<Md5>;

fn issue_challenge(hostname: &str) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let r1: u32 = rng.gen();
    let r2: u32 = rng.gen();
    format!("<{r1}.{r2}@{hostname}>").into_bytes()
}

fn hex_digest(challenge: &[u8], password: &[u8]) -> String {
    let mut mac = HmacMd5::new_from_slice(password).expect("HMAC accepts any key length");
    mac.update(challenge);
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// `AUTH CRAM-MD5`.
///
/// ```text
/// C: AUTH CRAM-MD5
/// S: 334 PDE4OTYuNjk3MTcwOTUyQHBvc3RvZmZpY2UucmVzdG9uLm1jaS5uZXQ+
/// C: <base64(username SP hexdigest)>
/// ```
///
/// Unlike PLAIN/LOGIN the server never sees the plaintext password; the
/// client proves it knows the shared secret by HMAC-MD5'ing the challenge.
/// Validity is decided by [`crate::Validator::validate_cram_md5`], since
/// checking the digest requires access to the stored secret, not a
/// username/password pair.
pub struct CramMd5 {
    challenge: Vec<u8>,
}

impl CramMd5 {
    /// Builds the mechanism around a freshly issued challenge bound to
    /// `hostname`, per the `<R1.R2@hostname>` form.
    pub fn with_hostname(hostname: &str) -> (Self, Vec<u8>) {
        let challenge = issue_challenge(hostname);
        (
            Self {
                challenge: challenge.clone(),
            },
            challenge,
        )
    }

    /// Recomputes the expected digest for a known password; exposed so a
    /// [`crate::Validator`] implementation backed by a plaintext-equivalent
    /// credential store can check equality without depending on this
    /// module's internals.
    pub fn expected_digest(challenge: &[u8], password: &[u8]) -> String {
        hex_digest(challenge, password)
    }
}

#[async_trait]
impl Mechanism for CramMd5 {
    fn init() -> (Self, Vec<u8>) {
        // A bare `init()` has no hostname to bind the challenge to; callers
        // that care about the RFC 2195 `@hostname` suffix should use
        // `with_hostname` instead and only fall back to this for generic
        // `Mechanism`-trait-bound code.
        Self::with_hostname("localhost")
    }

    async fn eat<A: crate::Validator>(
        &mut self,
        validator: &A,
        bytes: &[u8],
    ) -> Result<Response, MechanismError> {
        let text = std::str::from_utf8(bytes).map_err(|_| MechanismError::Decode)?;
        let (username, digest) = text.split_once(' ').ok_or(MechanismError::Decode)?;

        let identity = validator
            .validate_cram_md5(username, &self.challenge, digest)
            .await?;
        Ok(Response::Success(identity))
    }
}
