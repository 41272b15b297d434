use async_trait::async_trait;
use secrecy::SecretString;

use crate::Credentials;

use super::{Mechanism, MechanismError, Response};

enum State {
    WaitingUsername,
    WaitingPassword { username: String },
}

/// `AUTH LOGIN`.
///
/// ```text
/// C: AUTH LOGIN
/// S: 334 VXNlcm5hbWU6            ("Username:")
/// C: Ym9i                        ("bob")
/// S: 334 UGFzc3dvcmQ6            ("Password:")
/// C: aHVudGVyMg==                ("hunter2")
/// ```
pub struct Login {
    state: State,
}

#[async_trait]
impl Mechanism for Login {
    fn init() -> (Self, Vec<u8>) {
        (
            Self {
                state: State::WaitingUsername,
            },
            b"Username:".to_vec(),
        )
    }

    async fn eat<A: crate::Validator>(
        &mut self,
        validator: &A,
        bytes: &[u8],
    ) -> Result<Response, MechanismError> {
        let text = std::str::from_utf8(bytes).map_err(|_| MechanismError::Decode)?;

        match std::mem::replace(&mut self.state, State::WaitingUsername) {
            State::WaitingUsername => {
                self.state = State::WaitingPassword {
                    username: text.to_owned(),
                };
                Ok(Response::Proceed(b"Password:".to_vec()))
            }
            State::WaitingPassword { username } => {
                let credentials = Credentials {
                    username,
                    password: SecretString::new(text.to_owned()),
                };
                let identity = validator.validate(&credentials).await?;
                Ok(Response::Success(identity))
            }
        }
    }
}
