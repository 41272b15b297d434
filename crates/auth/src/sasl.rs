use crate::Identity;

pub mod cram_md5;
pub mod login;
pub mod plain;

pub use cram_md5::CramMd5;
pub use login::Login;
pub use plain::Plain;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MechanismKind {
    Plain,
    Login,
    CramMd5,
}

impl MechanismKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
        }
    }
}

impl std::str::FromStr for MechanismKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PLAIN" => Ok(Self::Plain),
            "LOGIN" => Ok(Self::Login),
            "CRAM-MD5" => Ok(Self::CramMd5),
            _ => Err(()),
        }
    }
}

pub enum Response {
    Success(Identity),
    Proceed(Vec<u8>),
}

#[derive(Debug, thiserror::Error)]
pub enum MechanismError {
    #[error(transparent)]
    Validation(#[from] crate::ValidationError),
    #[error("decode error")]
    Decode,
}

#[async_trait::async_trait]
pub trait Mechanism: Sized {
    fn init() -> (Self, Vec<u8>);

    async fn eat<V: crate::Validator>(&mut self, validator: &V, bytes: &[u8]) -> EatResult;
}

pub type EatResult = Result<Response, MechanismError>;
