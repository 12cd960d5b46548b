//! Definitions of errors that can occur while producing or checking witness tokens

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur while producing or checking witness tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WitnessError {
    /// No witness signer key was configured
    MissingSignerKey,
    /// The configured witness signer key could not be parsed
    InvalidSignerKey(String),
    /// The signing operation itself failed
    Signing(String),
    /// A signature was malformed or could not be recovered
    InvalidSignature(String),
}

impl Display for WitnessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            WitnessError::MissingSignerKey => write!(f, "missing witness signer key"),
            WitnessError::InvalidSignerKey(s) => write!(f, "invalid witness signer key: {}", s),
            WitnessError::Signing(s) => write!(f, "error signing witness: {}", s),
            WitnessError::InvalidSignature(s) => write!(f, "invalid witness signature: {}", s),
        }
    }
}

impl Error for WitnessError {}
