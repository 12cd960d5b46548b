//! Witness authorization tokens.
//!
//! A witness token is an off-chain ECDSA signature over a `(recipient, category)`
//! pair. Mint-style contract methods accept the token as proof that the holder of
//! the witness key approved the mint for that recipient and campaign.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod constants;
pub mod errors;
mod signer;

pub use signer::{
    recover_witness_signer, sign_witness, verify_witness, witness_digest, witness_message,
    WitnessSignature, WitnessSigner,
};
