//! Construction, signing, and validation of witness tokens
//!
//! The verifying contract reproduces the message below byte for byte:
//!
//! ```solidity
//! bytes32 digest = keccak256(abi.encodePacked(recipient, category));
//! address signer = ECDSA.recover(MessageHashUtils.toEthSignedMessageHash(digest), signature);
//! ```
//!
//! Any deviation in field order or hash function silently breaks verification.

use std::{
    env,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use alloy::{
    primitives::{hex, keccak256, Address, Bytes, B256},
    signers::{local::PrivateKeySigner, Signature, SignerSync},
};
use tracing::debug;

use crate::{
    constants::{NUM_BYTES_SIGNATURE, RECOVERY_BYTE_INDEX},
    errors::WitnessError,
};

/// Build the packed witness message, `recipient || utf8(category)`
pub fn witness_message(recipient: Address, category: &str) -> Vec<u8> {
    [recipient.as_slice(), category.as_bytes()].concat()
}

/// Compute the digest signed by the witness key, `keccak256(recipient || utf8(category))`
pub fn witness_digest(recipient: Address, category: &str) -> B256 {
    keccak256(witness_message(recipient, category))
}

/// Sign a witness token for the given recipient and category label
///
/// Fails with [`WitnessError::MissingSignerKey`] if no key is supplied.
/// Never contacts the network.
pub fn sign_witness(
    recipient: Address,
    category: &str,
    signer_key: Option<&str>,
) -> Result<WitnessSignature, WitnessError> {
    WitnessSigner::from_key(signer_key)?.sign(recipient, category)
}

/// Recover the address of the key that signed a witness token
pub fn recover_witness_signer(
    signature: &WitnessSignature,
    recipient: Address,
    category: &str,
) -> Result<Address, WitnessError> {
    let digest = witness_digest(recipient, category);
    signature
        .0
        .recover_address_from_msg(digest.as_slice())
        .map_err(|e| WitnessError::InvalidSignature(e.to_string()))
}

/// Check that a witness token was produced by `expected_signer` for exactly
/// this recipient and category label
pub fn verify_witness(
    signature: &WitnessSignature,
    recipient: Address,
    category: &str,
    expected_signer: Address,
) -> Result<bool, WitnessError> {
    Ok(recover_witness_signer(signature, recipient, category)? == expected_signer)
}

// ----------
// | Signer |
// ----------

/// A parsed witness signer key
///
/// This key is used exclusively for producing witness tokens, never for
/// signing chain transactions.
#[derive(Clone, Debug)]
pub struct WitnessSigner {
    /// The underlying secp256k1 signer
    inner: PrivateKeySigner,
}

impl WitnessSigner {
    /// Parse a hex-encoded private key, with or without a `0x` prefix
    pub fn from_key(key: Option<&str>) -> Result<Self, WitnessError> {
        let key = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(WitnessError::MissingSignerKey)?;

        let inner = PrivateKeySigner::from_str(key)
            .map_err(|e| WitnessError::InvalidSignerKey(e.to_string()))?;

        Ok(Self { inner })
    }

    /// Read the key from the given environment variable
    pub fn from_env(var: &str) -> Result<Self, WitnessError> {
        Self::from_key(env::var(var).ok().as_deref())
    }

    /// The address whose signatures the verifying contract accepts
    pub fn address(&self) -> Address {
        self.inner.address()
    }

    /// Sign a witness token for the given recipient and category label
    ///
    /// Nonces are derived per RFC6979, so signing the same pair twice yields
    /// byte-identical tokens.
    pub fn sign(&self, recipient: Address, category: &str) -> Result<WitnessSignature, WitnessError> {
        let digest = witness_digest(recipient, category);
        let signature = self
            .inner
            .sign_message_sync(digest.as_slice())
            .map_err(|e| WitnessError::Signing(e.to_string()))?;

        debug!("Signed witness for {recipient:#x} in category `{category}`");
        Ok(WitnessSignature(signature))
    }
}

// -------------
// | Signature |
// -------------

/// A witness token, serialized on-chain as the 65 bytes `r || s || v`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WitnessSignature(Signature);

impl WitnessSignature {
    /// The serialized signature, with `v` in `{27, 28}`
    pub fn as_bytes(&self) -> [u8; NUM_BYTES_SIGNATURE] {
        self.0.as_bytes()
    }

    /// The serialized signature as ABI `bytes`
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.as_bytes())
    }

    /// Parse a serialized signature
    ///
    /// Accepts both legacy (`27`/`28`) and raw parity (`0`/`1`) recovery bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WitnessError> {
        if bytes.len() != NUM_BYTES_SIGNATURE {
            return Err(WitnessError::InvalidSignature(format!(
                "expected {NUM_BYTES_SIGNATURE} bytes, got {}",
                bytes.len()
            )));
        }

        let parity = match bytes[RECOVERY_BYTE_INDEX] {
            27 | 0 => false,
            28 | 1 => true,
            v => {
                return Err(WitnessError::InvalidSignature(format!("invalid recovery id {v}")))
            }
        };

        Ok(Self(Signature::from_bytes_and_parity(&bytes[..RECOVERY_BYTE_INDEX], parity)))
    }
}

impl FromStr for WitnessSignature {
    type Err = WitnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| WitnessError::InvalidSignature(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl Display for WitnessSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_prefixed(self.as_bytes()))
    }
}
