//! Constants used in constructing and validating witness tokens

/// The number of bytes in a serialized witness signature, `r || s || v`
pub const NUM_BYTES_SIGNATURE: usize = 65;

/// The index of the recovery byte `v` within a serialized signature
pub const RECOVERY_BYTE_INDEX: usize = NUM_BYTES_SIGNATURE - 1;

/// The environment variable from which the witness signer key is read by default
pub const WITNESS_SIGNER_KEY_ENV_VAR: &str = "WITNESS_SIGNER_KEY";
