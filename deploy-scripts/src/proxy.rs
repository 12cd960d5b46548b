//! Helpers for upgradable proxy deployments

use alloy_primitives::{Address, U256};
use tracing::debug;

use crate::{
    artifacts::ContractArtifact,
    constants::{NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT, UUPS_UPGRADE_METHOD},
    errors::ScriptError,
    types::{ProxyKind, UnsafeAllow},
};

/// Extract the address held in the low 20 bytes of a storage slot
pub fn slot_value_to_address(value: U256) -> Address {
    let word = value.to_be_bytes::<NUM_BYTES_STORAGE_SLOT>();
    Address::from_slice(&word[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..])
}

/// Check that an implementation can safely sit behind the given proxy kind
///
/// Only checks decidable from the ABI are enforced here. Allowances for
/// bytecode-level checks are accepted for compatibility with existing deploy
/// configurations, logged, and otherwise ignored.
pub fn validate_implementation(
    artifact: &ContractArtifact,
    kind: &ProxyKind,
) -> Result<(), ScriptError> {
    let is_uups = matches!(kind, ProxyKind::Uups { .. });

    if !is_uups && kind.allows(UnsafeAllow::MissingPublicUpgradeTo) {
        return Err(ScriptError::UnsafeUpgrade(format!(
            "`{}` only applies to uups proxies, not {kind}",
            UnsafeAllow::MissingPublicUpgradeTo
        )));
    }

    // Proxied state is set by the initializer, constructor arguments never reach it
    if artifact.has_constructor_inputs() && !kind.allows(UnsafeAllow::Constructor) {
        return Err(ScriptError::UnsafeUpgrade(format!(
            "{} has a constructor with arguments, use an initializer or allow `{}`",
            artifact.name,
            UnsafeAllow::Constructor
        )));
    }

    if is_uups
        && !artifact.has_function(UUPS_UPGRADE_METHOD)
        && !kind.allows(UnsafeAllow::MissingPublicUpgradeTo)
    {
        return Err(ScriptError::UnsafeUpgrade(format!(
            "{} does not expose `{UUPS_UPGRADE_METHOD}` and could never be upgraded again",
            artifact.name
        )));
    }

    if !kind.unsafe_allow().is_empty() {
        debug!(
            "Deploying {} behind a {kind} proxy with unsafe allowances: {:?}",
            artifact.name,
            kind.unsafe_allow()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use alloy::json_abi::JsonAbi;
    use alloy_primitives::Bytes;

    use super::*;

    /// Build an artifact from a JSON ABI
    fn artifact(abi: &str) -> ContractArtifact {
        ContractArtifact {
            name: "Token".to_string(),
            abi: serde_json::from_str::<JsonAbi>(abi).unwrap(),
            bytecode: Bytes::from_static(&[0x60, 0x80]),
            source_ref: "src/Token.sol:Token".to_string(),
        }
    }

    /// An ABI exposing the UUPS upgrade method
    const UUPS_ABI: &str = r#"[{"type":"function","name":"upgradeToAndCall","inputs":[{"name":"newImplementation","type":"address"},{"name":"data","type":"bytes"}],"outputs":[],"stateMutability":"payable"}]"#;

    /// An ABI with a constructor taking an argument
    const CONSTRUCTOR_ABI: &str = r#"[{"type":"constructor","inputs":[{"name":"owner","type":"address"}],"stateMutability":"nonpayable"}]"#;

    #[test]
    fn test_slot_value_to_address() {
        let addr = Address::repeat_byte(0xab);
        let value = U256::from_be_slice(addr.as_slice());
        assert_eq!(slot_value_to_address(value), addr);
        assert_eq!(slot_value_to_address(U256::ZERO), Address::ZERO);
    }

    #[test]
    fn test_uups_requires_upgrade_method() {
        let missing = artifact("[]");
        assert!(validate_implementation(&missing, &ProxyKind::uups()).is_err());
        assert!(validate_implementation(&artifact(UUPS_ABI), &ProxyKind::uups()).is_ok());

        let allowed = ProxyKind::Uups {
            unsafe_allow: vec![UnsafeAllow::MissingPublicUpgradeTo],
        };
        assert!(validate_implementation(&missing, &allowed).is_ok());

        // Transparent & beacon proxies carry the upgrade logic themselves
        assert!(validate_implementation(&missing, &ProxyKind::transparent()).is_ok());
        assert!(validate_implementation(&missing, &ProxyKind::beacon()).is_ok());
    }

    #[test]
    fn test_constructor_requires_allowance() {
        let with_constructor = artifact(CONSTRUCTOR_ABI);
        assert!(matches!(
            validate_implementation(&with_constructor, &ProxyKind::transparent()),
            Err(ScriptError::UnsafeUpgrade(_))
        ));

        let allowed = ProxyKind::Transparent {
            initial_owner: None,
            unsafe_allow: vec![UnsafeAllow::Constructor],
        };
        assert!(validate_implementation(&with_constructor, &allowed).is_ok());
    }

    #[test]
    fn test_uups_only_allowance_rejected_elsewhere() {
        let kind = ProxyKind::Beacon {
            beacon_owner: None,
            unsafe_allow: vec![UnsafeAllow::MissingPublicUpgradeTo],
        };
        assert!(validate_implementation(&artifact("[]"), &kind).is_err());
    }

    #[test]
    fn test_bytecode_allowances_have_no_effect() {
        let unchecked = vec![
            UnsafeAllow::StateVariableImmutable,
            UnsafeAllow::ExternalLibraryLinking,
            UnsafeAllow::Delegatecall,
            UnsafeAllow::Selfdestruct,
        ];

        // They neither fail a valid implementation nor exempt an invalid one
        let kind = ProxyKind::Uups {
            unsafe_allow: unchecked.clone(),
        };
        assert!(validate_implementation(&artifact(UUPS_ABI), &kind).is_ok());
        assert!(validate_implementation(&artifact("[]"), &kind).is_err());

        let kind = ProxyKind::Transparent {
            initial_owner: None,
            unsafe_allow: unchecked,
        };
        assert!(validate_implementation(&artifact(CONSTRUCTOR_ABI), &kind).is_err());
    }
}
