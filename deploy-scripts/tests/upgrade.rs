//! Tests of proxy upgrades

mod helpers;

use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use deploy_scripts::{
    errors::ScriptError,
    ledger::{implementation_key, InMemoryLedgerStore, Ledger},
    orchestrator::DeployerConfig,
    types::{DeployOptions, Initializer, ProxyKind},
    verification::VerificationOutcome,
};
use eyre::Result;
use helpers::{
    deployer, proxied_token_ledger, store_with, token_artifact, MockGateway, MockVerifier,
    DEPLOYER, IMPLEMENTATION, PROXY,
};

#[tokio::test]
async fn test_upgrade_rewires_recorded_proxy() -> Result<()> {
    let deployer = deployer(
        MockGateway::funded().with_proxy(PROXY, IMPLEMENTATION),
        store_with(&proxied_token_ledger()),
        MockVerifier::accepting(),
    );

    let result = deployer
        .upgrade("Token", &[], &DeployOptions::proxy(ProxyKind::uups()))
        .await?;
    let new_implementation = result.implementation.expect("upgrades report the implementation");

    // The proxy address is unchanged, only the implementation moves
    assert_eq!(result.address(), PROXY);
    assert_ne!(new_implementation, IMPLEMENTATION);
    assert_eq!(
        deployer.gateway().implementation_of(PROXY),
        Some(new_implementation)
    );

    let ledger = deployer.ledger()?;
    assert_eq!(ledger.get("Token"), Some(PROXY));
    assert_eq!(ledger.implementation("Token"), Some(new_implementation));
    assert_eq!(ledger.len(), 2);

    // The new implementation is verified
    let requests = deployer.verifier().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].address, new_implementation);
    assert!(result.verification.is_verified());

    // No initializer is run on upgrade
    assert!(deployer.gateway().initializers().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_upgrade_after_proxy_deploy() -> Result<()> {
    let deployer = deployer(
        MockGateway::funded(),
        InMemoryLedgerStore::new(),
        MockVerifier::accepting(),
    );
    let options = DeployOptions::proxy(ProxyKind::transparent()).without_verification();

    let initializer = Initializer::new("initialize", vec![DynSolValue::Address(DEPLOYER)]);

    let deployed = deployer
        .deploy("Token", &[], &options.clone().with_initializer(initializer))
        .await?;
    let upgraded = deployer.upgrade("Token", &[], &options).await?;

    assert_eq!(upgraded.address(), deployed.address());
    assert_ne!(upgraded.implementation, deployed.implementation);
    assert_eq!(
        deployer.ledger()?.implementation("Token"),
        upgraded.implementation
    );
    assert_eq!(upgraded.verification, VerificationOutcome::Skipped);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_upgrade_waits_before_reading_implementation() -> Result<()> {
    let settle_delay = Duration::from_secs(5);
    let deployer = deployer(
        MockGateway::funded().with_proxy(PROXY, IMPLEMENTATION),
        store_with(&proxied_token_ledger()),
        MockVerifier::accepting(),
    )
    .with_config(DeployerConfig { settle_delay });

    let result = deployer
        .upgrade("Token", &[], &DeployOptions::proxy(ProxyKind::uups()))
        .await?;

    let upgraded_at = deployer.gateway().upgraded_at();
    let resolved_at = deployer.gateway().resolved_at();
    assert_eq!(upgraded_at.len(), 1);
    assert_eq!(resolved_at.len(), 1);
    assert!(resolved_at[0] >= upgraded_at[0] + settle_delay);

    // The value read after the wait is the one recorded
    assert_eq!(
        deployer.ledger()?.implementation("Token"),
        result.implementation
    );

    Ok(())
}

#[tokio::test]
async fn test_upgrade_of_fresh_deployment() -> Result<()> {
    let deployer = deployer(
        MockGateway::funded(),
        InMemoryLedgerStore::new(),
        MockVerifier::accepting(),
    );
    deployer
        .deploy("Token", &[], &DeployOptions::fresh().without_verification())
        .await?;
    let before = deployer.ledger()?;
    let submissions = deployer.gateway().submissions();

    // `Token` is recorded, but not as a proxy
    let err = deployer
        .upgrade("Token", &[], &DeployOptions::proxy(ProxyKind::uups()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::ProxyNotFound(_)));

    assert_eq!(deployer.ledger()?, before);
    assert_eq!(deployer.gateway().submissions(), submissions);
    assert!(deployer.gateway().upgraded_at().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_upgrade_unknown_proxy() -> Result<()> {
    let mut ledger = Ledger::new();
    ledger.record_deployment("Other", PROXY, None)?;
    let deployer = deployer(
        MockGateway::funded(),
        store_with(&ledger),
        MockVerifier::accepting(),
    );

    let err = deployer
        .upgrade("Token", &[], &DeployOptions::proxy(ProxyKind::uups()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::ProxyNotFound(_)));

    assert_eq!(deployer.ledger()?, ledger);
    assert_eq!(deployer.gateway().submissions(), 0);

    Ok(())
}

#[tokio::test]
async fn test_upgrade_requires_proxy_mode() -> Result<()> {
    let deployer = deployer(
        MockGateway::funded().with_proxy(PROXY, IMPLEMENTATION),
        store_with(&proxied_token_ledger()),
        MockVerifier::accepting(),
    );

    let err = deployer
        .upgrade("Token", &[], &DeployOptions::fresh())
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::UpgradeRequiresUpgradableFlag(_)));

    assert_eq!(deployer.ledger()?, proxied_token_ledger());
    assert_eq!(deployer.gateway().submissions(), 0);

    Ok(())
}

#[tokio::test]
async fn test_upgrade_insufficient_balance() -> Result<()> {
    let deployer = deployer(
        MockGateway::new(10, 1_000).with_proxy(PROXY, IMPLEMENTATION),
        store_with(&proxied_token_ledger()),
        MockVerifier::accepting(),
    );

    let err = deployer
        .upgrade("Token", &[], &DeployOptions::proxy(ProxyKind::uups()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::InsufficientBalance { .. }));

    assert_eq!(
        deployer.ledger()?.get(&implementation_key("Token")),
        Some(IMPLEMENTATION)
    );
    assert_eq!(deployer.gateway().implementation_of(PROXY), Some(IMPLEMENTATION));

    Ok(())
}

#[tokio::test]
async fn test_upgrade_verification_failure_is_not_fatal() -> Result<()> {
    let deployer = deployer(
        MockGateway::funded().with_proxy(PROXY, IMPLEMENTATION),
        store_with(&proxied_token_ledger()),
        MockVerifier::rejecting(),
    );

    let result = deployer
        .upgrade("Token", &[], &DeployOptions::proxy(ProxyKind::uups()))
        .await?;
    match &result.verification {
        VerificationOutcome::Failed { reason } => assert!(reason.contains("explorer unavailable")),
        other => panic!("expected a failed verification, got {other:?}"),
    }
    assert_eq!(
        deployer.ledger()?.implementation("Token"),
        result.implementation
    );

    Ok(())
}

#[tokio::test]
async fn test_contract_handle_delegates_to_gateway() -> Result<()> {
    let deployer = deployer(
        MockGateway::funded().with_proxy(PROXY, IMPLEMENTATION),
        store_with(&proxied_token_ledger()),
        MockVerifier::accepting(),
    );
    let result = deployer
        .upgrade(
            "Token",
            &[],
            &DeployOptions::proxy(ProxyKind::uups()).without_verification(),
        )
        .await?;
    assert_eq!(result.contract.artifact, token_artifact());

    let before = deployer.gateway().submissions();
    let receipt = result
        .contract
        .send(
            deployer.gateway(),
            DEPLOYER,
            "mint",
            &[
                DynSolValue::Address(DEPLOYER),
                DynSolValue::String("CAMPAIGN-1".to_string()),
                DynSolValue::Bytes(vec![0u8; 65]),
            ],
        )
        .await?;
    assert_eq!(deployer.gateway().submissions(), before + 1);
    assert!(receipt.block_number.is_some());

    // Unknown methods fail before anything is sent
    let err = result
        .contract
        .call(deployer.gateway(), "burn", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::CalldataConstruction(_)));

    Ok(())
}
