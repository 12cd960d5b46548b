//! Orchestrates contract deployments & upgrades against a network's ledger
//!
//! Each call runs a strictly ordered sequence: resolve the artifact, check
//! proxy safety, guard the deployer's balance, submit, record the resulting
//! addresses and finally request source verification. A fatal error at any
//! step leaves the ledger as it was.

use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes};
use tracing::{debug, info, warn};

use crate::{
    artifacts::{ArtifactResolver, ContractArtifact},
    constants::DEFAULT_UPGRADE_SETTLE_DELAY,
    errors::ScriptError,
    gateway::{ChainGateway, ContractHandle},
    ledger::{validate_contract_name, Ledger, LedgerStore},
    proxy::validate_implementation,
    types::{DeployOptions, ProxyKind},
    verification::{VerificationOutcome, VerificationRequest, VerificationService},
};

/// Log deployment progress, quietly if the caller asked for silence
macro_rules! progress {
    ($silent:expr, $($arg:tt)+) => {
        if $silent {
            debug!($($arg)+);
        } else {
            info!($($arg)+);
        }
    };
}

/// Tunables for the deployer
#[derive(Clone, Debug)]
pub struct DeployerConfig {
    /// How long to wait after an upgrade before reading back the implementation
    pub settle_delay: Duration,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_UPGRADE_SETTLE_DELAY,
        }
    }
}

/// The outcome of a successful deploy or upgrade
#[derive(Clone, Debug)]
pub struct DeploymentResult {
    /// The deployed contract, bound to the proxy address for proxy deployments
    pub contract: ContractHandle,
    /// The implementation behind the proxy, for proxy deployments
    pub implementation: Option<Address>,
    /// The result of the verification step
    pub verification: VerificationOutcome,
}

impl DeploymentResult {
    /// The address callers should interact with
    pub fn address(&self) -> Address {
        self.contract.address
    }
}

/// Deploys and upgrades contracts on a single network
pub struct Deployer<G, S, R, V>
where
    G: ChainGateway,
    S: LedgerStore,
    R: ArtifactResolver,
    V: VerificationService,
{
    /// The network whose ledger is read and written
    network: String,
    /// Chain access
    gateway: G,
    /// Persistence for the network's ledger
    store: S,
    /// Locates compiled artifacts
    resolver: R,
    /// Requests source verification
    verifier: V,
    /// Deployer tunables
    config: DeployerConfig,
}

impl<G, S, R, V> Deployer<G, S, R, V>
where
    G: ChainGateway,
    S: LedgerStore,
    R: ArtifactResolver,
    V: VerificationService,
{
    /// A deployer for `network` with the default configuration
    pub fn new(network: impl Into<String>, gateway: G, store: S, resolver: R, verifier: V) -> Self {
        Self {
            network: network.into(),
            gateway,
            store,
            resolver,
            verifier,
            config: DeployerConfig::default(),
        }
    }

    /// Replace the deployer configuration
    pub fn with_config(mut self, config: DeployerConfig) -> Self {
        self.config = config;
        self
    }

    /// The network this deployer targets
    pub fn network(&self) -> &str {
        &self.network
    }

    /// The chain gateway
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The ledger store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The artifact resolver
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The verification service
    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// The current ledger for this deployer's network
    pub fn ledger(&self) -> Result<Ledger, ScriptError> {
        self.store.load(&self.network)
    }

    // -----------
    // | Deploys |
    // -----------

    /// Deploy `name`, directly or behind a new proxy, and record it in the ledger
    pub async fn deploy(
        &self,
        name: &str,
        constructor_args: &[DynSolValue],
        options: &DeployOptions,
    ) -> Result<DeploymentResult, ScriptError> {
        let silent = options.silent;
        validate_contract_name(name)?;
        let mut ledger = self.store.load(&self.network)?;
        let artifact = self.resolver.resolve(name)?;

        let kind = options.mode.proxy_kind();
        if let Some(kind) = kind {
            validate_implementation(&artifact, kind)?;
        }

        let from = options.signer.unwrap_or_else(|| self.gateway.default_sender());
        self.guard_balance(from, &artifact, constructor_args).await?;

        let (address, implementation) = match kind {
            Some(kind) => {
                progress!(silent, "Deploying {name} behind a {kind} proxy on {}", self.network);
                let proxy = self
                    .gateway
                    .deploy_proxy(from, &artifact, constructor_args, &options.initializer, kind)
                    .await?;
                let implementation = self.gateway.resolve_implementation(proxy).await?;
                (proxy, Some(implementation))
            }
            None => {
                progress!(silent, "Deploying {name} on {}", self.network);
                let address = self.gateway.deploy(from, &artifact, constructor_args).await?;
                (address, None)
            }
        };

        ledger.record_deployment(name, address, implementation)?;
        self.store.save(&self.network, &ledger)?;
        match implementation {
            Some(implementation) => progress!(
                silent,
                "{name} deployed at {address:#x}, implementation at {implementation:#x}"
            ),
            None => progress!(silent, "{name} deployed at {address:#x}"),
        }

        let verification = self
            .verify(
                &artifact,
                implementation.unwrap_or(address),
                constructor_args,
                options,
            )
            .await;

        Ok(DeploymentResult {
            contract: ContractHandle::new(address, artifact),
            implementation,
            verification,
        })
    }

    /// Deploy a new implementation of `name` and point its recorded proxy at it
    pub async fn upgrade(
        &self,
        name: &str,
        constructor_args: &[DynSolValue],
        options: &DeployOptions,
    ) -> Result<DeploymentResult, ScriptError> {
        let silent = options.silent;
        let kind = options.mode.proxy_kind().ok_or_else(|| {
            ScriptError::UpgradeRequiresUpgradableFlag(format!(
                "cannot upgrade `{name}` with a fresh deployment"
            ))
        })?;

        let mut ledger = self.store.load(&self.network)?;
        let artifact = self.resolver.resolve(name)?;
        validate_implementation(&artifact, kind)?;

        let from = options.signer.unwrap_or_else(|| self.gateway.default_sender());
        self.guard_balance(from, &artifact, constructor_args).await?;

        // A name recorded by a fresh deployment has no implementation entry
        let proxy = ledger.proxy(name).ok_or_else(|| {
            ScriptError::ProxyNotFound(format!(
                "`{name}` has no recorded proxy deployment on {}",
                self.network
            ))
        })?;

        progress!(silent, "Upgrading {name} behind {kind} proxy {proxy:#x}");
        self.gateway
            .upgrade_proxy(from, proxy, &artifact, constructor_args, kind)
            .await?;
        self.settle(kind).await;

        let implementation = self.gateway.resolve_implementation(proxy).await?;
        ledger.record_implementation(name, implementation)?;
        self.store.save(&self.network, &ledger)?;
        progress!(silent, "{name} at {proxy:#x} now points to {implementation:#x}");

        let verification = self
            .verify(&artifact, implementation, constructor_args, options)
            .await;

        Ok(DeploymentResult {
            contract: ContractHandle::new(proxy, artifact),
            implementation: Some(implementation),
            verification,
        })
    }

    // -----------
    // | Helpers |
    // -----------

    /// Fail with `InsufficientBalance` if `from` cannot cover the estimated
    /// fee of creating `artifact`
    async fn guard_balance(
        &self,
        from: Address,
        artifact: &ContractArtifact,
        constructor_args: &[DynSolValue],
    ) -> Result<(), ScriptError> {
        let required = self
            .gateway
            .estimate_fee(from, artifact, constructor_args)
            .await?;
        let available = self.gateway.get_balance(from).await?;
        debug!(
            "Deploying {} from {from:#x}: estimated fee {required}, balance {available}",
            artifact.name
        );

        if available < required {
            return Err(ScriptError::InsufficientBalance {
                required,
                available,
            });
        }

        Ok(())
    }

    /// Give the node time to reflect an upgrade before it is read back
    async fn settle(&self, kind: &ProxyKind) {
        if self.config.settle_delay.is_zero() {
            return;
        }

        debug!(
            "Waiting {:?} for the {kind} upgrade to settle",
            self.config.settle_delay
        );
        tokio::time::sleep(self.config.settle_delay).await;
    }

    /// Request verification of the code at `address`; failures are reported, never raised
    async fn verify(
        &self,
        artifact: &ContractArtifact,
        address: Address,
        constructor_args: &[DynSolValue],
        options: &DeployOptions,
    ) -> VerificationOutcome {
        if options.no_verify {
            return VerificationOutcome::Skipped;
        }

        let constructor_args_encoded = match artifact.encode_constructor_args(constructor_args) {
            Ok(encoded) => Bytes::from(encoded),
            Err(e) => return failed_verification(&artifact.name, e),
        };
        let request = VerificationRequest {
            address,
            source_ref: artifact.source_ref.clone(),
            constructor_args_encoded,
            bytecode: artifact.bytecode.clone(),
        };

        match self.verifier.request_verification(&request).await {
            Ok(request_id) => {
                progress!(
                    options.silent,
                    "Verification of {} requested: {request_id}",
                    artifact.name
                );
                VerificationOutcome::Verified { request_id }
            }
            Err(e) => failed_verification(&artifact.name, e),
        }
    }
}

/// Log a failed verification and wrap it as an outcome
fn failed_verification(name: &str, err: ScriptError) -> VerificationOutcome {
    warn!("Verification of {name} failed: {err}");
    VerificationOutcome::Failed {
        reason: err.to_string(),
    }
}
