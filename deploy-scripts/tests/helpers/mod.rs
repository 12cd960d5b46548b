//! Mock chain, verifier & artifacts shared by the deployer tests

#![allow(dead_code)]

use std::{collections::HashMap, sync::Mutex, time::Duration};

use alloy::{dyn_abi::DynSolValue, json_abi::JsonAbi};
use alloy_primitives::{address, Address, Bytes, B256, U256};
use deploy_scripts::{
    artifacts::{ArtifactResolver, ContractArtifact},
    errors::ScriptError,
    gateway::{ChainGateway, TxReceipt},
    ledger::{InMemoryLedgerStore, Ledger, LedgerStore},
    orchestrator::{Deployer, DeployerConfig},
    types::{Initializer, ProxyKind},
    verification::{VerificationRequest, VerificationService},
};
use tokio::time::Instant;

/// The network the tests deploy to
pub const NETWORK: &str = "testnet";

/// The mock gateway's default sender
pub const DEPLOYER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// A recorded proxy in the upgrade scenarios
pub const PROXY: Address = address!("1111111111111111111111111111111111111111");

/// The implementation behind `PROXY` before an upgrade
pub const IMPLEMENTATION: Address = address!("2222222222222222222222222222222222222222");

/// A deployer over the mock chain & in-memory ledger
pub type MockDeployer = Deployer<MockGateway, InMemoryLedgerStore, StaticResolver, MockVerifier>;

// ----------------
// | Mock Gateway |
// ----------------

/// The mutable state of the mock chain
#[derive(Default)]
struct ChainState {
    /// The balance of every account
    balance: U256,
    /// The fee quoted for every deployment
    fee: U256,
    /// The number of contracts created so far
    created: u64,
    /// Proxy address to implementation address
    proxies: HashMap<Address, Address>,
    /// The number of transactions submitted
    submissions: usize,
    /// The accounts transactions were sent from
    senders: Vec<Address>,
    /// The initializers invoked through new proxies
    initializers: Vec<Initializer>,
    /// When each proxy upgrade was mined
    upgraded_at: Vec<Instant>,
    /// When each implementation read was served
    resolved_at: Vec<Instant>,
}

/// An in-memory chain that mines every transaction instantly
pub struct MockGateway {
    /// The chain state
    state: Mutex<ChainState>,
}

impl MockGateway {
    /// A chain where the deployer holds `balance` and deployments cost `fee`
    pub fn new(balance: u64, fee: u64) -> Self {
        let state = ChainState {
            balance: U256::from(balance),
            fee: U256::from(fee),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// A well funded chain
    pub fn funded() -> Self {
        Self::new(1_000_000, 1_000)
    }

    /// Register an existing proxy
    pub fn with_proxy(self, proxy: Address, implementation: Address) -> Self {
        self.state.lock().unwrap().proxies.insert(proxy, implementation);
        self
    }

    /// The number of transactions submitted so far
    pub fn submissions(&self) -> usize {
        self.state.lock().unwrap().submissions
    }

    /// The accounts transactions were sent from, in order
    pub fn senders(&self) -> Vec<Address> {
        self.state.lock().unwrap().senders.clone()
    }

    /// The initializers invoked through new proxies, in order
    pub fn initializers(&self) -> Vec<Initializer> {
        self.state.lock().unwrap().initializers.clone()
    }

    /// When each proxy upgrade was mined, in order
    pub fn upgraded_at(&self) -> Vec<Instant> {
        self.state.lock().unwrap().upgraded_at.clone()
    }

    /// When each implementation read was served, in order
    pub fn resolved_at(&self) -> Vec<Instant> {
        self.state.lock().unwrap().resolved_at.clone()
    }

    /// The implementation the chain holds for `proxy`
    pub fn implementation_of(&self, proxy: Address) -> Option<Address> {
        self.state.lock().unwrap().proxies.get(&proxy).copied()
    }

    /// Mine a contract creation, returning the new address
    fn create(&self, from: Address) -> Address {
        let mut state = self.state.lock().unwrap();
        state.created += 1;
        state.submissions += 1;
        state.senders.push(from);

        let mut bytes = [0u8; 20];
        bytes[0] = 0xc0;
        bytes[12..].copy_from_slice(&state.created.to_be_bytes());
        Address::from(bytes)
    }
}

impl ChainGateway for MockGateway {
    fn default_sender(&self) -> Address {
        DEPLOYER
    }

    async fn estimate_fee(
        &self,
        _from: Address,
        _artifact: &ContractArtifact,
        _constructor_args: &[DynSolValue],
    ) -> Result<U256, ScriptError> {
        Ok(self.state.lock().unwrap().fee)
    }

    async fn get_balance(&self, _address: Address) -> Result<U256, ScriptError> {
        Ok(self.state.lock().unwrap().balance)
    }

    async fn deploy(
        &self,
        from: Address,
        artifact: &ContractArtifact,
        constructor_args: &[DynSolValue],
    ) -> Result<Address, ScriptError> {
        artifact.deploy_code(constructor_args)?;
        Ok(self.create(from))
    }

    async fn deploy_proxy(
        &self,
        from: Address,
        artifact: &ContractArtifact,
        constructor_args: &[DynSolValue],
        initializer: &Initializer,
        _kind: &ProxyKind,
    ) -> Result<Address, ScriptError> {
        if !initializer.is_none() {
            artifact.encode_call(&initializer.function, &initializer.args)?;
        }

        let implementation = self.deploy(from, artifact, constructor_args).await?;
        let proxy = self.create(from);

        let mut state = self.state.lock().unwrap();
        state.proxies.insert(proxy, implementation);
        state.initializers.push(initializer.clone());
        Ok(proxy)
    }

    async fn upgrade_proxy(
        &self,
        from: Address,
        proxy: Address,
        artifact: &ContractArtifact,
        constructor_args: &[DynSolValue],
        _kind: &ProxyKind,
    ) -> Result<(), ScriptError> {
        if self.implementation_of(proxy).is_none() {
            return Err(ScriptError::ChainSubmission(format!("{proxy:#x} is not a proxy")));
        }

        let implementation = self.deploy(from, artifact, constructor_args).await?;
        let mut state = self.state.lock().unwrap();
        state.submissions += 1;
        state.proxies.insert(proxy, implementation);
        state.upgraded_at.push(Instant::now());
        Ok(())
    }

    async fn resolve_implementation(&self, proxy: Address) -> Result<Address, ScriptError> {
        self.state.lock().unwrap().resolved_at.push(Instant::now());
        self.implementation_of(proxy).ok_or_else(|| {
            ScriptError::ContractInteraction(format!("{proxy:#x} has no implementation"))
        })
    }

    async fn call(
        &self,
        _address: Address,
        artifact: &ContractArtifact,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ScriptError> {
        artifact.encode_call(method, args)?;
        Ok(Vec::new())
    }

    async fn send_and_wait(
        &self,
        from: Address,
        _address: Address,
        artifact: &ContractArtifact,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<TxReceipt, ScriptError> {
        artifact.encode_call(method, args)?;

        let mut state = self.state.lock().unwrap();
        state.submissions += 1;
        state.senders.push(from);
        Ok(TxReceipt {
            tx_hash: B256::with_last_byte(state.submissions as u8),
            block_number: Some(state.submissions as u64),
            gas_used: 21_000,
            contract_address: None,
        })
    }
}

// -----------------
// | Mock Verifier |
// -----------------

/// A verifier that either accepts or rejects every request
pub struct MockVerifier {
    /// Whether requests are rejected
    fail: bool,
    /// The requests received
    requests: Mutex<Vec<VerificationRequest>>,
}

impl MockVerifier {
    /// A verifier accepting every request
    pub fn accepting() -> Self {
        Self {
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A verifier rejecting every request
    pub fn rejecting() -> Self {
        Self {
            fail: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// The requests received, in order
    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl VerificationService for MockVerifier {
    async fn request_verification(
        &self,
        request: &VerificationRequest,
    ) -> Result<String, ScriptError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(ScriptError::Verification("explorer unavailable".to_string()));
        }

        Ok(format!("guid-{:#x}", request.address))
    }
}

// -------------
// | Artifacts |
// -------------

/// Resolves artifacts from a fixed set
#[derive(Default)]
pub struct StaticResolver {
    /// Contract name to artifact
    artifacts: HashMap<String, ContractArtifact>,
}

impl StaticResolver {
    /// A resolver over the standard test contracts
    pub fn standard() -> Self {
        let mut artifacts = HashMap::new();
        for artifact in [token_artifact(), counter_artifact(), plain_artifact()] {
            artifacts.insert(artifact.name.clone(), artifact);
        }
        Self { artifacts }
    }
}

impl ArtifactResolver for StaticResolver {
    fn resolve(&self, name: &str) -> Result<ContractArtifact, ScriptError> {
        self.artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::ArtifactNotFound(name.to_string()))
    }
}

/// Build an artifact from a JSON ABI
fn artifact(name: &str, abi: &str) -> ContractArtifact {
    ContractArtifact {
        name: name.to_string(),
        abi: serde_json::from_str::<JsonAbi>(abi).unwrap(),
        bytecode: Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52]),
        source_ref: format!("src/{name}.sol:{name}"),
    }
}

/// A UUPS-upgradable token with an `initialize(address)` initializer & a witness mint
pub fn token_artifact() -> ContractArtifact {
    artifact(
        "Token",
        r#"[
            {"type":"function","name":"initialize","inputs":[{"name":"owner","type":"address"}],"outputs":[],"stateMutability":"nonpayable"},
            {"type":"function","name":"upgradeToAndCall","inputs":[{"name":"newImplementation","type":"address"},{"name":"data","type":"bytes"}],"outputs":[],"stateMutability":"payable"},
            {"type":"function","name":"mint","inputs":[{"name":"recipient","type":"address"},{"name":"category","type":"string"},{"name":"witness","type":"bytes"}],"outputs":[],"stateMutability":"nonpayable"}
        ]"#,
    )
}

/// A non-upgradable contract with a `constructor(uint256)`
pub fn counter_artifact() -> ContractArtifact {
    artifact(
        "Counter",
        r#"[
            {"type":"constructor","inputs":[{"name":"start","type":"uint256"}],"stateMutability":"nonpayable"},
            {"type":"function","name":"count","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"}
        ]"#,
    )
}

/// A contract with neither a constructor nor an upgrade method
pub fn plain_artifact() -> ContractArtifact {
    artifact("Plain", "[]")
}

// ---------
// | Setup |
// ---------

/// A deployer with no settle delay over the given chain, ledger & verifier
pub fn deployer(
    gateway: MockGateway,
    store: InMemoryLedgerStore,
    verifier: MockVerifier,
) -> MockDeployer {
    Deployer::new(NETWORK, gateway, store, StaticResolver::standard(), verifier).with_config(
        DeployerConfig {
            settle_delay: Duration::ZERO,
        },
    )
}

/// An in-memory store holding `ledger` for the test network
pub fn store_with(ledger: &Ledger) -> InMemoryLedgerStore {
    let store = InMemoryLedgerStore::new();
    store.save(NETWORK, ledger).unwrap();
    store
}

/// The ledger of the upgrade scenarios, `Token` behind `PROXY`
pub fn proxied_token_ledger() -> Ledger {
    let mut ledger = Ledger::new();
    ledger
        .record_deployment("Token", PROXY, Some(IMPLEMENTATION))
        .unwrap();
    ledger
}
