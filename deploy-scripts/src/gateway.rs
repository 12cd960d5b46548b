//! The chain gateway: the capability to read chain state and to submit
//! transactions on behalf of a wallet
//!
//! Every submitting method blocks until its transaction is mined, so callers
//! sequence dependent transactions simply by awaiting them in order.

use alloy::dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256, U256};

use crate::{
    artifacts::ContractArtifact,
    errors::ScriptError,
    types::{Initializer, ProxyKind},
};

/// The outcome of a mined transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    /// The transaction hash
    pub tx_hash: B256,
    /// The block the transaction was mined in
    pub block_number: Option<u64>,
    /// The gas consumed by the transaction
    pub gas_used: u64,
    /// The address of the contract created by the transaction, if any
    pub contract_address: Option<Address>,
}

/// Chain access used by the deployment orchestrator
///
/// Submitting methods return only once the transaction is mined, and fail with
/// [`ScriptError::ChainSubmission`] if it was rejected or reverted.
#[allow(async_fn_in_trait)]
pub trait ChainGateway {
    /// The account transactions are sent from unless another is requested
    fn default_sender(&self) -> Address;

    /// Estimate the fee, in wei, of creating `artifact` with the given constructor arguments
    async fn estimate_fee(
        &self,
        from: Address,
        artifact: &ContractArtifact,
        constructor_args: &[DynSolValue],
    ) -> Result<U256, ScriptError>;

    /// The native balance of `address`, in wei
    async fn get_balance(&self, address: Address) -> Result<U256, ScriptError>;

    /// Create `artifact` directly, returning the deployed address
    async fn deploy(
        &self,
        from: Address,
        artifact: &ContractArtifact,
        constructor_args: &[DynSolValue],
    ) -> Result<Address, ScriptError>;

    /// Create `artifact` behind a new proxy of the given kind, returning the proxy address
    ///
    /// The initializer is invoked exactly once, through the proxy constructor.
    async fn deploy_proxy(
        &self,
        from: Address,
        artifact: &ContractArtifact,
        constructor_args: &[DynSolValue],
        initializer: &Initializer,
        kind: &ProxyKind,
    ) -> Result<Address, ScriptError>;

    /// Create a new implementation from `artifact` and point `proxy` at it
    async fn upgrade_proxy(
        &self,
        from: Address,
        proxy: Address,
        artifact: &ContractArtifact,
        constructor_args: &[DynSolValue],
        kind: &ProxyKind,
    ) -> Result<(), ScriptError>;

    /// Read the implementation currently behind `proxy` from its ERC1967 storage slots
    async fn resolve_implementation(&self, proxy: Address) -> Result<Address, ScriptError>;

    /// Call a view method
    async fn call(
        &self,
        address: Address,
        artifact: &ContractArtifact,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ScriptError>;

    /// Send a state-changing method call and wait for it to be mined
    async fn send_and_wait(
        &self,
        from: Address,
        address: Address,
        artifact: &ContractArtifact,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<TxReceipt, ScriptError>;
}

/// A deployed contract, bound to its live address
///
/// For proxy deployments the address is the proxy's and the ABI the implementation's.
#[derive(Clone, Debug, PartialEq)]
pub struct ContractHandle {
    /// The deployed address
    pub address: Address,
    /// The artifact the contract was deployed from
    pub artifact: ContractArtifact,
}

impl ContractHandle {
    /// Bind an artifact to a deployed address
    pub fn new(address: Address, artifact: ContractArtifact) -> Self {
        Self { address, artifact }
    }

    /// The contract name
    pub fn name(&self) -> &str {
        &self.artifact.name
    }

    /// Call a view method on the contract
    pub async fn call<G: ChainGateway>(
        &self,
        gateway: &G,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ScriptError> {
        gateway.call(self.address, &self.artifact, method, args).await
    }

    /// Send a state-changing method call to the contract and wait for it to be mined
    pub async fn send<G: ChainGateway>(
        &self,
        gateway: &G,
        from: Address,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<TxReceipt, ScriptError> {
        gateway
            .send_and_wait(from, self.address, &self.artifact, method, args)
            .await
    }
}
