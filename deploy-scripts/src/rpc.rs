//! A chain gateway backed by a JSON-RPC node

use alloy::{
    dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt},
    network::TransactionBuilder,
    providers::{DynProvider, Provider},
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use tracing::{debug, info};

use crate::{
    artifacts::{ArtifactResolver, ContractArtifact},
    constants::{
        BEACON_PROXY_CONTRACT, ERC1967_PROXY_CONTRACT, PROXY_ADMIN_STORAGE_SLOT,
        PROXY_BEACON_STORAGE_SLOT, PROXY_IMPLEMENTATION_STORAGE_SLOT,
        TRANSPARENT_PROXY_CONTRACT, UPGRADEABLE_BEACON_CONTRACT,
    },
    errors::ScriptError,
    gateway::{ChainGateway, TxReceipt},
    proxy::slot_value_to_address,
    solidity::{implementationCall, upgradeAndCallCall, upgradeToAndCallCall, upgradeToCall},
    types::{Initializer, ProxyKind},
    utils::{setup_client, wait_for_receipt},
};

/// A chain gateway sending transactions through an RPC node, signed by a local wallet
///
/// Proxy contracts themselves are deployed from the artifacts supplied by the
/// resolver, e.g. OpenZeppelin's `ERC1967Proxy` compiled alongside the project.
pub struct RpcGateway<R: ArtifactResolver> {
    /// The signing RPC client
    provider: DynProvider,
    /// The address of the primary wallet key
    sender: Address,
    /// Resolves the proxy contract artifacts
    resolver: R,
}

impl<R: ArtifactResolver> RpcGateway<R> {
    /// Connect to the node at `rpc_url`, signing with `priv_key` and any extra keys
    pub fn connect(
        rpc_url: &str,
        priv_key: &str,
        extra_keys: &[String],
        resolver: R,
    ) -> Result<Self, ScriptError> {
        let (provider, sender) = setup_client(priv_key, extra_keys, rpc_url)?;
        Ok(Self {
            provider,
            sender,
            resolver,
        })
    }

    /// The underlying RPC client
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// Submit a transaction and wait for it to be mined successfully
    async fn submit(&self, tx: TransactionRequest) -> Result<TransactionReceipt, ScriptError> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ChainSubmission(e.to_string()))?;
        let tx_hash = *pending.tx_hash();
        debug!("Submitted transaction {tx_hash:#x}");

        let receipt = wait_for_receipt(&self.provider, tx_hash).await?;
        if !receipt.status() {
            return Err(ScriptError::ChainSubmission(format!(
                "transaction {tx_hash:#x} reverted"
            )));
        }

        Ok(receipt)
    }

    /// Read an address stored in one of the proxy's ERC1967 slots
    async fn read_address_slot(&self, proxy: Address, slot: B256) -> Result<Address, ScriptError> {
        let value = self
            .provider
            .get_storage_at(proxy, U256::from_be_bytes(slot.0))
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        Ok(slot_value_to_address(value))
    }

    /// Read a non-empty address from one of the proxy's ERC1967 slots
    async fn require_address_slot(
        &self,
        proxy: Address,
        slot: B256,
        what: &str,
    ) -> Result<Address, ScriptError> {
        let address = self.read_address_slot(proxy, slot).await?;
        if address.is_zero() {
            return Err(ScriptError::ContractInteraction(format!(
                "{proxy:#x} has no {what} recorded, is it the expected proxy kind?"
            )));
        }

        Ok(address)
    }

    /// Send raw calldata to `to` and wait for it to be mined
    async fn send_calldata(
        &self,
        from: Address,
        to: Address,
        calldata: Vec<u8>,
    ) -> Result<TransactionReceipt, ScriptError> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(calldata);
        self.submit(tx).await
    }
}

impl From<TransactionReceipt> for TxReceipt {
    fn from(receipt: TransactionReceipt) -> Self {
        TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            contract_address: receipt.contract_address,
        }
    }
}

impl<R: ArtifactResolver> ChainGateway for RpcGateway<R> {
    fn default_sender(&self) -> Address {
        self.sender
    }

    async fn estimate_fee(
        &self,
        from: Address,
        artifact: &ContractArtifact,
        constructor_args: &[DynSolValue],
    ) -> Result<U256, ScriptError> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_deploy_code(artifact.deploy_code(constructor_args)?);

        let gas = self
            .provider
            .estimate_gas(&tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(format!("estimating gas: {e}")))?;
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| ScriptError::ContractInteraction(format!("fetching gas price: {e}")))?;

        Ok(U256::from(gas) * U256::from(gas_price))
    }

    async fn get_balance(&self, address: Address) -> Result<U256, ScriptError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    async fn deploy(
        &self,
        from: Address,
        artifact: &ContractArtifact,
        constructor_args: &[DynSolValue],
    ) -> Result<Address, ScriptError> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_deploy_code(artifact.deploy_code(constructor_args)?);

        let receipt = self.submit(tx).await?;
        let address = receipt.contract_address.ok_or_else(|| {
            ScriptError::ChainSubmission(format!(
                "no contract address in receipt {:#x}",
                receipt.transaction_hash
            ))
        })?;

        debug!("{} deployed at {address:#x}", artifact.name);
        Ok(address)
    }

    async fn deploy_proxy(
        &self,
        from: Address,
        artifact: &ContractArtifact,
        constructor_args: &[DynSolValue],
        initializer: &Initializer,
        kind: &ProxyKind,
    ) -> Result<Address, ScriptError> {
        // Build all calldata up front so that a malformed request submits nothing
        let init_data = if initializer.is_none() {
            Bytes::new()
        } else {
            artifact.encode_call(&initializer.function, &initializer.args)?
        };
        let proxy_artifact = match kind {
            ProxyKind::Uups { .. } => self.resolver.resolve(ERC1967_PROXY_CONTRACT)?,
            ProxyKind::Transparent { .. } => self.resolver.resolve(TRANSPARENT_PROXY_CONTRACT)?,
            ProxyKind::Beacon { .. } => self.resolver.resolve(BEACON_PROXY_CONTRACT)?,
        };

        let implementation = self.deploy(from, artifact, constructor_args).await?;
        info!("{} implementation deployed at {implementation:#x}", artifact.name);

        let proxy_args = match kind {
            ProxyKind::Uups { .. } => vec![
                DynSolValue::Address(implementation),
                DynSolValue::Bytes(init_data.to_vec()),
            ],
            ProxyKind::Transparent { initial_owner, .. } => vec![
                DynSolValue::Address(implementation),
                DynSolValue::Address(initial_owner.unwrap_or(from)),
                DynSolValue::Bytes(init_data.to_vec()),
            ],
            ProxyKind::Beacon { beacon_owner, .. } => {
                let beacon_artifact = self.resolver.resolve(UPGRADEABLE_BEACON_CONTRACT)?;
                let beacon_args = [
                    DynSolValue::Address(implementation),
                    DynSolValue::Address(beacon_owner.unwrap_or(from)),
                ];
                let beacon = self.deploy(from, &beacon_artifact, &beacon_args).await?;
                info!("{} beacon deployed at {beacon:#x}", artifact.name);

                vec![
                    DynSolValue::Address(beacon),
                    DynSolValue::Bytes(init_data.to_vec()),
                ]
            }
        };

        self.deploy(from, &proxy_artifact, &proxy_args).await
    }

    async fn upgrade_proxy(
        &self,
        from: Address,
        proxy: Address,
        artifact: &ContractArtifact,
        constructor_args: &[DynSolValue],
        kind: &ProxyKind,
    ) -> Result<(), ScriptError> {
        let implementation = self.deploy(from, artifact, constructor_args).await?;
        info!("{} implementation deployed at {implementation:#x}", artifact.name);

        match kind {
            ProxyKind::Uups { .. } => {
                let calldata = upgradeToAndCallCall {
                    newImplementation: implementation,
                    data: Bytes::new(),
                }
                .abi_encode();
                self.send_calldata(from, proxy, calldata).await?;
            }
            ProxyKind::Transparent { .. } => {
                // This is the recommended way to get the proxy admin address:
                // https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/ERC1967/ERC1967Utils.sol#L104-L106
                let admin = self
                    .require_address_slot(proxy, PROXY_ADMIN_STORAGE_SLOT, "admin")
                    .await?;
                let calldata = upgradeAndCallCall {
                    proxy,
                    implementation,
                    data: Bytes::new(),
                }
                .abi_encode();
                self.send_calldata(from, admin, calldata).await?;
            }
            ProxyKind::Beacon { .. } => {
                let beacon = self
                    .require_address_slot(proxy, PROXY_BEACON_STORAGE_SLOT, "beacon")
                    .await?;
                let calldata = upgradeToCall {
                    newImplementation: implementation,
                }
                .abi_encode();
                self.send_calldata(from, beacon, calldata).await?;
            }
        }

        Ok(())
    }

    async fn resolve_implementation(&self, proxy: Address) -> Result<Address, ScriptError> {
        let implementation = self
            .read_address_slot(proxy, PROXY_IMPLEMENTATION_STORAGE_SLOT)
            .await?;
        if !implementation.is_zero() {
            return Ok(implementation);
        }

        // Beacon proxies leave the implementation slot empty and defer to the beacon
        let beacon = self
            .require_address_slot(proxy, PROXY_BEACON_STORAGE_SLOT, "implementation or beacon")
            .await?;
        let tx = TransactionRequest::default()
            .with_to(beacon)
            .with_input(implementationCall {}.abi_encode());
        let output = self
            .provider
            .call(&tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        implementationCall::abi_decode_returns(&output, true)
            .map(|ret| ret._0)
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    async fn call(
        &self,
        address: Address,
        artifact: &ContractArtifact,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ScriptError> {
        let function = artifact.function(method, args.len())?;
        let calldata = function
            .abi_encode_input(args)
            .map_err(|e| ScriptError::CalldataConstruction(format!("{method}: {e}")))?;

        let tx = TransactionRequest::default()
            .with_to(address)
            .with_input(calldata);
        let output = self
            .provider
            .call(&tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        function
            .abi_decode_output(&output, true)
            .map_err(|e| ScriptError::ContractInteraction(format!("decoding {method}: {e}")))
    }

    async fn send_and_wait(
        &self,
        from: Address,
        address: Address,
        artifact: &ContractArtifact,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<TxReceipt, ScriptError> {
        let calldata = artifact.encode_call(method, args)?;
        let receipt = self.send_calldata(from, address, calldata.to_vec()).await?;
        Ok(receipt.into())
    }
}
