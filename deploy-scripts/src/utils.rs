//! Utilities for the deploy scripts.

use std::str::FromStr;

use alloy::{
    dyn_abi::{DynSolValue, Specifier},
    json_abi::Param,
    network::EthereumWallet,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
};
use alloy_primitives::{Address, TxHash};
use tracing::debug;

use crate::{
    constants::{RECEIPT_POLL_ATTEMPTS, RECEIPT_POLL_INTERVAL},
    errors::ScriptError,
};

/// Sets up the RPC client, signing with the given private key and any
/// additional keys, returning the client and the address of the primary key
pub fn setup_client(
    priv_key: &str,
    extra_keys: &[String],
    rpc_url: &str,
) -> Result<(DynProvider, Address), ScriptError> {
    let signer = PrivateKeySigner::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let sender = signer.address();

    let mut wallet = EthereumWallet::from(signer);
    for key in extra_keys {
        let extra = PrivateKeySigner::from_str(key)
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        wallet.register_signer(extra);
    }

    let url = rpc_url
        .parse()
        .map_err(|e| ScriptError::ClientInitialization(format!("bad RPC url {rpc_url}: {e}")))?;
    let provider = ProviderBuilder::new().wallet(wallet).on_http(url);

    Ok((DynProvider::new(provider), sender))
}

/// Wait for a submitted transaction to be mined, polling for its receipt
pub async fn wait_for_receipt(
    provider: &DynProvider,
    tx_hash: TxHash,
) -> Result<TransactionReceipt, ScriptError> {
    let mut remaining_attempts = RECEIPT_POLL_ATTEMPTS;
    while remaining_attempts > 0 {
        match provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| ScriptError::ChainSubmission(e.to_string()))?
        {
            Some(receipt) => return Ok(receipt),
            None => {
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
                remaining_attempts -= 1;
            }
        }
    }

    Err(ScriptError::ChainSubmission(format!(
        "no receipt for {tx_hash:#x} after {RECEIPT_POLL_ATTEMPTS} attempts"
    )))
}

/// Parse a hex address given on the command line or in the environment
pub fn parse_address(address: &str) -> Result<Address, ScriptError> {
    Address::from_str(address.trim())
        .map_err(|e| ScriptError::CalldataConstruction(format!("bad address {address}: {e}")))
}

/// Coerce string arguments into ABI values according to the given parameters
pub fn coerce_args(params: &[Param], raw: &[String]) -> Result<Vec<DynSolValue>, ScriptError> {
    if params.len() != raw.len() {
        return Err(ScriptError::CalldataConstruction(format!(
            "expected {} arguments, got {}",
            params.len(),
            raw.len()
        )));
    }

    params
        .iter()
        .zip(raw)
        .map(|(param, value)| {
            let ty = param
                .resolve()
                .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
            debug!("Coercing `{value}` to {} {}", param.ty, param.name);
            ty.coerce_str(value).map_err(|e| {
                ScriptError::CalldataConstruction(format!("argument `{}`: {e}", param.name))
            })
        })
        .collect()
}
