//! Definitions of errors that can occur during contract deployment & management

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use alloy_primitives::{utils::format_ether, U256};
use witness_auth::errors::WitnessError;

/// Errors that can occur during contract deployment & management
#[derive(Debug)]
pub enum ScriptError {
    /// No compiled artifact exists for the requested contract
    ArtifactNotFound(String),
    /// A compiled artifact exists but could not be read or parsed
    ArtifactParsing(String),
    /// The deployer cannot cover the estimated deployment fee
    InsufficientBalance {
        /// The estimated fee, in wei
        required: U256,
        /// The deployer's balance, in wei
        available: U256,
    },
    /// An upgrade was requested without selecting a proxy deployment mode
    UpgradeRequiresUpgradableFlag(String),
    /// An upgrade targeted a contract with no recorded proxy
    ProxyNotFound(String),
    /// An implementation failed a proxy safety check it was not exempted from
    UnsafeUpgrade(String),
    /// A transaction was rejected or reverted on-chain
    ChainSubmission(String),
    /// Error reading state from the chain
    ContractInteraction(String),
    /// Error constructing calldata for a contract method
    CalldataConstruction(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error reading the deployments ledger
    ReadDeployments(String),
    /// Error writing the deployments ledger
    WriteDeployments(String),
    /// A network name that cannot key a ledger
    InvalidNetwork(String),
    /// A contract name that collides with the ledger's implementation keys
    InvalidContractName(String),
    /// Error requesting source verification for a deployed contract
    Verification(String),
    /// Error producing a witness authorization token
    Witness(WitnessError),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ArtifactNotFound(s) => write!(f, "missing artifact: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::InsufficientBalance {
                required,
                available,
            } => write!(
                f,
                "insufficient funds: deployment requires {} ETH but only {} ETH is available",
                format_ether(*required),
                format_ether(*available)
            ),
            ScriptError::UpgradeRequiresUpgradableFlag(s) => {
                write!(f, "upgrade requires a proxy deployment mode: {}", s)
            }
            ScriptError::ProxyNotFound(s) => write!(f, "unknown proxy: {}", s),
            ScriptError::UnsafeUpgrade(s) => write!(f, "unsafe implementation: {}", s),
            ScriptError::ChainSubmission(s) => write!(f, "transaction failed: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            ScriptError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
            ScriptError::InvalidNetwork(s) => write!(f, "invalid network name: {}", s),
            ScriptError::InvalidContractName(s) => write!(f, "invalid contract name: {}", s),
            ScriptError::Verification(s) => write!(f, "error verifying contract: {}", s),
            ScriptError::Witness(e) => write!(f, "witness error: {}", e),
        }
    }
}

impl Error for ScriptError {}

impl From<WitnessError> for ScriptError {
    fn from(e: WitnessError) -> Self {
        ScriptError::Witness(e)
    }
}
