//! Definitions of CLI arguments and commands for deploy scripts

use std::fmt::{self, Display};

use alloy_primitives::Address;
use clap::{Args, Parser, Subcommand, ValueEnum};
use witness_auth::constants::WITNESS_SIGNER_KEY_ENV_VAR;

use crate::{
    commands::{
        balance, deploy, implementation, mint_with_witness, show_deployments, sign_witness,
        upgrade,
    },
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_DEPLOYMENTS_DIR, DEFAULT_INITIALIZER, DEFAULT_MINT_METHOD,
        DEFAULT_NETWORK, DEFAULT_RPC_URL,
    },
    errors::ScriptError,
    types::{ProxyKind, UnsafeAllow},
};

/// Deploy, upgrade & operate contracts on an EVM network
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Options shared by all commands
    #[command(flatten)]
    pub globals: GlobalArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by all commands
#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// Private key of the deployer
    #[arg(short, long = "pkey", env = "PKEY", hide_env_values = true, global = true)]
    pub priv_key: Option<String>,

    /// Additional private keys the wallet can send from, see `--signer`
    #[arg(long = "extra-key", global = true, hide_env_values = true)]
    pub extra_keys: Vec<String>,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = DEFAULT_RPC_URL, global = true)]
    pub rpc_url: String,

    /// The network name, keying the deployments file
    #[arg(short, long, env = "NETWORK", default_value = DEFAULT_NETWORK, global = true)]
    pub network: String,

    /// Directory holding the per-network deployments files
    #[arg(long, env = "DEPLOYMENTS_DIR", default_value = DEFAULT_DEPLOYMENTS_DIR, global = true)]
    pub deployments_dir: String,

    /// Directory holding the compiled contract artifacts
    #[arg(long, env = "ARTIFACTS_DIR", default_value = DEFAULT_ARTIFACTS_DIR, global = true)]
    pub artifacts_dir: String,

    /// Block explorer API key used for source verification
    #[arg(long, env = "ETHERSCAN_API_KEY", hide_env_values = true, global = true)]
    pub etherscan_api_key: Option<String>,

    /// The chain name or id passed to the verifier
    #[arg(long, global = true)]
    pub verify_chain: Option<String>,

    /// A custom block explorer API URL
    #[arg(long, global = true)]
    pub verifier_url: Option<String>,
}

/// The available commands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy a contract, directly or behind a new proxy
    Deploy(DeployArgs),
    /// Upgrade the implementation behind a recorded proxy
    Upgrade(UpgradeArgs),
    /// Print the deployments recorded for the network
    ShowDeployments,
    /// Read the live implementation behind a proxy
    Implementation(ImplementationArgs),
    /// Print an account's native balance
    Balance(BalanceArgs),
    /// Print a witness authorization token
    SignWitness(SignWitnessArgs),
    /// Mint to a list of recipients, authorizing each with a witness token
    MintWithWitness(MintWithWitnessArgs),
}

impl Command {
    /// Run the command
    pub async fn run(self, globals: GlobalArgs) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy(args, &globals).await,
            Command::Upgrade(args) => upgrade(args, &globals).await,
            Command::ShowDeployments => show_deployments(&globals),
            Command::Implementation(args) => implementation(args, &globals).await,
            Command::Balance(args) => balance(args, &globals).await,
            Command::SignWitness(args) => sign_witness(args),
            Command::MintWithWitness(args) => mint_with_witness(args, &globals).await,
        }
    }
}

/// The proxy patterns selectable on the command line
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProxyKindArg {
    /// An ERC1967 proxy upgraded through the implementation
    Uups,
    /// A transparent proxy upgraded through its `ProxyAdmin`
    Transparent,
    /// A beacon proxy upgraded through its `UpgradeableBeacon`
    Beacon,
}

impl ProxyKindArg {
    /// Build the proxy kind, with its owner where the pattern has one
    pub fn into_kind(self, owner: Option<Address>, unsafe_allow: Vec<UnsafeAllow>) -> ProxyKind {
        match self {
            ProxyKindArg::Uups => ProxyKind::Uups { unsafe_allow },
            ProxyKindArg::Transparent => ProxyKind::Transparent {
                initial_owner: owner,
                unsafe_allow,
            },
            ProxyKindArg::Beacon => ProxyKind::Beacon {
                beacon_owner: owner,
                unsafe_allow,
            },
        }
    }
}

impl Display for ProxyKindArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyKindArg::Uups => write!(f, "uups"),
            ProxyKindArg::Transparent => write!(f, "transparent"),
            ProxyKindArg::Beacon => write!(f, "beacon"),
        }
    }
}

/// Options common to deploys & upgrades
#[derive(Args, Clone, Debug)]
pub struct DeploymentArgs {
    /// The contract name, as it appears in the artifacts & the deployments file
    pub contract: String,

    /// Constructor arguments, coerced against the contract ABI
    #[arg(long = "arg")]
    pub args: Vec<String>,

    /// Deploy behind, or upgrade, a proxy of this kind
    #[arg(long)]
    pub proxy: Option<ProxyKindArg>,

    /// Proxy safety checks to skip, comma separated
    #[arg(long, value_delimiter = ',')]
    pub unsafe_allow: Vec<UnsafeAllow>,

    /// Send from this wallet address rather than the `--pkey` account
    #[arg(long)]
    pub signer: Option<String>,

    /// Skip source verification
    #[arg(long)]
    pub no_verify: bool,

    /// Log progress at debug level only
    #[arg(long)]
    pub silent: bool,
}

/// Deploy a contract.
///
/// With `--proxy` the contract is deployed as an implementation behind a new
/// proxy, initialized once through the proxy constructor, and both addresses
/// are recorded.
#[derive(Args)]
pub struct DeployArgs {
    /// Options common to deploys & upgrades
    #[command(flatten)]
    pub deployment: DeploymentArgs,

    /// The initializer invoked through a new proxy
    #[arg(long, default_value = DEFAULT_INITIALIZER)]
    pub init_fn: String,

    /// Initializer arguments, coerced against the contract ABI
    #[arg(long = "init-arg")]
    pub init_args: Vec<String>,

    /// Skip the initializer call
    #[arg(long, conflicts_with_all = ["init_fn", "init_args"])]
    pub no_init: bool,

    /// Owner of the `ProxyAdmin` or `UpgradeableBeacon`, defaulting to the deployer
    #[arg(long)]
    pub owner: Option<String>,
}

/// Upgrade a recorded proxy to a newly deployed implementation
#[derive(Args)]
pub struct UpgradeArgs {
    /// Options common to deploys & upgrades
    #[command(flatten)]
    pub deployment: DeploymentArgs,
}

/// Read the implementation behind a proxy
///
/// Exactly one of the proxy address or the contract name must be given.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct ImplementationArgs {
    /// The proxy address
    #[arg(long, env = "CONTRACT_ADDRESS")]
    pub contract_address: Option<String>,

    /// The contract name to look up in the deployments file
    #[arg(long)]
    pub name: Option<String>,
}

/// Print a native balance
#[derive(Args)]
pub struct BalanceArgs {
    /// The account, defaulting to the deployer
    #[arg(long, env = "ACCOUNT_ADDRESS")]
    pub account_address: Option<String>,
}

/// Print a witness authorization token
#[derive(Args)]
pub struct SignWitnessArgs {
    /// The address being authorized
    #[arg(long)]
    pub recipient: String,

    /// The category the authorization is bound to
    #[arg(long)]
    pub category: String,

    /// The witness signer's private key
    #[arg(long, env = WITNESS_SIGNER_KEY_ENV_VAR, hide_env_values = true)]
    pub witness_signer_key: Option<String>,
}

/// Mint to each recipient in turn, waiting for every mint to be mined
#[derive(Args)]
pub struct MintWithWitnessArgs {
    /// The contract name, used for its ABI and, absent an address, its deployment
    pub contract: String,

    /// The contract address, overriding the deployments file
    #[arg(long, env = "CONTRACT_ADDRESS")]
    pub contract_address: Option<String>,

    /// The recipients to mint to, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    pub recipients: Vec<String>,

    /// The category every mint is authorized for
    #[arg(long)]
    pub category: String,

    /// The mint method, taking `(address recipient, string category, bytes witness)`
    #[arg(long, default_value = DEFAULT_MINT_METHOD)]
    pub method: String,

    /// The witness signer's private key
    #[arg(long, env = WITNESS_SIGNER_KEY_ENV_VAR, hide_env_values = true)]
    pub witness_signer_key: Option<String>,
}
