//! Implementations of the various deploy scripts

use alloy::dyn_abi::DynSolValue;
use alloy_primitives::{utils::format_ether, Address};
use itertools::Itertools;
use tracing::info;
use witness_auth::WitnessSigner;

use crate::{
    artifacts::{ArtifactResolver, CompiledArtifactResolver, ContractArtifact},
    cli::{
        BalanceArgs, DeployArgs, DeploymentArgs, GlobalArgs, ImplementationArgs,
        MintWithWitnessArgs, SignWitnessArgs, UpgradeArgs,
    },
    errors::ScriptError,
    gateway::{ChainGateway, ContractHandle},
    ledger::{JsonFileLedgerStore, LedgerStore},
    orchestrator::{Deployer, DeploymentResult},
    rpc::RpcGateway,
    types::{DeployOptions, DeploymentMode, Initializer},
    utils::{coerce_args, parse_address},
    verification::{ForgeVerifier, VerificationOutcome},
};

/// The deployer assembled from command line options
pub type CliDeployer = Deployer<
    RpcGateway<CompiledArtifactResolver>,
    JsonFileLedgerStore,
    CompiledArtifactResolver,
    ForgeVerifier,
>;

// -----------
// | Deploys |
// -----------

/// Deploy a contract, directly or behind a new proxy
pub async fn deploy(args: DeployArgs, globals: &GlobalArgs) -> Result<(), ScriptError> {
    let deployer = setup_deployer(globals)?;
    let artifact = deployer.resolver().resolve(&args.deployment.contract)?;
    let constructor_args = constructor_args(&artifact, &args.deployment.args)?;

    let owner = args.owner.as_deref().map(parse_address).transpose()?;
    let mut options = deploy_options(&args.deployment, owner)?;
    if options.mode != DeploymentMode::Fresh {
        options.initializer = if args.no_init {
            Initializer::none()
        } else {
            let function = artifact.function(&args.init_fn, args.init_args.len())?;
            let init_args = coerce_args(&function.inputs, &args.init_args)?;
            Initializer::new(args.init_fn, init_args)
        };
    }

    let result = deployer
        .deploy(&args.deployment.contract, &constructor_args, &options)
        .await?;
    report(&result);

    Ok(())
}

/// Upgrade the implementation behind a recorded proxy
pub async fn upgrade(args: UpgradeArgs, globals: &GlobalArgs) -> Result<(), ScriptError> {
    let deployer = setup_deployer(globals)?;
    let artifact = deployer.resolver().resolve(&args.deployment.contract)?;
    let constructor_args = constructor_args(&artifact, &args.deployment.args)?;
    let options = deploy_options(&args.deployment, None /* owner */)?;

    let result = deployer
        .upgrade(&args.deployment.contract, &constructor_args, &options)
        .await?;
    report(&result);

    Ok(())
}

// ---------
// | Reads |
// ---------

/// Print the deployments recorded for the network
pub fn show_deployments(globals: &GlobalArgs) -> Result<(), ScriptError> {
    let store = JsonFileLedgerStore::new(&globals.deployments_dir);
    let ledger = store.load(&globals.network)?;

    if ledger.is_empty() {
        info!("No deployments recorded for {}", globals.network);
        return Ok(());
    }

    for (name, address) in &ledger {
        println!("{name}: {}", address.to_checksum(None));
    }

    Ok(())
}

/// Print the implementation currently behind a proxy
pub async fn implementation(
    args: ImplementationArgs,
    globals: &GlobalArgs,
) -> Result<(), ScriptError> {
    let gateway = setup_gateway(globals)?;
    let proxy = match (args.contract_address, args.name) {
        (Some(address), _) => parse_address(&address)?,
        (None, Some(name)) => recorded_address(globals, &name)?,
        (None, None) => {
            return Err(ScriptError::ProxyNotFound(
                "neither a proxy address nor a contract name was given".to_string(),
            ))
        }
    };

    let implementation = gateway.resolve_implementation(proxy).await?;
    println!("{}", implementation.to_checksum(None));

    Ok(())
}

/// Print an account's native balance
pub async fn balance(args: BalanceArgs, globals: &GlobalArgs) -> Result<(), ScriptError> {
    let gateway = setup_gateway(globals)?;
    let account = match args.account_address {
        Some(address) => parse_address(&address)?,
        None => gateway.default_sender(),
    };

    let balance = gateway.get_balance(account).await?;
    println!("{} ETH", format_ether(balance));

    Ok(())
}

// -----------
// | Witness |
// -----------

/// Print a witness authorization token
pub fn sign_witness(args: SignWitnessArgs) -> Result<(), ScriptError> {
    let recipient = parse_address(&args.recipient)?;
    let signature = witness_auth::sign_witness(
        recipient,
        &args.category,
        args.witness_signer_key.as_deref(),
    )?;

    println!("{signature}");
    Ok(())
}

/// Mint to each recipient in turn, authorizing every mint with a witness token
pub async fn mint_with_witness(
    args: MintWithWitnessArgs,
    globals: &GlobalArgs,
) -> Result<(), ScriptError> {
    // Fail on a missing witness key before touching the chain
    let signer = WitnessSigner::from_key(args.witness_signer_key.as_deref())?;
    let recipients = args
        .recipients
        .iter()
        .map(|recipient| parse_address(recipient))
        .collect::<Result<Vec<_>, _>>()?;

    let gateway = setup_gateway(globals)?;
    let address = match &args.contract_address {
        Some(address) => parse_address(address)?,
        None => recorded_address(globals, &args.contract)?,
    };
    let artifact = CompiledArtifactResolver::new(&globals.artifacts_dir).resolve(&args.contract)?;
    let contract = ContractHandle::new(address, artifact);

    info!(
        "Minting {} to {} recipients, authorized by {:#x}",
        args.contract,
        recipients.len(),
        signer.address()
    );
    let from = gateway.default_sender();
    for (i, recipient) in recipients.into_iter().enumerate() {
        let witness = signer.sign(recipient, &args.category)?;
        let receipt = contract
            .send(
                &gateway,
                from,
                &args.method,
                &[
                    DynSolValue::Address(recipient),
                    DynSolValue::String(args.category.clone()),
                    DynSolValue::Bytes(witness.to_bytes().to_vec()),
                ],
            )
            .await?;

        info!(
            "[{}] minted to {recipient:#x} in {:#x}",
            i + 1,
            receipt.tx_hash
        );
    }

    Ok(())
}

// -----------
// | Helpers |
// -----------

/// Connect to the network with the deployer's wallet
fn setup_gateway(
    globals: &GlobalArgs,
) -> Result<RpcGateway<CompiledArtifactResolver>, ScriptError> {
    let priv_key = globals.priv_key.as_deref().ok_or_else(|| {
        ScriptError::ClientInitialization("a private key is required, set PKEY".to_string())
    })?;

    RpcGateway::connect(
        &globals.rpc_url,
        priv_key,
        &globals.extra_keys,
        CompiledArtifactResolver::new(&globals.artifacts_dir),
    )
}

/// Assemble a deployer from the command line options
fn setup_deployer(globals: &GlobalArgs) -> Result<CliDeployer, ScriptError> {
    let gateway = setup_gateway(globals)?;
    let verifier = ForgeVerifier {
        chain: globals.verify_chain.clone(),
        etherscan_api_key: globals.etherscan_api_key.clone(),
        verifier_url: globals.verifier_url.clone(),
    };

    Ok(Deployer::new(
        &globals.network,
        gateway,
        JsonFileLedgerStore::new(&globals.deployments_dir),
        CompiledArtifactResolver::new(&globals.artifacts_dir),
        verifier,
    ))
}

/// Look up a contract's address in the network's deployments file
fn recorded_address(globals: &GlobalArgs, name: &str) -> Result<Address, ScriptError> {
    JsonFileLedgerStore::new(&globals.deployments_dir)
        .load(&globals.network)?
        .get(name)
        .ok_or_else(|| {
            ScriptError::ReadDeployments(format!(
                "no deployment of `{name}` recorded for {}",
                globals.network
            ))
        })
}

/// Coerce constructor arguments against the artifact's constructor
fn constructor_args(
    artifact: &ContractArtifact,
    raw: &[String],
) -> Result<Vec<DynSolValue>, ScriptError> {
    match artifact.abi.constructor() {
        Some(constructor) => coerce_args(&constructor.inputs, raw),
        None => coerce_args(&[], raw),
    }
}

/// Translate the shared command line options into deploy options
fn deploy_options(
    args: &DeploymentArgs,
    owner: Option<Address>,
) -> Result<DeployOptions, ScriptError> {
    let mut options = match args.proxy {
        Some(kind) => DeployOptions::proxy(kind.into_kind(owner, args.unsafe_allow.clone())),
        None => DeployOptions::fresh(),
    };

    options.silent = args.silent;
    options.no_verify = args.no_verify;
    options.signer = args.signer.as_deref().map(parse_address).transpose()?;

    Ok(options)
}

/// Log the outcome of a deploy or upgrade
fn report(result: &DeploymentResult) {
    let mut lines = vec![format!("{}: {:#x}", result.contract.name(), result.address())];
    if let Some(implementation) = result.implementation {
        lines.push(format!("implementation: {implementation:#x}"));
    }
    match &result.verification {
        VerificationOutcome::Verified { request_id } => {
            lines.push(format!("verification requested: {request_id}"))
        }
        VerificationOutcome::Skipped => lines.push("verification skipped".to_string()),
        VerificationOutcome::Failed { reason } => {
            lines.push(format!("verification failed: {reason}"))
        }
    }

    info!("{}", lines.iter().join(", "));
}
