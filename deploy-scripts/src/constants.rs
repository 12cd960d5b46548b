//! Constants used in the deploy scripts

use std::time::Duration;

use alloy_primitives::{b256, B256};

/// The storage slot containing the implementation address in an ERC1967 proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const PROXY_IMPLEMENTATION_STORAGE_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// The storage slot containing the proxy admin contract address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// The storage slot containing the beacon address in a beacon proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#beacon-contract-address
pub const PROXY_BEACON_STORAGE_SLOT: B256 =
    b256!("a3f0ad74e5423aebfd80d3ef4346578335a9a72aeaee59ff6cb3582b35133d50");

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The suffix appended to a contract name to key its implementation address
/// in the deployments ledger
pub const IMPLEMENTATION_KEY_SUFFIX: &str = "_Implementation";

/// The prefix of a per-network deployments file name
pub const DEPLOYMENTS_FILE_PREFIX: &str = "deployments";

/// The extension of a deployments file
pub const DEPLOYMENTS_FILE_EXTENSION: &str = "json";

/// The default directory holding the deployments files
pub const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";

/// The default directory holding compiled contract artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "out";

/// The extension of a compiled contract artifact
pub const ARTIFACT_EXTENSION: &str = "json";

/// The extension of a Solidity source file
pub const SOLIDITY_EXTENSION: &str = "sol";

/// The name of the initializer method invoked through a freshly deployed proxy
pub const DEFAULT_INITIALIZER: &str = "initialize";

/// The artifact name of the ERC1967 proxy used for UUPS deployments
pub const ERC1967_PROXY_CONTRACT: &str = "ERC1967Proxy";

/// The artifact name of the transparent upgradeable proxy
pub const TRANSPARENT_PROXY_CONTRACT: &str = "TransparentUpgradeableProxy";

/// The artifact name of the beacon proxy
pub const BEACON_PROXY_CONTRACT: &str = "BeaconProxy";

/// The artifact name of the upgradeable beacon
pub const UPGRADEABLE_BEACON_CONTRACT: &str = "UpgradeableBeacon";

/// The name of the UUPS upgrade method an implementation must expose
pub const UUPS_UPGRADE_METHOD: &str = "upgradeToAndCall";

/// The default time to wait after an upgrade before reading back the
/// implementation pointer
pub const DEFAULT_UPGRADE_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// The number of times to poll for a transaction receipt before giving up
pub const RECEIPT_POLL_ATTEMPTS: usize = 60;

/// The interval between polls for a transaction receipt
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The name of the `forge` command
pub const FORGE_COMMAND: &str = "forge";

/// The `forge` subcommand submitting a verification request
pub const VERIFY_CONTRACT_COMMAND: &str = "verify-contract";

/// The marker preceding a verification request id in `forge` output
pub const VERIFICATION_GUID_MARKER: &str = "GUID:";

/// The default mint method invoked with a witness token
pub const DEFAULT_MINT_METHOD: &str = "mint";

/// The default RPC URL, a local Anvil node
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// The default network name
pub const DEFAULT_NETWORK: &str = "localhost";
