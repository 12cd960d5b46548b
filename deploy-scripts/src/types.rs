//! Type definitions used throughout the scripts

use std::fmt::{self, Display};

use alloy::dyn_abi::DynSolValue;
use alloy_primitives::Address;
use clap::ValueEnum;

use crate::constants::DEFAULT_INITIALIZER;

/// Proxy safety checks that a deployment may explicitly opt out of
///
/// Only `Constructor` and `MissingPublicUpgradeTo` guard a check here, the
/// bytecode-level allowances are accepted but have no effect.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnsafeAllow {
    /// The implementation declares a constructor taking arguments
    Constructor,
    /// The implementation declares immutable state variables
    StateVariableImmutable,
    /// The implementation links external libraries
    ExternalLibraryLinking,
    /// The implementation uses `delegatecall`
    Delegatecall,
    /// The implementation uses `selfdestruct`
    Selfdestruct,
    /// A UUPS implementation does not expose `upgradeToAndCall`
    MissingPublicUpgradeTo,
}

impl Display for UnsafeAllow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsafeAllow::Constructor => write!(f, "constructor"),
            UnsafeAllow::StateVariableImmutable => write!(f, "state-variable-immutable"),
            UnsafeAllow::ExternalLibraryLinking => write!(f, "external-library-linking"),
            UnsafeAllow::Delegatecall => write!(f, "delegatecall"),
            UnsafeAllow::Selfdestruct => write!(f, "selfdestruct"),
            UnsafeAllow::MissingPublicUpgradeTo => write!(f, "missing-public-upgrade-to"),
        }
    }
}

/// The proxy pattern behind an upgradable deployment, with the options
/// meaningful to that pattern only
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProxyKind {
    /// An ERC1967 proxy whose implementation carries the upgrade logic
    Uups {
        /// Safety checks the implementation is exempted from
        unsafe_allow: Vec<UnsafeAllow>,
    },
    /// A transparent upgradeable proxy, upgraded through its `ProxyAdmin`
    Transparent {
        /// The owner of the `ProxyAdmin`, defaulting to the deployer
        initial_owner: Option<Address>,
        /// Safety checks the implementation is exempted from
        unsafe_allow: Vec<UnsafeAllow>,
    },
    /// A beacon proxy, upgraded by pointing its beacon at a new implementation
    Beacon {
        /// The owner of the `UpgradeableBeacon`, defaulting to the deployer
        beacon_owner: Option<Address>,
        /// Safety checks the implementation is exempted from
        unsafe_allow: Vec<UnsafeAllow>,
    },
}

impl ProxyKind {
    /// A UUPS proxy with no safety exemptions
    pub fn uups() -> Self {
        ProxyKind::Uups {
            unsafe_allow: Vec::new(),
        }
    }

    /// A transparent proxy owned by the deployer, with no safety exemptions
    pub fn transparent() -> Self {
        ProxyKind::Transparent {
            initial_owner: None,
            unsafe_allow: Vec::new(),
        }
    }

    /// A beacon proxy owned by the deployer, with no safety exemptions
    pub fn beacon() -> Self {
        ProxyKind::Beacon {
            beacon_owner: None,
            unsafe_allow: Vec::new(),
        }
    }

    /// The safety checks the implementation is exempted from
    pub fn unsafe_allow(&self) -> &[UnsafeAllow] {
        match self {
            ProxyKind::Uups { unsafe_allow }
            | ProxyKind::Transparent { unsafe_allow, .. }
            | ProxyKind::Beacon { unsafe_allow, .. } => unsafe_allow,
        }
    }

    /// Whether the given safety check is exempted
    pub fn allows(&self, check: UnsafeAllow) -> bool {
        self.unsafe_allow().contains(&check)
    }
}

impl Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyKind::Uups { .. } => write!(f, "uups"),
            ProxyKind::Transparent { .. } => write!(f, "transparent"),
            ProxyKind::Beacon { .. } => write!(f, "beacon"),
        }
    }
}

/// How a contract is deployed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DeploymentMode {
    /// A direct contract creation
    #[default]
    Fresh,
    /// An implementation deployed behind an upgradable proxy
    Proxy(ProxyKind),
}

impl DeploymentMode {
    /// The proxy kind, if this is an upgradable deployment
    pub fn proxy_kind(&self) -> Option<&ProxyKind> {
        match self {
            DeploymentMode::Fresh => None,
            DeploymentMode::Proxy(kind) => Some(kind),
        }
    }
}

/// The initializer invoked exactly once through a freshly deployed proxy
#[derive(Clone, Debug, PartialEq)]
pub struct Initializer {
    /// The initializer method name; empty to skip initialization
    pub function: String,
    /// The initializer arguments
    pub args: Vec<DynSolValue>,
}

impl Initializer {
    /// Call `function` with `args`
    pub fn new(function: impl Into<String>, args: Vec<DynSolValue>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }

    /// No initializer call
    pub fn none() -> Self {
        Self::new("", Vec::new())
    }

    /// Whether an initializer call should be made
    pub fn is_none(&self) -> bool {
        self.function.is_empty()
    }
}

impl Default for Initializer {
    fn default() -> Self {
        Self::new(DEFAULT_INITIALIZER, Vec::new())
    }
}

/// Options controlling a single deploy or upgrade
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeployOptions {
    /// Fresh or proxy deployment
    pub mode: DeploymentMode,
    /// The proxy initializer, ignored for fresh deployments and upgrades
    pub initializer: Initializer,
    /// Log progress at `debug` rather than `info`
    pub silent: bool,
    /// Skip source verification
    pub no_verify: bool,
    /// The account to fund-check and send from, defaulting to the gateway's sender
    pub signer: Option<Address>,
}

impl DeployOptions {
    /// Options for a fresh deployment
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Options for a deployment behind the given proxy kind
    pub fn proxy(kind: ProxyKind) -> Self {
        Self {
            mode: DeploymentMode::Proxy(kind),
            ..Self::default()
        }
    }

    /// Set the proxy initializer
    pub fn with_initializer(mut self, initializer: Initializer) -> Self {
        self.initializer = initializer;
        self
    }

    /// Skip source verification
    pub fn without_verification(mut self) -> Self {
        self.no_verify = true;
        self
    }

    /// Log progress at `debug`
    pub fn silenced(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Send from an explicit account
    pub fn with_signer(mut self, signer: Address) -> Self {
        self.signer = Some(signer);
        self
    }
}
