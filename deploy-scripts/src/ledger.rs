//! The per-network deployments ledger
//!
//! A ledger maps logical contract names to deployed addresses. Upgradable
//! deployments additionally record `"<name>_Implementation"`, the address of the
//! implementation currently behind the proxy.
//!
//! Stores perform no locking: exactly one process is assumed to touch a given
//! network's ledger at a time, and concurrent writers will lose updates.

use std::{
    collections::{btree_map, BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Mutex,
};

use alloy_primitives::Address;
use tracing::debug;

use crate::{
    constants::{DEPLOYMENTS_FILE_EXTENSION, DEPLOYMENTS_FILE_PREFIX, IMPLEMENTATION_KEY_SUFFIX},
    errors::ScriptError,
};

/// The ledger key under which a proxy's implementation address is recorded
pub fn implementation_key(name: &str) -> String {
    format!("{name}{IMPLEMENTATION_KEY_SUFFIX}")
}

/// The deployed addresses recorded for a single network
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    /// Contract name, or implementation key, to deployed address
    entries: BTreeMap<String, Address>,
}

impl Ledger {
    /// An empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// The address recorded under `key`
    pub fn get(&self, key: &str) -> Option<Address> {
        self.entries.get(key).copied()
    }

    /// The implementation address recorded for the proxy `name`
    pub fn implementation(&self, name: &str) -> Option<Address> {
        self.get(&implementation_key(name))
    }

    /// Record a successful deployment of `name`
    ///
    /// For a proxy deployment pass the implementation address. A non-proxy
    /// deployment clears any implementation entry left over from an earlier
    /// proxy deployment under the same name.
    pub fn record_deployment(
        &mut self,
        name: &str,
        address: Address,
        implementation: Option<Address>,
    ) -> Result<(), ScriptError> {
        validate_contract_name(name)?;
        self.entries.insert(name.to_string(), address);

        let impl_key = implementation_key(name);
        match implementation {
            Some(implementation) => self.entries.insert(impl_key, implementation),
            None => self.entries.remove(&impl_key),
        };

        Ok(())
    }

    /// The proxy address recorded for `name`
    ///
    /// Only deployments recorded with an implementation are proxies; a name
    /// recorded by a fresh deployment is not.
    pub fn proxy(&self, name: &str) -> Option<Address> {
        self.implementation(name).and(self.get(name))
    }

    /// Record a new implementation behind the existing proxy `name`
    pub fn record_implementation(
        &mut self,
        name: &str,
        implementation: Address,
    ) -> Result<(), ScriptError> {
        if self.proxy(name).is_none() {
            return Err(ScriptError::ProxyNotFound(format!(
                "no proxy deployment recorded for `{name}`"
            )));
        }

        self.entries.insert(implementation_key(name), implementation);
        Ok(())
    }

    /// Iterate over all recorded entries in key order
    pub fn iter(&self) -> btree_map::Iter<'_, String, Address> {
        self.entries.iter()
    }

    /// The number of recorded entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = (&'a String, &'a Address);
    type IntoIter = btree_map::Iter<'a, String, Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ----------
// | Stores |
// ----------

/// Durable storage for per-network ledgers
pub trait LedgerStore {
    /// Load the ledger for `network`, or an empty ledger if none was ever saved
    fn load(&self, network: &str) -> Result<Ledger, ScriptError>;

    /// Overwrite the ledger for `network`
    fn save(&self, network: &str, ledger: &Ledger) -> Result<(), ScriptError>;
}

/// Check that a contract name cannot be mistaken for an implementation key
pub fn validate_contract_name(name: &str) -> Result<(), ScriptError> {
    if name.is_empty() || name.ends_with(IMPLEMENTATION_KEY_SUFFIX) {
        return Err(ScriptError::InvalidContractName(format!(
            "`{name}`, names may not be empty or end in `{IMPLEMENTATION_KEY_SUFFIX}`"
        )));
    }

    Ok(())
}

/// Check that a network name is usable as a ledger key
fn validate_network(network: &str) -> Result<(), ScriptError> {
    let valid = !network.is_empty()
        && network
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ScriptError::InvalidNetwork(format!("`{network}`")))
    }
}

/// A ledger store keeping one JSON file per network in a directory
///
/// Each file is a flat object from ledger key to checksummed address, and is
/// rewritten wholesale on every save.
#[derive(Clone, Debug)]
pub struct JsonFileLedgerStore {
    /// The directory holding the deployments files
    dir: PathBuf,
}

impl JsonFileLedgerStore {
    /// A store rooted at `dir`, which is created on first save if absent
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The path of the deployments file for `network`
    pub fn ledger_path(&self, network: &str) -> PathBuf {
        self.dir.join(format!(
            "{DEPLOYMENTS_FILE_PREFIX}.{network}.{DEPLOYMENTS_FILE_EXTENSION}"
        ))
    }
}

/// Parse the contents of a deployments file
fn parse_ledger(contents: &str, path: &Path) -> Result<Ledger, ScriptError> {
    let raw: BTreeMap<String, String> = serde_json::from_str(contents)
        .map_err(|e| ScriptError::ReadDeployments(format!("{}: {e}", path.display())))?;

    let entries = raw
        .into_iter()
        .map(|(key, addr)| {
            Address::from_str(&addr)
                .map(|addr| (key.clone(), addr))
                .map_err(|e| {
                    ScriptError::ReadDeployments(format!("bad address for `{key}`: {e}"))
                })
        })
        .collect::<Result<_, _>>()?;

    Ok(Ledger { entries })
}

impl LedgerStore for JsonFileLedgerStore {
    fn load(&self, network: &str) -> Result<Ledger, ScriptError> {
        validate_network(network)?;
        let path = self.ledger_path(network);
        if !path.exists() {
            debug!("No deployments recorded for {network} at {}", path.display());
            return Ok(Ledger::new());
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| ScriptError::ReadDeployments(format!("{}: {e}", path.display())))?;
        parse_ledger(&contents, &path)
    }

    fn save(&self, network: &str, ledger: &Ledger) -> Result<(), ScriptError> {
        validate_network(network)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| ScriptError::WriteDeployments(format!("{}: {e}", self.dir.display())))?;

        let raw: BTreeMap<&str, String> = ledger
            .iter()
            .map(|(key, addr)| (key.as_str(), addr.to_checksum(None)))
            .collect();
        let contents = serde_json::to_string_pretty(&raw)
            .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;

        let path = self.ledger_path(network);
        fs::write(&path, contents)
            .map_err(|e| ScriptError::WriteDeployments(format!("{}: {e}", path.display())))?;

        debug!("Wrote {} deployment entries to {}", ledger.len(), path.display());
        Ok(())
    }
}

/// A ledger store held in memory, for tests and dry runs
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    /// Network name to ledger
    ledgers: Mutex<HashMap<String, Ledger>>,
}

impl InMemoryLedgerStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self, network: &str) -> Result<Ledger, ScriptError> {
        validate_network(network)?;
        let ledgers = self
            .ledgers
            .lock()
            .map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;
        Ok(ledgers.get(network).cloned().unwrap_or_default())
    }

    fn save(&self, network: &str, ledger: &Ledger) -> Result<(), ScriptError> {
        validate_network(network)?;
        let mut ledgers = self
            .ledgers
            .lock()
            .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
        ledgers.insert(network.to_string(), ledger.clone());
        Ok(())
    }
}
