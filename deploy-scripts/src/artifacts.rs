//! Resolution of compiled contract artifacts
//!
//! Both Foundry (`out/<Name>.sol/<Name>.json`) and Hardhat
//! (`artifacts/contracts/<Name>.sol/<Name>.json`) artifact layouts are understood.

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    json_abi::{Function, JsonAbi},
};
use alloy_primitives::{hex, Bytes};
use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    constants::{ARTIFACT_EXTENSION, SOLIDITY_EXTENSION},
    errors::ScriptError,
};

/// A compiled contract, ready to be deployed
#[derive(Clone, Debug, PartialEq)]
pub struct ContractArtifact {
    /// The contract name
    pub name: String,
    /// The contract ABI
    pub abi: JsonAbi,
    /// The creation bytecode
    pub bytecode: Bytes,
    /// The fully qualified source identifier, `<path>:<name>`
    pub source_ref: String,
}

impl ContractArtifact {
    /// ABI-encode constructor arguments, without the creation bytecode
    pub fn encode_constructor_args(&self, args: &[DynSolValue]) -> Result<Vec<u8>, ScriptError> {
        match self.abi.constructor() {
            Some(constructor) => constructor
                .abi_encode_input(args)
                .map_err(|e| ScriptError::CalldataConstruction(format!("{}: {e}", self.name))),
            None if args.is_empty() => Ok(Vec::new()),
            None => Err(ScriptError::CalldataConstruction(format!(
                "{} has no constructor but {} arguments were given",
                self.name,
                args.len()
            ))),
        }
    }

    /// The contract creation payload: bytecode followed by encoded constructor arguments
    pub fn deploy_code(&self, args: &[DynSolValue]) -> Result<Bytes, ScriptError> {
        let encoded_args = self.encode_constructor_args(args)?;
        Ok([self.bytecode.as_ref(), encoded_args.as_slice()].concat().into())
    }

    /// Whether the constructor takes any arguments
    pub fn has_constructor_inputs(&self) -> bool {
        self.abi
            .constructor()
            .is_some_and(|constructor| !constructor.inputs.is_empty())
    }

    /// Whether the ABI exposes a method with the given name
    pub fn has_function(&self, name: &str) -> bool {
        self.abi.function(name).is_some_and(|overloads| !overloads.is_empty())
    }

    /// Look up a method by name and arity
    pub fn function(&self, name: &str, num_args: usize) -> Result<&Function, ScriptError> {
        let overloads = self.abi.function(name).ok_or_else(|| {
            ScriptError::CalldataConstruction(format!("{} has no method `{name}`", self.name))
        })?;

        overloads
            .iter()
            .find(|f| f.inputs.len() == num_args)
            .ok_or_else(|| {
                let signatures = overloads.iter().map(Function::signature).join(", ");
                ScriptError::CalldataConstruction(format!(
                    "no overload of `{name}` takes {num_args} arguments, found: {signatures}"
                ))
            })
    }

    /// ABI-encode a method call, including the selector
    pub fn encode_call(&self, method: &str, args: &[DynSolValue]) -> Result<Bytes, ScriptError> {
        let function = self.function(method, args.len())?;
        function
            .abi_encode_input(args)
            .map(Bytes::from)
            .map_err(|e| ScriptError::CalldataConstruction(format!("{method}: {e}")))
    }
}

/// Locates compiled contract artifacts by contract name
pub trait ArtifactResolver {
    /// Resolve the artifact for `name`
    ///
    /// Fails with [`ScriptError::ArtifactNotFound`] when no artifact exists; any
    /// other error means an artifact was found but is unusable.
    fn resolve(&self, name: &str) -> Result<ContractArtifact, ScriptError>;
}

// ----------------------
// | Compiled Artifacts |
// ----------------------

/// The subset of a compiler artifact needed for deployment
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    /// The contract ABI
    abi: JsonAbi,
    /// The creation bytecode
    bytecode: RawBytecode,
    /// The source path, as emitted by Hardhat
    #[serde(default)]
    source_name: Option<String>,
    /// The source AST, as emitted by Foundry
    #[serde(default)]
    ast: Option<RawAst>,
    /// The compiler metadata, as emitted by Foundry
    #[serde(default)]
    metadata: Option<Value>,
}

/// Creation bytecode in either artifact layout
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    /// Foundry: `{ "object": "0x..." }`
    Object {
        /// The hex-encoded bytecode
        object: String,
    },
    /// Hardhat: `"0x..."`
    Hex(String),
}

impl RawBytecode {
    /// The hex-encoded bytecode
    fn hex(&self) -> &str {
        match self {
            RawBytecode::Object { object } => object,
            RawBytecode::Hex(hex) => hex,
        }
    }
}

/// The subset of a Foundry source AST needed for verification
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAst {
    /// The path of the compiled source file
    absolute_path: String,
}

/// Find the source path compiled for `name` in Foundry metadata,
/// `settings.compilationTarget = { "<path>": "<name>" }`
fn compilation_target(metadata: &Value, name: &str) -> Option<String> {
    metadata
        .pointer("/settings/compilationTarget")?
        .as_object()?
        .iter()
        .find_map(|(path, target)| (target.as_str() == Some(name)).then(|| path.clone()))
}

/// Resolves artifacts from a compiler output directory
#[derive(Clone, Debug)]
pub struct CompiledArtifactResolver {
    /// The compiler output directory, e.g. `out` or `artifacts/contracts`
    root: PathBuf,
}

impl CompiledArtifactResolver {
    /// A resolver over the given compiler output directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the artifact file for `name`, looking first in `<name>.sol/` and
    /// then in every immediate subdirectory of the root
    fn find_artifact(&self, name: &str) -> Result<Option<PathBuf>, ScriptError> {
        let file_name = format!("{name}.{ARTIFACT_EXTENSION}");
        let conventional = self
            .root
            .join(format!("{name}.{SOLIDITY_EXTENSION}"))
            .join(&file_name);
        if conventional.is_file() {
            return Ok(Some(conventional));
        }

        if !self.root.is_dir() {
            return Ok(None);
        }

        let entries = fs::read_dir(&self.root)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", self.root.display())))?;

        let found = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_dir())
            .map(|dir| dir.join(&file_name))
            .filter(|candidate| candidate.is_file())
            .sorted()
            .next();

        Ok(found)
    }
}

/// Parse an artifact file
fn parse_artifact(name: &str, path: &Path) -> Result<ContractArtifact, ScriptError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))?;
    let raw: RawArtifact = serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))?;

    let bytecode_hex = raw.bytecode.hex();
    if bytecode_hex.contains("__") {
        return Err(ScriptError::ArtifactParsing(format!(
            "{name} has unlinked library references"
        )));
    }

    let bytecode = hex::decode(bytecode_hex)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{name} bytecode: {e}")))?;
    if bytecode.is_empty() {
        return Err(ScriptError::ArtifactParsing(format!(
            "{name} has no creation bytecode, is it abstract or an interface?"
        )));
    }

    let source_path = raw
        .source_name
        .or_else(|| raw.ast.map(|ast| ast.absolute_path))
        .or_else(|| {
            raw.metadata
                .as_ref()
                .and_then(|metadata| compilation_target(metadata, name))
        })
        .unwrap_or_else(|| format!("{name}.{SOLIDITY_EXTENSION}"));

    Ok(ContractArtifact {
        name: name.to_string(),
        abi: raw.abi,
        bytecode: bytecode.into(),
        source_ref: format!("{source_path}:{name}"),
    })
}

impl ArtifactResolver for CompiledArtifactResolver {
    fn resolve(&self, name: &str) -> Result<ContractArtifact, ScriptError> {
        let path = self.find_artifact(name)?.ok_or_else(|| {
            ScriptError::ArtifactNotFound(format!(
                "no artifact for `{name}` under {}",
                self.root.display()
            ))
        })?;

        debug!("Resolved {name} artifact at {}", path.display());
        parse_artifact(name, &path)
    }
}
