//! Source verification requests for deployed contracts

use std::process::Stdio;

use alloy_primitives::{Address, Bytes};
use tokio::process::Command;
use tracing::debug;

use crate::{
    constants::{FORGE_COMMAND, VERIFICATION_GUID_MARKER, VERIFY_CONTRACT_COMMAND},
    errors::ScriptError,
};

/// Everything a block explorer needs to verify a deployed contract
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationRequest {
    /// The address of the deployed code, the implementation for proxies
    pub address: Address,
    /// The fully qualified source identifier, `<path>:<name>`
    pub source_ref: String,
    /// The ABI-encoded constructor arguments
    pub constructor_args_encoded: Bytes,
    /// The creation bytecode
    pub bytecode: Bytes,
}

/// The result of the verification step of a deploy or upgrade
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The explorer accepted the request
    Verified {
        /// The explorer's id for the request
        request_id: String,
    },
    /// Verification was not requested
    Skipped,
    /// The request failed; the deployment itself stands
    Failed {
        /// Why the request failed
        reason: String,
    },
}

impl VerificationOutcome {
    /// Whether the explorer accepted the request
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified { .. })
    }
}

/// A block explorer verification backend
#[allow(async_fn_in_trait)]
pub trait VerificationService {
    /// Submit a verification request, returning the explorer's request id
    async fn request_verification(
        &self,
        request: &VerificationRequest,
    ) -> Result<String, ScriptError>;
}

/// Requests verification by shelling out to `forge verify-contract`
#[derive(Clone, Debug, Default)]
pub struct ForgeVerifier {
    /// The chain name or id passed to `--chain`
    pub chain: Option<String>,
    /// The explorer API key
    pub etherscan_api_key: Option<String>,
    /// A custom explorer API URL
    pub verifier_url: Option<String>,
}

impl ForgeVerifier {
    /// Build the `forge verify-contract` invocation for a request
    fn command(&self, request: &VerificationRequest) -> Command {
        let mut cmd = Command::new(FORGE_COMMAND);
        cmd.arg(VERIFY_CONTRACT_COMMAND)
            .arg(format!("{:#x}", request.address))
            .arg(&request.source_ref);

        if let Some(chain) = &self.chain {
            cmd.arg("--chain").arg(chain);
        }
        if !request.constructor_args_encoded.is_empty() {
            cmd.arg("--constructor-args")
                .arg(format!("0x{}", hex::encode(&request.constructor_args_encoded)));
        }
        if let Some(key) = &self.etherscan_api_key {
            cmd.arg("--etherscan-api-key").arg(key);
        }
        if let Some(url) = &self.verifier_url {
            cmd.arg("--verifier-url").arg(url);
        }

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }
}

impl VerificationService for ForgeVerifier {
    async fn request_verification(
        &self,
        request: &VerificationRequest,
    ) -> Result<String, ScriptError> {
        debug!(
            "Requesting verification of {} at {:#x}",
            request.source_ref, request.address
        );

        let output = self
            .command(request)
            .output()
            .await
            .map_err(|e| ScriptError::Verification(format!("running {FORGE_COMMAND}: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScriptError::Verification(format!(
                "{FORGE_COMMAND} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(parse_request_id(&stdout).unwrap_or_else(|| format!("{:#x}", request.address)))
    }
}

/// Extract the explorer's request id from `forge verify-contract` output
fn parse_request_id(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (_, rest) = line.split_once(VERIFICATION_GUID_MARKER)?;
        let id = rest.trim().trim_matches('`');
        (!id.is_empty()).then(|| id.to_string())
    })
}
