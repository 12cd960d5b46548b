//! Scripts for deploying, upgrading & operating contracts on EVM networks.
//!
//! Deployments are recorded per network in a ledger of contract names to
//! addresses, which later upgrades and interactions resolve against.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
mod commands;
pub mod constants;
pub mod errors;
pub mod gateway;
pub mod ledger;
pub mod orchestrator;
pub mod proxy;
pub mod rpc;
mod solidity;
pub mod types;
pub mod utils;
pub mod verification;
