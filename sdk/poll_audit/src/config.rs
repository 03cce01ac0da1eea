use std::fs;
use std::path::Path;
use std::time::Duration;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::audit::AuditOptions;
use crate::errors::{AuditError, AuditResult};
use crate::rpc::LivepeerContracts;

pub const DEFAULT_SUBGRAPH_URL: &str = "https://api.thegraph.com/subgraphs/name/livepeer/livepeer";
pub const MAINNET_BONDING_MANAGER: Address = address!("511bc4556d823ae99630ae8de28b9b80df90ea2e");
pub const MAINNET_ROUNDS_MANAGER: Address = address!("3984fc4ceeef1739135476f625d36d6c35c40dc3");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Ethereum JSON-RPC endpoint.
    pub rpc_url: String,
    #[serde(default = "default_subgraph_url")]
    pub subgraph_url: String,
    /// Poll contract to audit.
    #[serde(default)]
    pub poll: Option<Address>,
    #[serde(default = "default_bonding_manager")]
    pub bonding_manager: Address,
    #[serde(default = "default_rounds_manager")]
    pub rounds_manager: Address,
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_subgraph_url() -> String {
    DEFAULT_SUBGRAPH_URL.to_string()
}

fn default_bonding_manager() -> Address {
    MAINNET_BONDING_MANAGER
}

fn default_rounds_manager() -> Address {
    MAINNET_ROUNDS_MANAGER
}

fn default_lookup_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    8
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            subgraph_url: default_subgraph_url(),
            poll: None,
            bonding_manager: default_bonding_manager(),
            rounds_manager: default_rounds_manager(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

impl AuditConfig {
    pub fn load(path: &Path) -> AuditResult<Self> {
        let content = fs::read_to_string(path).map_err(|err| {
            AuditError::Config(format!("unable to read {}: {err}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|err| AuditError::Config(format!("unable to parse config: {err}")))
    }

    pub fn save(&self, path: &Path) -> AuditResult<()> {
        let encoded = toml::to_string_pretty(self)
            .map_err(|err| AuditError::Config(format!("unable to encode config: {err}")))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                AuditError::Config(format!("unable to create {}: {err}", parent.display()))
            })?;
        }
        fs::write(path, encoded).map_err(|err| {
            AuditError::Config(format!("unable to write {}: {err}", path.display()))
        })
    }

    /// Reject settings the audit cannot run with. Returns the poll address.
    pub fn validate(&self) -> AuditResult<Address> {
        if self.rpc_url.trim().is_empty() {
            return Err(AuditError::Config("rpc_url must be set".into()));
        }
        if self.subgraph_url.trim().is_empty() {
            return Err(AuditError::Config("subgraph_url must be set".into()));
        }
        if self.concurrency == 0 {
            return Err(AuditError::Config("concurrency must be at least 1".into()));
        }
        if self.lookup_timeout_secs == 0 {
            return Err(AuditError::Config("lookup_timeout_secs must be at least 1".into()));
        }
        self.poll
            .ok_or_else(|| AuditError::Config("no poll address given".into()))
    }

    pub fn options(&self) -> AuditOptions {
        AuditOptions {
            concurrency: self.concurrency,
            lookup_timeout: Duration::from_secs(self.lookup_timeout_secs),
        }
    }

    pub fn contracts(&self) -> LivepeerContracts {
        LivepeerContracts {
            bonding_manager: self.bonding_manager,
            rounds_manager: self.rounds_manager,
        }
    }
}
