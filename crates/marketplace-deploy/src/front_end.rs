//! Publishes deployed contracts to the front-end project: the chain id to
//! addresses mapping and one interface file per contract.
//!
//! Both files are computed in memory and staged next to their targets before
//! either one is moved into place. The read-modify-write of the registry is not
//! protected against other processes writing it at the same time.

use {
    crate::{config::FrontEndConfig, deployments::DeploymentRecord, files},
    anyhow::{Context, Result},
    indexmap::IndexMap,
    serde::{Deserialize, Serialize},
    std::path::{Path, PathBuf},
};

/// Contract addresses by chain id, in the order they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressRegistry(IndexMap<String, Vec<String>>);

impl AddressRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("malformed {}", path.display()))
    }

    /// Adds `address` to the list of `chain_id` unless it is already there.
    /// Returns whether the registry changed.
    pub fn register(&mut self, chain_id: u64, address: &str) -> bool {
        let addresses = self.0.entry(chain_id.to_string()).or_default();
        if addresses.iter().any(|known| known == address) {
            return false;
        }
        addresses.push(address.to_string());
        true
    }
}

/// What a sync changed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub registry_updated: bool,
    pub abi_file: PathBuf,
}

pub struct FrontEnd {
    contracts_file: PathBuf,
    abi_dir: PathBuf,
}

impl FrontEnd {
    pub fn new(config: &FrontEndConfig) -> Self {
        Self {
            contracts_file: config.contracts_file.clone(),
            abi_dir: config.abi_dir.clone(),
        }
    }

    /// Registers the deployed address and exports the interface to
    /// `<abi dir>/<abi_file_name>`. The registry is only rewritten when the
    /// address was new, the interface file always.
    pub fn sync(&self, record: &DeploymentRecord, abi_file_name: &str) -> Result<SyncOutcome> {
        let mut registry = AddressRegistry::load(&self.contracts_file)?;
        let registry_updated = registry.register(record.chain_id, &record.address.to_string());
        let abi_file = self.abi_dir.join(abi_file_name);

        let mut staged = Vec::new();
        if registry_updated {
            staged.push(files::stage(
                &self.contracts_file,
                serde_json::to_string(&registry)?.as_bytes(),
            )?);
        }
        staged.push(files::stage(
            &abi_file,
            serde_json::to_string(&record.abi)?.as_bytes(),
        )?);

        for file in staged {
            file.persist()?;
        }

        if registry_updated {
            tracing::info!(
                chain_id = record.chain_id,
                address = %record.address,
                file = %self.contracts_file.display(),
                "registered contract address"
            );
        } else {
            tracing::debug!(
                chain_id = record.chain_id,
                address = %record.address,
                "contract address already registered"
            );
        }
        tracing::info!(file = %abi_file.display(), "exported contract interface");

        Ok(SyncOutcome {
            registry_updated,
            abi_file,
        })
    }
}
