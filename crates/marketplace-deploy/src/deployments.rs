//! Run-scoped store of deployed contracts.
//!
//! Every step of a run resolves contracts by name through this store. For
//! networks that save deployments the records are mirrored to
//! `<root>/<network>/<Name>.json` so later runs can resolve them too.

use {
    crate::{config::Network, files},
    alloy::{
        json_abi::JsonAbi,
        primitives::{Address, B256},
    },
    anyhow::{Context, Result, ensure},
    serde::{Deserialize, Serialize},
    std::{
        collections::HashMap,
        path::{Path, PathBuf},
    },
};

const CHAIN_ID_FILE: &str = ".chainId";

/// Everything known about one deployed contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub name: String,
    pub address: Address,
    pub chain_id: u64,
    pub abi: JsonAbi,
    pub args: Vec<String>,
    pub transaction_hash: Option<B256>,
    pub gas_used: Option<u64>,
    /// keccak256 of the creation code including encoded constructor args.
    pub init_code_hash: B256,
}

#[derive(Debug)]
pub struct Deployments {
    network: String,
    chain_id: u64,
    dir: Option<PathBuf>,
    records: HashMap<String, DeploymentRecord>,
}

impl Deployments {
    /// Records live only as long as the process.
    pub fn in_memory(network: &Network) -> Self {
        Self {
            network: network.name.clone(),
            chain_id: network.chain_id(),
            dir: None,
            records: HashMap::new(),
        }
    }

    /// Records are mirrored below `root/<network name>`.
    pub fn persistent(root: &Path, network: &Network) -> Self {
        Self {
            dir: Some(root.join(&network.name)),
            ..Self::in_memory(network)
        }
    }

    /// Picks the flavour configured for the network.
    pub fn for_network(root: &Path, network: &Network) -> Self {
        if network.config.save_deployments {
            Self::persistent(root, network)
        } else {
            Self::in_memory(network)
        }
    }

    /// Forgets every deployment of this network, including persisted ones.
    pub fn reset(&mut self) -> Result<()> {
        self.records.clear();
        if let Some(dir) = self.dir.as_ref().filter(|dir| dir.exists()) {
            tracing::info!(network = %self.network, dir = %dir.display(), "deleting deployments");
            std::fs::remove_dir_all(dir)
                .with_context(|| format!("failed to delete {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn save(&mut self, record: DeploymentRecord) -> Result<()> {
        ensure!(
            record.chain_id == self.chain_id,
            "refusing to store {} for chain {} in deployments of chain {}",
            record.name,
            record.chain_id,
            self.chain_id
        );
        if let Some(dir) = &self.dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            files::write(&dir.join(CHAIN_ID_FILE), self.chain_id.to_string().as_bytes())?;
            files::write(
                &dir.join(format!("{}.json", record.name)),
                serde_json::to_string_pretty(&record)?.as_bytes(),
            )?;
        }
        self.records.insert(record.name.clone(), record);
        Ok(())
    }

    /// Looks the contract up in memory first and then on disk.
    pub fn find(&self, name: &str) -> Result<Option<DeploymentRecord>> {
        if let Some(record) = self.records.get(name) {
            return Ok(Some(record.clone()));
        }
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        let path = dir.join(format!("{name}.json"));
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let record: DeploymentRecord = serde_json::from_str(&data)
            .with_context(|| format!("malformed deployment {}", path.display()))?;
        ensure!(
            record.chain_id == self.chain_id,
            "{} was deployed on chain {} but network {} is chain {}",
            path.display(),
            record.chain_id,
            self.network,
            self.chain_id
        );
        Ok(Some(record))
    }

    /// Like [`Self::find`] but a missing deployment is an error.
    pub fn get(&self, name: &str) -> Result<DeploymentRecord> {
        self.find(name)?.with_context(|| {
            format!(
                "no deployment found for {name} on network {}",
                self.network
            )
        })
    }
}
