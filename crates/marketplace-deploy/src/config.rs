use {
    anyhow::{Context, Result, anyhow},
    serde::{Deserialize, Deserializer, Serialize},
    std::{
        collections::BTreeMap,
        path::{Path, PathBuf},
    },
    url::Url,
};

/// Confirmations to wait for when a network does not configure its own.
pub const DEFAULT_BLOCK_CONFIRMATIONS: u64 = 3;

const LOCAL_NODE_URL: &str = "http://127.0.0.1:8545";
const LOCAL_CHAIN_ID: u64 = 31337;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Networks on which verification is never attempted.
    #[serde(default = "default_development_chains")]
    pub development_chains: Vec<String>,

    /// Root directory of the compiled contract artifacts.
    #[serde(default = "default_artifacts")]
    pub artifacts: PathBuf,

    /// Root directory for persisted deployment records, one subdirectory per
    /// network.
    #[serde(default = "default_deployments")]
    pub deployments: PathBuf,

    #[serde(default = "default_networks")]
    pub networks: BTreeMap<String, NetworkConfig>,

    #[serde(default)]
    pub front_end: FrontEndConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NetworkConfig {
    /// RPC endpoint of the node. A value of the form `%NAME` is read from the
    /// environment variable `NAME` so endpoints with API keys can stay out of
    /// the file.
    #[serde(deserialize_with = "deserialize_url")]
    pub url: Url,

    /// Expected chain id. Checked against the node before anything is sent.
    pub chain_id: u64,

    pub block_confirmations: Option<u64>,

    /// Explorer API used for source verification on this network.
    pub verify_url: Option<Url>,

    /// Whether deployment records outlive the process.
    #[serde(default = "default_true")]
    pub save_deployments: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FrontEndConfig {
    /// The chain id to addresses mapping consumed by the front end.
    pub contracts_file: PathBuf,

    /// Directory the contract interface files are exported to.
    pub abi_dir: PathBuf,
}

impl Default for FrontEndConfig {
    fn default() -> Self {
        Self {
            contracts_file: "../nextjs-nft-marketplace/constants/networkMapping.json".into(),
            abi_dir: "../nextjs-nft-marketplace/constants/".into(),
        }
    }
}

/// A resolved network the pipeline runs against.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub name: String,
    pub config: NetworkConfig,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    pub fn block_confirmations(&self) -> u64 {
        self.config
            .block_confirmations
            .unwrap_or(DEFAULT_BLOCK_CONFIRMATIONS)
    }

    pub fn is_development(&self, development_chains: &[String]) -> bool {
        development_chains.iter().any(|name| *name == self.name)
    }
}

impl Configuration {
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read config at {}", path.as_ref().display()))?;
        match toml::from_str(&data) {
            Ok(self_) => Ok(self_),
            Err(err) if std::env::var("TOML_TRACE_ERROR").is_ok_and(|v| v == "1") => Err(anyhow!(
                "failed to parse TOML config at {}: {err:#?}",
                path.as_ref().display()
            )),
            Err(_) => Err(anyhow!(
                "failed to parse TOML config at: {}. Set TOML_TRACE_ERROR=1 to print parsing \
                 error but this may leak secrets.",
                path.as_ref().display()
            )),
        }
    }

    pub fn network(&self, name: &str) -> Result<Network> {
        let config = self.networks.get(name).with_context(|| {
            format!(
                "unknown network {name:?}, configured networks: {:?}",
                self.networks.keys().collect::<Vec<_>>()
            )
        })?;
        Ok(Network {
            name: name.to_string(),
            config: config.clone(),
        })
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            development_chains: default_development_chains(),
            artifacts: default_artifacts(),
            deployments: default_deployments(),
            networks: default_networks(),
            front_end: FrontEndConfig::default(),
        }
    }
}

fn default_development_chains() -> Vec<String> {
    vec!["hardhat".to_string(), "localhost".to_string()]
}

fn default_artifacts() -> PathBuf {
    "artifacts".into()
}

fn default_deployments() -> PathBuf {
    "deployments".into()
}

fn default_true() -> bool {
    true
}

fn default_networks() -> BTreeMap<String, NetworkConfig> {
    let local = |save_deployments| NetworkConfig {
        url: LOCAL_NODE_URL.parse().expect("valid local node url"),
        chain_id: LOCAL_CHAIN_ID,
        block_confirmations: Some(1),
        verify_url: None,
        save_deployments,
    };
    BTreeMap::from([
        ("hardhat".to_string(), local(false)),
        ("localhost".to_string(), local(true)),
    ])
}

fn deserialize_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let value = match raw.strip_prefix('%') {
        Some(env_var_name) => std::env::var(env_var_name).map_err(|err| {
            tracing::error!(%err, %env_var_name, "failed to load env var");
            serde::de::Error::invalid_value(
                serde::de::Unexpected::Str(env_var_name),
                &"expected environment variable to be available",
            )
        })?,
        None => raw,
    };
    value.parse().map_err(serde::de::Error::custom)
}
