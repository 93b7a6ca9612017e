//! Loading of compiled contract artifacts as laid out by Hardhat:
//!
//! ```text
//! artifacts/
//!   build-info/<hash>.json
//!   contracts/NftMarketplace.sol/NFTMarketPlace.json
//!   contracts/NftMarketplace.sol/NFTMarketPlace.dbg.json
//! ```

use {
    alloy::{
        dyn_abi::{DynSolType, DynSolValue, Specifier},
        json_abi::JsonAbi,
        primitives::{B256, Bytes, keccak256},
    },
    anyhow::{Context, Result, ensure},
    serde::Deserialize,
    std::path::{Path, PathBuf},
};

/// A compiled contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
    /// Where the artifact was loaded from. Used to resolve the debug file.
    #[serde(skip)]
    pub path: PathBuf,
}

/// The compiler input and version an artifact was built with. Explorers need
/// both to reproduce the bytecode.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_long_version: String,
    pub input: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

impl Artifact {
    /// Finds the artifact of the contract `name` below `root`.
    pub fn load(root: &Path, name: &str) -> Result<Self> {
        let path = find_artifact(root, name)?
            .with_context(|| format!("no artifact for {name:?} below {}", root.display()))?;
        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read artifact {}", path.display()))?;
        let mut artifact: Artifact = serde_json::from_str(&data)
            .with_context(|| format!("malformed artifact {}", path.display()))?;
        ensure!(
            !artifact.bytecode.is_empty(),
            "artifact {} has no bytecode, is {name} abstract?",
            path.display()
        );
        artifact.path = path;
        Ok(artifact)
    }

    /// Fully qualified contract name, e.g.
    /// `contracts/NftMarketplace.sol:NFTMarketPlace`.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Reads the build info referenced by the artifact's `.dbg.json` file.
    pub fn build_info(&self) -> Result<BuildInfo> {
        let debug_path = self.path.with_extension("dbg.json");
        let data = std::fs::read_to_string(&debug_path)
            .with_context(|| format!("failed to read {}", debug_path.display()))?;
        let debug: DebugFile = serde_json::from_str(&data)
            .with_context(|| format!("malformed debug file {}", debug_path.display()))?;
        let dir = debug_path.parent().unwrap_or_else(|| Path::new("."));
        let build_info_path = dir.join(debug.build_info);
        let data = std::fs::read_to_string(&build_info_path)
            .with_context(|| format!("failed to read {}", build_info_path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("malformed build info {}", build_info_path.display()))
    }

    /// ABI encodes the constructor arguments. Arguments are given in their
    /// human readable form and coerced to the declared input types.
    pub fn encode_constructor_args(&self, args: &[String]) -> Result<Bytes> {
        let inputs = self
            .abi
            .constructor
            .as_ref()
            .map(|constructor| constructor.inputs.as_slice())
            .unwrap_or_default();
        ensure!(
            inputs.len() == args.len(),
            "{} expects {} constructor arguments but {} were given",
            self.contract_name,
            inputs.len(),
            args.len()
        );
        let values = inputs
            .iter()
            .zip(args)
            .map(|(param, arg)| {
                let ty: DynSolType = param
                    .resolve()
                    .with_context(|| format!("unsupported constructor type {}", param.ty))?;
                ty.coerce_str(arg)
                    .with_context(|| format!("invalid value {arg:?} for {} {}", param.ty, param.name))
            })
            .collect::<Result<Vec<_>>>()?;
        if values.is_empty() {
            return Ok(Bytes::new());
        }
        Ok(DynSolValue::Tuple(values).abi_encode_params().into())
    }

    /// The transaction input that creates the contract.
    pub fn init_code(&self, encoded_args: &Bytes) -> Bytes {
        [self.bytecode.as_ref(), encoded_args.as_ref()].concat().into()
    }

    /// Identifies a deployment by the exact code it ran.
    pub fn init_code_hash(&self, encoded_args: &Bytes) -> B256 {
        keccak256(self.init_code(encoded_args))
    }
}

fn find_artifact(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    let file_name = format!("{name}.json");
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            if path.file_name().is_some_and(|dir_name| dir_name == "build-info") {
                continue;
            }
            subdirs.push(path);
        } else if path.file_name().is_some_and(|candidate| candidate == file_name.as_str()) {
            return Ok(Some(path));
        }
    }
    subdirs.sort();
    for subdir in subdirs {
        if let Some(path) = find_artifact(&subdir, name)? {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
