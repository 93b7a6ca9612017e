//! The tagged steps a deployment run is made of.

mod front_end;
mod marketplace;

pub use {
    front_end::{NFT_MARKETPLACE_ABI_FILE, update_front_end},
    marketplace::{NFT_MARKETPLACE, deploy_nft_marketplace},
};
use {
    crate::{
        config::{FrontEndConfig, Network},
        deploy::Deploying,
        deployments::Deployments,
        verify::Verifying,
    },
    anyhow::{Context as _, Result},
    std::path::PathBuf,
    strum::IntoEnumIterator,
};

/// Everything the steps need, passed explicitly instead of being read from
/// the process environment.
pub struct Context {
    pub network: Network,
    pub development_chains: Vec<String>,
    pub artifacts: PathBuf,
    pub deployments: Deployments,
    pub front_end: FrontEndConfig,
    pub deployer: Box<dyn Deploying>,
    pub verifier: Option<Box<dyn Verifying>>,
    pub etherscan_api_key: Option<String>,
    pub update_front_end: bool,
}

/// Steps in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Step {
    DeployNftMarketplace,
    UpdateFrontEnd,
}

impl Step {
    pub fn tags(self) -> &'static [&'static str] {
        match self {
            Self::DeployNftMarketplace => &["all", "nftmarketplace"],
            Self::UpdateFrontEnd => &["all", "frontend"],
        }
    }

    /// Without tags every step is selected.
    pub fn is_selected(self, tags: &[String]) -> bool {
        tags.is_empty() || tags.iter().any(|tag| self.tags().contains(&tag.as_str()))
    }

    async fn run(self, ctx: &mut Context) -> Result<()> {
        match self {
            Self::DeployNftMarketplace => deploy_nft_marketplace(ctx).await,
            Self::UpdateFrontEnd => update_front_end(ctx),
        }
    }
}

/// Runs the selected steps one after the other and stops at the first error.
/// Returns the steps that ran.
pub async fn run(ctx: &mut Context, tags: &[String]) -> Result<Vec<Step>> {
    let selected: Vec<_> = Step::iter().filter(|step| step.is_selected(tags)).collect();
    if selected.is_empty() {
        tracing::warn!(?tags, "no step matches the given tags");
    }
    for step in &selected {
        tracing::info!(%step, network = %ctx.network.name, "running step");
        step.run(ctx)
            .await
            .with_context(|| format!("step {step} failed"))?;
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            artifact::tests::{marketplace_abi, write_artifacts},
            config::Configuration,
            deploy::{DeployReceipt, MockDeploying},
            deployments::tests::record,
            verify::{MockVerifying, Verification},
        },
        alloy::primitives::{Address, B256, address},
        std::path::Path,
    };

    const DEPLOYED: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
    const DEPLOYER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    fn goerli() -> Network {
        let config: Configuration = toml::from_str(
            r#"
            [networks.goerli]
            url = "https://goerli.example.org/"
            chain-id = 5
            save-deployments = false
            "#,
        )
        .unwrap();
        config.network("goerli").unwrap()
    }

    fn deploying(times: usize) -> Box<dyn Deploying> {
        let mut deployer = MockDeploying::new();
        deployer.expect_deployer().times(times).return_const(DEPLOYER);
        deployer.expect_deploy().times(times).returning(|_| {
            Ok(DeployReceipt {
                address: DEPLOYED,
                transaction_hash: B256::repeat_byte(1),
                gas_used: 21_000,
            })
        });
        Box::new(deployer)
    }

    fn verifying(times: usize) -> Box<dyn Verifying> {
        let mut verifier = MockVerifying::new();
        verifier
            .expect_verify()
            .withf(|request| {
                request.address == DEPLOYED
                    && request.contract_name == "contracts/NftMarketplace.sol:NFTMarketPlace"
                    && request.compiler_version == "0.8.7+commit.e28d00a7"
                    && request.constructor_args.is_empty()
            })
            .times(times)
            .returning(|_| Ok(Verification::Verified));
        Box::new(verifier)
    }

    fn context(network: Network, artifacts: &Path, front_end_dir: &Path) -> Context {
        Context {
            deployments: Deployments::in_memory(&network),
            network,
            development_chains: Configuration::default().development_chains,
            artifacts: artifacts.to_path_buf(),
            front_end: FrontEndConfig {
                contracts_file: front_end_dir.join("networkMapping.json"),
                abi_dir: front_end_dir.to_path_buf(),
            },
            deployer: deploying(0),
            verifier: None,
            etherscan_api_key: None,
            update_front_end: false,
        }
    }

    #[test]
    fn tag_selection() {
        let tags = |tags: &[&str]| tags.iter().map(|tag| tag.to_string()).collect::<Vec<_>>();

        assert!(Step::DeployNftMarketplace.is_selected(&[]));
        assert!(Step::DeployNftMarketplace.is_selected(&tags(&["all"])));
        assert!(Step::DeployNftMarketplace.is_selected(&tags(&["nftmarketplace"])));
        assert!(!Step::DeployNftMarketplace.is_selected(&tags(&["frontend"])));
        assert!(Step::UpdateFrontEnd.is_selected(&tags(&["frontend", "other"])));
        assert!(!Step::UpdateFrontEnd.is_selected(&tags(&["nftmarketplace"])));
        assert_eq!(Step::UpdateFrontEnd.to_string(), "update-front-end");
    }

    #[tokio::test]
    async fn development_network_skips_verification() {
        let artifacts = write_artifacts(NFT_MARKETPLACE, marketplace_abi());
        let front_end = tempfile::tempdir().unwrap();
        let network = Configuration::default().network("hardhat").unwrap();
        let mut ctx = Context {
            deployer: deploying(1),
            verifier: Some(verifying(0)),
            etherscan_api_key: Some("KEY".to_string()),
            ..context(network, artifacts.path(), front_end.path())
        };

        let ran = run(&mut ctx, &[]).await.unwrap();

        assert_eq!(ran, [Step::DeployNftMarketplace, Step::UpdateFrontEnd]);
        assert_eq!(ctx.deployments.get(NFT_MARKETPLACE).unwrap().address, DEPLOYED);
    }

    #[tokio::test]
    async fn public_network_with_key_verifies() {
        let artifacts = write_artifacts(NFT_MARKETPLACE, marketplace_abi());
        let front_end = tempfile::tempdir().unwrap();
        let mut ctx = Context {
            deployer: deploying(1),
            verifier: Some(verifying(1)),
            etherscan_api_key: Some("KEY".to_string()),
            ..context(goerli(), artifacts.path(), front_end.path())
        };

        run(&mut ctx, &["nftmarketplace".to_string()]).await.unwrap();
    }

    #[tokio::test]
    async fn public_network_without_key_skips_verification() {
        let artifacts = write_artifacts(NFT_MARKETPLACE, marketplace_abi());
        let front_end = tempfile::tempdir().unwrap();
        let mut ctx = Context {
            deployer: deploying(1),
            verifier: Some(verifying(0)),
            etherscan_api_key: Some(String::new()),
            ..context(goerli(), artifacts.path(), front_end.path())
        };

        run(&mut ctx, &["all".to_string()]).await.unwrap();
    }

    #[tokio::test]
    async fn verification_failure_aborts_the_run() {
        let artifacts = write_artifacts(NFT_MARKETPLACE, marketplace_abi());
        let front_end = tempfile::tempdir().unwrap();
        std::fs::write(front_end.path().join("networkMapping.json"), "{}").unwrap();
        let mut verifier = MockVerifying::new();
        verifier
            .expect_verify()
            .returning(|_| Err(anyhow::anyhow!("Fail - Unable to verify")));
        let mut ctx = Context {
            deployer: deploying(1),
            verifier: Some(Box::new(verifier)),
            etherscan_api_key: Some("KEY".to_string()),
            update_front_end: true,
            ..context(goerli(), artifacts.path(), front_end.path())
        };

        assert!(run(&mut ctx, &[]).await.is_err());
        assert_eq!(
            std::fs::read_to_string(front_end.path().join("networkMapping.json")).unwrap(),
            "{}"
        );
    }

    #[tokio::test]
    async fn front_end_flag_unset_writes_nothing() {
        let artifacts = write_artifacts(NFT_MARKETPLACE, marketplace_abi());
        let front_end = tempfile::tempdir().unwrap();
        let mut ctx = Context {
            deployer: deploying(1),
            ..context(goerli(), artifacts.path(), front_end.path())
        };

        run(&mut ctx, &[]).await.unwrap();

        assert_eq!(std::fs::read_dir(front_end.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn deploy_then_sync_registers_address() {
        let artifacts = write_artifacts(NFT_MARKETPLACE, marketplace_abi());
        let front_end = tempfile::tempdir().unwrap();
        std::fs::write(front_end.path().join("networkMapping.json"), "{}").unwrap();
        let mut ctx = Context {
            deployer: deploying(1),
            update_front_end: true,
            ..context(goerli(), artifacts.path(), front_end.path())
        };

        run(&mut ctx, &[]).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(front_end.path().join("networkMapping.json")).unwrap(),
            r#"{"5":["0x5FbDB2315678afecb367f032d93F642f64180aa3"]}"#
        );
        assert!(front_end.path().join(NFT_MARKETPLACE_ABI_FILE).exists());
    }

    #[tokio::test]
    async fn front_end_only_resolves_earlier_deployment() {
        let artifacts = write_artifacts(NFT_MARKETPLACE, marketplace_abi());
        let front_end = tempfile::tempdir().unwrap();
        let registry = r#"{"5":["0x5FbDB2315678afecb367f032d93F642f64180aa3"]}"#;
        std::fs::write(front_end.path().join("networkMapping.json"), registry).unwrap();
        let mut ctx = Context {
            update_front_end: true,
            ..context(goerli(), artifacts.path(), front_end.path())
        };
        ctx.deployments.save(record(5)).unwrap();

        let ran = run(&mut ctx, &["frontend".to_string()]).await.unwrap();

        assert_eq!(ran, [Step::UpdateFrontEnd]);
        assert_eq!(
            std::fs::read_to_string(front_end.path().join("networkMapping.json")).unwrap(),
            registry
        );
    }

    #[tokio::test]
    async fn front_end_without_deployment_fails() {
        let artifacts = write_artifacts(NFT_MARKETPLACE, marketplace_abi());
        let front_end = tempfile::tempdir().unwrap();
        std::fs::write(front_end.path().join("networkMapping.json"), "{}").unwrap();
        let mut ctx = Context {
            update_front_end: true,
            ..context(goerli(), artifacts.path(), front_end.path())
        };

        assert!(run(&mut ctx, &["frontend".to_string()]).await.is_err());
    }
}
