use {
    super::Context,
    crate::{
        artifact::Artifact,
        deploy,
        verify::{self, Verification, VerificationRequest},
    },
    anyhow::{Context as _, Result},
};

pub const NFT_MARKETPLACE: &str = "NFTMarketPlace";

/// Deploys the marketplace and, outside of development networks, submits its
/// source for verification.
pub async fn deploy_nft_marketplace(ctx: &mut Context) -> Result<()> {
    tracing::info!("----------------------------------------------------");
    let args: Vec<String> = Vec::new();
    tracing::info!(
        deployer = %ctx.deployer.deployer(),
        network = %ctx.network.name,
        "deploying {NFT_MARKETPLACE}"
    );

    let artifact = Artifact::load(&ctx.artifacts, NFT_MARKETPLACE)?;
    let deployed = deploy::deploy(
        ctx.deployer.as_ref(),
        &mut ctx.deployments,
        &artifact,
        ctx.network.chain_id(),
        &args,
        ctx.network.block_confirmations(),
    )
    .await?;

    if verify::should_verify(
        &ctx.network,
        &ctx.development_chains,
        ctx.etherscan_api_key.as_deref(),
    ) {
        tracing::info!("Verifying...");
        let verifier = ctx
            .verifier
            .as_deref()
            .context("verification requested but no verifier is configured")?;
        let build_info = artifact.build_info()?;
        let request = VerificationRequest {
            address: deployed.record.address,
            contract_name: artifact.qualified_name(),
            compiler_version: build_info.solc_long_version,
            standard_json_input: serde_json::to_string(&build_info.input)?,
            constructor_args: artifact.encode_constructor_args(&args)?,
        };
        match verifier.verify(request).await? {
            Verification::Verified => {
                tracing::info!(address = %deployed.record.address, "verified");
            }
            Verification::AlreadyVerified => {
                tracing::info!(address = %deployed.record.address, "already verified");
            }
        }
    }

    tracing::info!("-------------------");
    Ok(())
}
