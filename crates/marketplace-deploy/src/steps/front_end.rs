use {
    super::{Context, marketplace::NFT_MARKETPLACE},
    crate::front_end::FrontEnd,
    anyhow::Result,
};

/// Interface file name the front end imports the marketplace ABI from.
pub const NFT_MARKETPLACE_ABI_FILE: &str = "NftMarketplace.json";

pub fn update_front_end(ctx: &Context) -> Result<()> {
    if !ctx.update_front_end {
        tracing::debug!("front end update not requested");
        return Ok(());
    }
    tracing::info!("Updating front end...");
    let record = ctx.deployments.get(NFT_MARKETPLACE)?;
    FrontEnd::new(&ctx.front_end).sync(&record, NFT_MARKETPLACE_ABI_FILE)?;
    Ok(())
}
