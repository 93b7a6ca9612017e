pub mod arguments;
pub mod artifact;
pub mod config;
pub mod deploy;
pub mod deployments;
mod files;
pub mod front_end;
pub mod steps;
pub mod verify;

use {
    crate::{
        arguments::Arguments,
        config::Configuration,
        deploy::NodeDeployer,
        deployments::Deployments,
        verify::{Etherscan, Verifying},
    },
    anyhow::{Context, Result, ensure},
    clap::Parser,
    std::process::ExitCode,
};

const USER_AGENT: &str = "marketplace-deploy/0.1.0";

pub async fn start(args: impl Iterator<Item = String>) -> ExitCode {
    let args = Arguments::parse_from(args);
    let obs_config = observe::Config::new(
        args.logging.log_filter.as_str(),
        args.logging.log_stderr_threshold,
        args.logging.use_json_logs,
    );
    observe::tracing::initialize(&obs_config);
    observe::panic_hook::install();
    tracing::info!("running deployment with validated arguments:\n{}", args);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("deployment failed: {err:?}");
            ExitCode::FAILURE
        }
    }
}

pub async fn run(args: Arguments) -> Result<()> {
    let config = match &args.config {
        Some(path) => Configuration::from_path(path).await?,
        None => Configuration::default(),
    };
    let network = config.network(&args.network)?;

    let deployer = NodeDeployer::connect(&network.config.url, args.private_key.clone())
        .await
        .with_context(|| format!("could not connect to network {}", network.name))?;
    let chain_id = deployer.chain_id().await?;
    ensure!(
        chain_id == network.chain_id(),
        "network {} is configured for chain {} but the node is on chain {chain_id}",
        network.name,
        network.chain_id()
    );

    let etherscan_api_key = args
        .etherscan_api_key
        .clone()
        .filter(|key| !key.is_empty());
    let verifier = match &etherscan_api_key {
        Some(api_key) => {
            let client = reqwest::Client::builder()
                .timeout(args.http_timeout)
                .user_agent(USER_AGENT)
                .build()
                .context("failed to build http client")?;
            let url = match &network.config.verify_url {
                Some(url) => url.clone(),
                None => verify::DEFAULT_API_URL.parse()?,
            };
            Some(Box::new(Etherscan::new(
                client,
                url,
                api_key.clone(),
                chain_id,
                args.verification_poll_interval,
                args.verification_max_attempts,
            )) as Box<dyn Verifying>)
        }
        None => None,
    };

    let mut deployments = Deployments::for_network(&config.deployments, &network);
    if args.reset {
        deployments.reset()?;
    }

    let mut context = steps::Context {
        development_chains: config.development_chains,
        artifacts: config.artifacts,
        front_end: config.front_end,
        deployments,
        network,
        deployer: Box::new(deployer),
        verifier,
        etherscan_api_key,
        update_front_end: args.update_front_end(),
    };
    steps::run(&mut context, &args.tags).await?;
    Ok(())
}
