use {
    alloy::signers::local::PrivateKeySigner,
    std::{
        fmt::{self, Display, Formatter},
        path::PathBuf,
        time::Duration,
    },
    tracing::level_filters::LevelFilter,
};

#[derive(clap::Parser)]
#[group(skip)]
pub struct LoggingArguments {
    #[clap(long, env, default_value = "warn,marketplace_deploy=info,observe=info")]
    pub log_filter: String,

    /// Events at this level or more severe go to stderr, the rest to stdout.
    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: LevelFilter,

    #[clap(long, env)]
    pub use_json_logs: bool,
}

impl Display for LoggingArguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            log_stderr_threshold,
            use_json_logs,
        } = self;

        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_stderr_threshold: {log_stderr_threshold}")?;
        writeln!(f, "use_json_logs: {use_json_logs}")
    }
}

/// Deploys the NFT marketplace and publishes it to the front end.
#[derive(clap::Parser)]
pub struct Arguments {
    #[clap(flatten)]
    pub logging: LoggingArguments,

    /// Network to run against, as named in the configuration file.
    #[clap(long, env, default_value = "hardhat")]
    pub network: String,

    /// TOML configuration with networks, artifact and front-end paths.
    /// Built-in defaults for local networks are used when omitted.
    #[clap(long, env)]
    pub config: Option<PathBuf>,

    /// Only run steps carrying one of these tags, e.g. `all`,
    /// `nftmarketplace` or `frontend`. Runs every step when empty.
    #[clap(long, env, use_value_delimiter = true)]
    pub tags: Vec<String>,

    /// Key of the deployer account. When omitted the node's first unlocked
    /// account deploys.
    #[clap(long, env)]
    pub private_key: Option<PrivateKeySigner>,

    /// Block explorer API key. Verification is skipped without it.
    #[clap(long, env)]
    pub etherscan_api_key: Option<String>,

    /// Publish addresses and interfaces to the front end when set to any
    /// non-empty value.
    #[clap(long, env)]
    pub update_front_end: Option<String>,

    /// Forget earlier deployments on this network before running.
    #[clap(long, env)]
    pub reset: bool,

    /// Timeout for requests to the block explorer.
    #[clap(
        long,
        env,
        default_value = "30s",
        value_parser = humantime::parse_duration,
    )]
    pub http_timeout: Duration,

    /// Time between polls of the explorer while a verification is pending.
    #[clap(
        long,
        env,
        default_value = "5s",
        value_parser = humantime::parse_duration,
    )]
    pub verification_poll_interval: Duration,

    /// How often the explorer is polled before verification is given up.
    #[clap(long, env, default_value = "12")]
    pub verification_max_attempts: usize,
}

impl Arguments {
    pub fn update_front_end(&self) -> bool {
        is_truthy(self.update_front_end.as_deref())
    }
}

/// Any non-empty value enables a flag, the same way a shell test would.
pub fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.is_empty())
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            logging,
            network,
            config,
            tags,
            private_key,
            etherscan_api_key,
            update_front_end,
            reset,
            http_timeout,
            verification_poll_interval,
            verification_max_attempts,
        } = self;

        write!(f, "{logging}")?;
        writeln!(f, "network: {network}")?;
        display_option(f, "config", &config.as_ref().map(|path| path.display()))?;
        writeln!(f, "tags: {tags:?}")?;
        display_option(
            f,
            "deployer",
            &private_key.as_ref().map(|signer| signer.address()),
        )?;
        display_secret_option(f, "etherscan_api_key", etherscan_api_key)?;
        display_option(f, "update_front_end", update_front_end)?;
        writeln!(f, "reset: {reset}")?;
        writeln!(f, "http_timeout: {http_timeout:?}")?;
        writeln!(
            f,
            "verification_poll_interval: {verification_poll_interval:?}"
        )?;
        writeln!(f, "verification_max_attempts: {verification_max_attempts}")
    }
}

pub fn display_secret_option<T>(
    f: &mut Formatter<'_>,
    name: &str,
    option: &Option<T>,
) -> fmt::Result {
    display_option(f, name, &option.as_ref().map(|_| "SECRET"))
}

pub fn display_option(
    f: &mut Formatter<'_>,
    name: &str,
    option: &Option<impl Display>,
) -> fmt::Result {
    match option {
        Some(display) => writeln!(f, "{name}: {display}"),
        None => writeln!(f, "{name}: None"),
    }
}
