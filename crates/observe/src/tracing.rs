use {
    crate::Config,
    std::io::IsTerminal,
    time::macros::format_description,
    tracing::level_filters::LevelFilter,
    tracing_subscriber::{
        EnvFilter,
        Layer,
        fmt::{
            MakeWriter,
            time::UtcTime,
            writer::MakeWriterExt as _,
        },
        prelude::*,
        util::SubscriberInitExt,
    },
};

/// Initializes the global tracing subscriber.
/// `env_filter` has similar syntax to env_logger. It is documented at
/// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
pub fn initialize(config: &Config) {
    set_tracing_subscriber(config);
}

fn set_tracing_subscriber(config: &Config) {
    let threshold = config
        .stderr_threshold
        .into_level()
        .unwrap_or(tracing::Level::ERROR);
    let writer = split_by_severity(std::io::stderr, std::io::stdout, threshold);
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ));

    let fmt_layer = if config.use_json_format {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_timer(timer)
            .with_filter(EnvFilter::new(&config.env_filter))
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_timer(timer)
            .with_ansi(std::io::stdout().is_terminal())
            .with_filter(EnvFilter::new(&config.env_filter))
            .boxed()
    };

    tracing_subscriber::registry()
        .with(LevelFilter::TRACE)
        .with(fmt_layer)
        .init();
}

/// Events at `threshold` or more severe go to `stderr`, the rest to `stdout`.
fn split_by_severity<E, O>(
    stderr: E,
    stdout: O,
    threshold: tracing::Level,
) -> impl for<'a> MakeWriter<'a> + Send + Sync + 'static
where
    E: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    O: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    stderr.with_max_level(threshold).or_else(stdout)
}
