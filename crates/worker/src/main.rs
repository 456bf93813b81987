use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod correlate;
mod summary;
mod technicals;

#[derive(Debug, Parser)]
#[command(name = "newscorr_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Do everything except writing files under the data dir.
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Correlate daily headline sentiment with daily returns.
    Correlate {
        /// News CSV; relative paths are looked up under the raw data dir.
        #[arg(long)]
        news: PathBuf,

        /// Price CSV for a single instrument.
        #[arg(long)]
        prices: PathBuf,

        /// Keep only news rows for this instrument key.
        #[arg(long)]
        instrument: Option<String>,

        /// Keep the instrument column through aggregation and alignment.
        #[arg(long)]
        by_instrument: bool,

        /// Closing price column of the price CSV.
        #[arg(long, default_value = "Close")]
        close_field: String,
    },

    /// Headline length, publisher and publication-date statistics.
    Eda {
        #[arg(long)]
        news: PathBuf,

        /// How many publishers to log.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// SMA, RSI and MACD columns for a price CSV.
    Indicators {
        #[arg(long)]
        prices: PathBuf,

        #[arg(long, default_value = "Close")]
        close_field: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = newscorr_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if !args.dry_run {
        settings.ensure_data_dirs()?;
    }

    match args.command {
        Command::Correlate {
            news,
            prices,
            instrument,
            by_instrument,
            close_field,
        } => correlate::run(
            &settings,
            correlate::CorrelateJob {
                news: settings.resolve_raw(&news),
                prices: settings.resolve_raw(&prices),
                instrument,
                by_instrument,
                close_field,
                dry_run: args.dry_run,
            },
        ),
        Command::Eda { news, top } => {
            summary::run(&settings, &settings.resolve_raw(&news), top, args.dry_run)
        }
        Command::Indicators {
            prices,
            close_field,
        } => technicals::run(
            &settings,
            &settings.resolve_raw(&prices),
            &close_field,
            args.dry_run,
        ),
    }
}

fn init_sentry(settings: &newscorr_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
