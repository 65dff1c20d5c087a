use anyhow::Context;
use bikeshare_collector::{
    actors::collector::{CollectorHandle, run_once},
    config::{Config, read_config_file},
    fetcher::StationFetcher,
    storage::open_store,
};
use clap::{Parser, Subcommand};
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(about = "Collect bike-sharing station snapshots into a storage backend")]
struct Args {
    /// Config file (JSON)
    #[arg(short, long, env = "BIKE_CONFIG")]
    file: Option<String>,

    /// MySQL password, overrides the config file
    #[arg(long, env = "BIKE_MYSQL_PASSWORD", hide_env_values = true)]
    mysql_password: Option<String>,

    /// Log at trace level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Poll the sources and store every batch (default)
    Run {
        /// Seconds between collections; 0 collects once and exits
        #[arg(short, long, env = "BIKE_SLEEP_INTERVAL")]
        sleep_interval: Option<u64>,

        /// Collect a single batch and exit
        #[arg(long)]
        once: bool,
    },

    /// Print every stored snapshot as JSON
    List,
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("bikeshare_collector", level),
        ("bike_collector", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };

    let config = config.with_mysql_password(args.mysql_password.clone());
    config.validate().context("invalid configuration")?;

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let mut config = load_config(&args)?;

    match args.command.clone().unwrap_or(Command::Run {
        sleep_interval: None,
        once: false,
    }) {
        Command::Run {
            sleep_interval,
            once,
        } => {
            if let Some(interval) = sleep_interval {
                config.interval = interval;
            }
            if once {
                config.interval = 0;
            }
            collect(config).await
        }
        Command::List => list(config).await,
    }
}

async fn collect(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config.storage).context("failed to set up storage backend")?;
    let fetcher = StationFetcher::from_config(&config)?;

    if config.interval == 0 {
        info!("collecting once");
        // a failed cycle is logged, not fatal
        let _ = run_once(fetcher, store).await;
        return Ok(());
    }

    info!(
        "polling {} sources every {}s",
        fetcher.sources().len(),
        config.interval
    );

    let (handle, task) = CollectorHandle::spawn_with_task(fetcher, store, config.interval);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    info!("shutting down");
    if let Ok(stats) = handle.get_stats().await {
        debug!("final stats: {stats:?}");
    }
    handle.shutdown().await?;
    task.await.context("collector task failed")?;

    Ok(())
}

async fn list(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config.storage).context("failed to set up storage backend")?;

    let snapshots = store.list().await.context("failed to list snapshots")?;
    debug!("listing {} snapshots", snapshots.len());

    println!("{}", serde_json::to_string_pretty(&snapshots)?);

    store.close().await?;
    Ok(())
}
