mod config;
mod domain;
mod exchanges;
mod storage;
mod trader;

use config::{Config, ConfigError, RunMode};
use domain::OrderSide;
use exchanges::cex::Client;
use exchanges::{
    pair_to_symbol, split_pair, Exchange, ExchangeError, RecordingExchange, ReplayExchange,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use storage::{SqliteStorage, StorageError, TickStorage};
use tokio::time::MissedTickBehavior;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use trader::{Outcome, Trader, TraderConfig};

const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";
const REPLAY_FLAG: &str = "--replay";

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("replay requires a replay section with from/to")]
    MissingReplayWindow,
}

/// Exchange capability plus the storage it writes to or reads from, if any.
struct Venue {
    exchange: Arc<dyn Exchange>,
    storage: Option<Arc<SqliteStorage>>,
}

fn parse_config_path() -> String {
    for arg in env::args().skip(1) {
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    DEFAULT_CONFIG_PATH.to_string()
}

/// Collects `--key=value` strategy overrides, skipping `--config=` and bare flags.
fn parse_overrides(args: impl IntoIterator<Item = String>) -> Vec<(String, String)> {
    args.into_iter()
        .filter_map(|arg| {
            let (key, value) = arg.strip_prefix("--")?.split_once('=')?;
            (key != "config").then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

fn init_tracing(log_level: Option<&str>) {
    let level = match log_level {
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("warn") | Some("warning") => Level::WARN,
        Some("error") => Level::ERROR,
        Some("trace") => Level::TRACE,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config_path = parse_config_path();
    let overrides = parse_overrides(env::args().skip(1));
    let mode = if env::args().any(|arg| arg == REPLAY_FLAG) {
        RunMode::Replay
    } else {
        RunMode::Live
    };

    let config = match Config::load_with_overrides(&config_path, &overrides, mode) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return;
        }
    };

    init_tracing(config.app.log_level.as_deref());

    let opened = match mode {
        RunMode::Replay => open_replay(&config).await,
        RunMode::Live => open_live(&config).await,
    };
    let venue = match opened {
        Ok(venue) => venue,
        Err(e) => {
            error!(error = %e, "Failed to start trader");
            return;
        }
    };

    let strategy = &config.strategy;
    info!(
        app = %config.app.name,
        env = %config.app.env,
        config = %config_path,
        action = %strategy.action,
        pair = %strategy.pair,
        amount = %strategy.amount,
        threshold_percent = %strategy.threshold_percent,
        order_ttl = strategy.order_ttl,
        mode = ?mode,
        "Starting trader"
    );

    let mut trader = Trader::new(venue.exchange, TraderConfig::from(strategy));
    run(&mut trader, strategy.processing_period()).await;

    if let Some(storage) = venue.storage {
        match storage.count().await {
            Ok(tickers) => info!(tickers, "Tick storage closing"),
            Err(e) => warn!(error = %e, "Failed to count stored tickers"),
        }
        if let Err(e) = storage.close().await {
            warn!(error = %e, "Failed to close storage");
        }
    }
}

/// Builds the live CEX.io client, optionally recording tickers.
async fn open_live(config: &Config) -> Result<Venue, StartupError> {
    let client = Client::from_config(&config.exchange)?;
    log_balance(&client, config.strategy.action, &config.strategy.pair).await;

    let client: Arc<dyn Exchange> = Arc::new(client);

    match config.storage {
        Some(ref storage_config) if storage_config.enabled => {
            let storage = Arc::new(SqliteStorage::new(storage_config.sqlite()).await?);
            let exchange = Arc::new(RecordingExchange::new(client, storage.clone()));
            Ok(Venue {
                exchange,
                storage: Some(storage),
            })
        }
        _ => Ok(Venue {
            exchange: client,
            storage: None,
        }),
    }
}

/// Builds a replay exchange over recorded tickers in the configured window.
async fn open_replay(config: &Config) -> Result<Venue, StartupError> {
    let window = config
        .replay
        .as_ref()
        .ok_or(StartupError::MissingReplayWindow)?;
    let sqlite = config
        .storage
        .as_ref()
        .map(|s| s.sqlite())
        .unwrap_or_default();

    let storage = Arc::new(SqliteStorage::new(sqlite).await?);
    let exchange = ReplayExchange::from_storage(
        storage.as_ref(),
        &pair_to_symbol(&config.strategy.pair),
        window.from.timestamp(),
        window.to.timestamp(),
    )
    .await?;

    Ok(Venue {
        exchange: Arc::new(exchange),
        storage: Some(storage),
    })
}

/// Logs the available balance of the currency the strategy spends.
async fn log_balance(client: &Client, action: OrderSide, pair: &str) {
    let Some((base, quote)) = split_pair(pair) else {
        return;
    };
    let currency = match action {
        OrderSide::Sell => base,
        OrderSide::Buy => quote,
    };

    match client.get_balance(currency).await {
        Ok(available) => info!(currency = %currency, available = %available, "Balance"),
        Err(e) => warn!(currency = %currency, error = %e, "Failed to fetch balance"),
    }
}

/// Polls the trader once per period until it finishes, fails, or Ctrl+C arrives.
async fn run(trader: &mut Trader, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match trader.process().await {
                    Ok(Outcome::Continue) => {}
                    Ok(Outcome::Done) => {
                        info!(pair = %trader.config().pair, "work is done");
                        break;
                    }
                    Ok(Outcome::Expired) => {
                        info!(order_id = ?trader.current_order(), "Order expired, waiting for cancel");
                    }
                    Ok(Outcome::PartiallyExecuted { remains }) => {
                        info!(remains = %remains, "Order partially executed, trading the rest");
                    }
                    Err(e) if e.is_replay_exhausted() => {
                        info!(error = %e, "Replay finished");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "Trader error");
                        break;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }
}
