use clap::Parser;
use miette::{IntoDiagnostic, Result};
use obmen::application::Dispatcher;
use obmen::config::{Config, OpenHours};
use obmen::domain::ports::{RecordStoreRef, TransportRef};
use obmen::domain::user::UserId;
use obmen::infrastructure::json_file::JsonFileStore;
use obmen::interfaces::console::{self, ConsoleTransport, ConsoleUpdate};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Operator account id; the admin panel and order decisions are gated on it
    #[arg(long)]
    admin_id: i64,

    /// Directory holding the JSON record files
    #[arg(long, default_value = "bot_data")]
    data_dir: PathBuf,

    /// Channel name confirmed orders are announced to
    #[arg(long)]
    channel: Option<String>,

    /// Daily service window for new orders, e.g. 8-22 (local hours)
    #[arg(long)]
    hours: Option<String>,

    /// Offset applied to displayed timestamps, in whole hours
    #[arg(long, default_value_t = 5)]
    utc_offset: i32,

    /// Credit the currency reserve when a sell order is confirmed
    #[arg(long)]
    credit_sell_reserve: bool,

    /// Path to a persistent RocksDB database. If provided, used instead of
    /// the JSON files.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,obmen=debug"));

    // stdout belongs to the console transport; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(cli: &Cli) -> Result<RecordStoreRef> {
    use obmen::infrastructure::rocksdb::RocksDbStore;
    Ok(match &cli.db_path {
        Some(path) => Arc::new(RocksDbStore::open(path).into_diagnostic()?) as RecordStoreRef,
        None => Arc::new(JsonFileStore::open(&cli.data_dir).into_diagnostic()?) as RecordStoreRef,
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(cli: &Cli) -> Result<RecordStoreRef> {
    Ok(Arc::new(JsonFileStore::open(&cli.data_dir).into_diagnostic()?) as RecordStoreRef)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = Config::new(UserId::new(cli.admin_id));
    config.channel = cli.channel.clone();
    config.utc_offset_hours = cli.utc_offset;
    config.credit_sell_reserve = cli.credit_sell_reserve;
    if let Some(hours) = &cli.hours {
        config.hours = Some(OpenHours::parse(hours).into_diagnostic()?);
    }

    let store = open_store(&cli)?;
    let transport: TransportRef = Arc::new(ConsoleTransport::new());
    let dispatcher = Dispatcher::new(store, transport, config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.into_diagnostic()? {
        let Some(update) = console::parse_line(&line) else {
            continue;
        };
        match update {
            ConsoleUpdate::Message(inbound) => {
                if let Err(err) = dispatcher.on_message(inbound).await {
                    error!(error = %err, "update failed");
                }
            }
            ConsoleUpdate::Callback { from, payload } => {
                match dispatcher.on_callback(from, &payload).await {
                    Ok(ack) => println!("[ack] {ack}"),
                    Err(err) => error!(error = %err, "callback failed"),
                }
            }
        }
    }

    Ok(())
}
