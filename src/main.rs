use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ledger_chaincode::cli::{tx::handle_command, Cli};
use ledger_chaincode::config::{LedgerConfig, StoreBackend};
use ledger_chaincode::{LedgerContract, LedgerError, MemoryStore, RocksStore};

fn run(cli: &Cli, config: &LedgerConfig) -> Result<(), LedgerError> {
    let contract = LedgerContract::with_policy(config.contract.amount_policy());
    match config.store.backend {
        StoreBackend::Rocksdb => {
            let store = RocksStore::open(&config.store.db_path)?;
            handle_command(&cli.command, contract, store, cli.json)
        }
        StoreBackend::Memory => {
            info!("Using in-memory state, nothing will persist");
            handle_command(&cli.command, contract, MemoryStore::new(), cli.json)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise peek at the config file for a level.
    let level = std::fs::read_to_string(&cli.config)
        .ok()
        .and_then(|s| LedgerConfig::from_toml_str(&s).ok())
        .map(|c| c.log.level)
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = LedgerConfig::load_or_default(&cli.config);
    if let Err(e) = run(&cli, &config) {
        error!("{}", e);
        std::process::exit(1);
    }
}
