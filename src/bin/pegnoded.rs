// pegnoded — follower daemon: runs the sync loop and serves the read-only
// JSON-RPC surface. Banner, config resolution, data-dir creation, then spawns
// the RPC server alongside the main driver loop.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use colored::*;

use pegnode::assets::Network;
use pegnode::chain_adapter::HttpChainAdapter;
use pegnode::config::NetworkConfig;
use pegnode::driver::Driver;
use pegnode::grading::{FourthPowerGrader, Sha3DifficultyHasher};
use pegnode::rpc::server::{load_or_generate_rpc_token, start_rpc_server, RpcState};
use pegnode::store::ChainStore;

fn banner() {
    println!("{}", "pegnoded".bright_cyan().bold());
    println!("{}", "follower node — grading, burns, transfers".bright_blue());
    println!();
}

fn resolve_network() -> Network {
    match std::env::var("PEGNODE_NETWORK").as_deref() {
        Ok("testnet") => Network::Testnet,
        _ => Network::Mainnet,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    banner();

    let network = resolve_network();
    let config = NetworkConfig::load(network);

    tracing::info!(data_dir = %config.data_dir.display(), ?network, "starting");
    std::fs::create_dir_all(&config.data_dir)?;

    let store = ChainStore::open(&config.data_dir.join("chaindata"))?;
    tracing::info!("chain store opened");

    let adapter: Arc<dyn pegnode::chain_adapter::ChainAdapter> =
        Arc::new(HttpChainAdapter::new(config.chain_adapter_url.clone()));

    let auth_token = load_or_generate_rpc_token(&config.data_dir)?;
    let rpc_state = Arc::new(RpcState {
        store: store.clone(),
        adapter: adapter.clone(),
        shutdown: AtomicBool::new(false),
        auth_token,
    });

    let rpc_bind = config.rpc_bind.clone();
    let rpc_port = config.rpc_port;
    let rpc_handle = tokio::spawn(async move {
        if let Err(e) = start_rpc_server(rpc_state, &rpc_bind, rpc_port).await {
            tracing::error!(error = %e, "RPC server exited");
        }
    });

    let driver = Driver {
        store,
        adapter,
        grader: Box::new(FourthPowerGrader),
        hasher: Box::new(Sha3DifficultyHasher),
        network,
        poll_interval: Duration::from_secs(5),
    };

    let driver_handle = tokio::task::spawn_blocking(move || driver.run());

    tokio::select! {
        result = driver_handle => {
            if let Ok(Err(e)) = result {
                tracing::error!(error = %e, "driver loop exited with an error");
                std::process::exit(2);
            }
        }
        _ = rpc_handle => {}
    }

    Ok(())
}
