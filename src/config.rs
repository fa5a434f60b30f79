// Node configuration (§4.9 ambient stack). Env-var overrides and home-dir
// resolution, split by network (`Network`, in assets.rs) rather than a single
// hardcoded mainnet config. P2P ports/peer limits are dropped entirely —
// gossip/rebroadcast is a non-goal (§10).

use crate::assets::Network;

pub const RPC_PORT_MAINNET: u16 = 9001;
pub const RPC_PORT_TESTNET: u16 = 19001;

/// Maximum JSON-RPC request body size.
pub const MAX_MESSAGE_SIZE: usize = 1_048_576;

/// Bind address for RPC — loopback-only by default; override with
/// `PEGNODE_RPC_BIND`.
pub const RPC_BIND_ADDRESS_DEFAULT: &str = "127.0.0.1";

/// RPC bearer-token file name, stored alongside the data directory.
pub const RPC_TOKEN_FILE: &str = ".rpc-token";

pub const DATA_DIR_MAINNET: &str = ".pegnode/mainnet";
pub const DATA_DIR_TESTNET: &str = ".pegnode/testnet";

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network: Network,
    pub rpc_port: u16,
    pub rpc_bind: String,
    pub data_dir: std::path::PathBuf,
    pub chain_adapter_url: String,
}

impl NetworkConfig {
    pub fn load(network: Network) -> Self {
        let (default_port, dir_name) = match network {
            Network::Mainnet => (RPC_PORT_MAINNET, DATA_DIR_MAINNET),
            Network::Testnet => (RPC_PORT_TESTNET, DATA_DIR_TESTNET),
        };

        let rpc_port = std::env::var("PEGNODE_RPC_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default_port);

        let rpc_bind = std::env::var("PEGNODE_RPC_BIND")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| RPC_BIND_ADDRESS_DEFAULT.to_string());

        let data_dir = std::env::var("PEGNODE_DATA_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|| std::path::PathBuf::from(resolve_home_dir()).join(dir_name));

        let chain_adapter_url = std::env::var("PEGNODE_CHAIN_ADAPTER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8088".to_string());

        NetworkConfig {
            network,
            rpc_port,
            rpc_bind,
            data_dir,
            chain_adapter_url,
        }
    }
}

fn resolve_home_dir() -> String {
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return home;
        }
    }
    #[cfg(windows)]
    {
        if let Ok(home) = std::env::var("USERPROFILE") {
            if !home.trim().is_empty() {
                return home;
            }
        }
        let drive = std::env::var("HOMEDRIVE").unwrap_or_default();
        let path = std::env::var("HOMEPATH").unwrap_or_default();
        if !drive.is_empty() || !path.is_empty() {
            return format!("{drive}{path}");
        }
    }
    ".".to_string()
}
