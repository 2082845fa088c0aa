use std::env;

use clap::ValueEnum;

/// Which chain endpoint a command runs against. Selected explicitly per
/// invocation instead of flipping process-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub testnet_rpc_url: Option<String>,
    pub http_bind_addr: String,
    pub store_path: String,
    pub chat_api_url: String,
    pub chat_api_key: Option<String>,
    pub chat_model: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing ETH_RPC_URL env var")]
    MissingEthRpcUrl,
    #[error("missing ETH_RPC_URL_TESTNET env var, required for --network testnet")]
    MissingTestnetRpcUrl,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let rpc_url = env::var("ETH_RPC_URL").map_err(|_| ConfigError::MissingEthRpcUrl)?;
        let testnet_rpc_url = env::var("ETH_RPC_URL_TESTNET").ok();

        let http_bind_addr = env::var("HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let store_path =
            env::var("STORE_PATH").unwrap_or_else(|_| "data/whale-watch.json".to_string());

        let chat_api_url = env::var("CHAT_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
        let chat_api_key = env::var("CHAT_API_KEY").ok().filter(|key| !key.is_empty());
        let chat_model = env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        Ok(Self {
            rpc_url,
            testnet_rpc_url,
            http_bind_addr,
            store_path,
            chat_api_url,
            chat_api_key,
            chat_model,
        })
    }

    pub fn rpc_url_for(&self, network: Network) -> Result<&str, ConfigError> {
        match network {
            Network::Mainnet => Ok(&self.rpc_url),
            Network::Testnet => self
                .testnet_rpc_url
                .as_deref()
                .ok_or(ConfigError::MissingTestnetRpcUrl),
        }
    }
}
