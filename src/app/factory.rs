//! Backend selection by configuration.

use std::sync::Arc;

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use crate::domain::{
    CardanoNetwork, ChainError, ConfigError, EvmNetwork, StoreError,
    TransactionStore,
};
use crate::infra::{
    EvmRpcNetwork, GraphQlHttpClient, GraphQlNetwork, JsonRpcClient, KoiosHttpClient,
    KoiosNetwork, PostgresTransactionStore,
};

use super::config::{AppConfig, BackendKind};

#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A configured backend, by chain family.
#[derive(Clone)]
pub enum ChainBackend {
    Cardano(Arc<dyn CardanoNetwork>),
    Evm(Arc<dyn EvmNetwork>),
}

impl ChainBackend {
    pub async fn get_height(&self) -> Result<u64, ChainError> {
        match self {
            ChainBackend::Cardano(network) => network.get_height().await,
            ChainBackend::Evm(network) => network.get_height().await,
        }
    }
}

fn required<'a>(value: Option<&'a String>, key: &str) -> Result<&'a str, ConfigError> {
    value
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Builds the backend named by `config.backend`.
///
/// The EVM backend connects to the transaction store and applies pending
/// migrations before it is returned.
pub async fn build_backend(config: &AppConfig) -> Result<ChainBackend, SetupError> {
    info!(backend = config.backend.as_str(), "Building chain backend");
    match config.backend {
        BackendKind::Koios => {
            let url = required(config.koios_url.as_ref(), "KOIOS_URL")?;
            let http = config.http_client_config(config.koios_auth_token.as_ref());
            let client = KoiosHttpClient::new(url, &http)?;
            Ok(ChainBackend::Cardano(Arc::new(KoiosNetwork::new(Arc::new(
                client,
            )))))
        }
        BackendKind::GraphQl => {
            let url = required(config.graphql_url.as_ref(), "GRAPHQL_URL")?;
            let client = GraphQlHttpClient::new(url, &config.http_client_config(None))?;
            Ok(ChainBackend::Cardano(Arc::new(GraphQlNetwork::new(
                Arc::new(client),
            ))))
        }
        BackendKind::EvmRpc => {
            let url = required(config.evm_rpc_url.as_ref(), "EVM_RPC_URL")?;
            let database_url = config
                .database_url
                .as_ref()
                .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;
            let http = config.http_client_config(config.evm_rpc_auth_token.as_ref());
            let rpc = JsonRpcClient::new(url, &http)?;

            let store = PostgresTransactionStore::with_defaults(database_url.expose_secret()).await?;
            store.run_migrations().await?;
            store.health_check().await?;

            Ok(ChainBackend::Evm(Arc::new(EvmRpcNetwork::new(
                Arc::new(rpc),
                Arc::new(store),
                config.evm_chain.clone(),
                config.evm_supported_tokens.clone(),
            ))))
        }
    }
}
