//! `chain-probe`: builds the configured backend and prints a snapshot of
//! the chain it is connected to.

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{error, info};

use bridge_chain_query::app::{AppConfig, ChainBackend, build_backend};
use bridge_chain_query::domain::ChainError;
use bridge_chain_query::infra::observability::{init_metrics_exporter, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ChainError>() {
                Some(chain_err) => {
                    error!(kind = chain_err.kind().as_str(), error = %chain_err, "Probe failed")
                }
                None => error!(error = %err, "Probe failed"),
            }
            eprintln!("chain-probe: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    init_tracing(config.log_format)?;

    if let Some(addr) = config.metrics_addr {
        init_metrics_exporter(addr).context("Failed to start metrics exporter")?;
        info!(%addr, "Metrics exporter listening");
    }

    let backend = build_backend(&config).await?;
    let height = backend.get_height().await?;
    println!("backend: {}", config.backend.as_str());
    println!("height: {height}");

    match backend {
        ChainBackend::Cardano(network) => {
            let params = network.get_protocol_parameters().await?;
            println!("minFeeA: {}", params.min_fee_a);
            println!("minFeeB: {}", params.min_fee_b);
            println!("maxTxSize: {}", params.max_tx_size);
            println!("coinsPerUtxoSize: {}", params.coins_per_utxo_size);
        }
        ChainBackend::Evm(network) => {
            let priority_fee = network.get_max_priority_fee_per_gas().await?;
            let max_fee = network.get_max_fee_per_gas().await?;
            println!("chain: {}", config.evm_chain);
            println!("maxPriorityFeePerGas: {priority_fee}");
            println!("maxFeePerGas: {max_fee}");
        }
    }
    Ok(())
}
