//! Environment configuration.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use validator::Validate;

use crate::domain::ConfigError;
use crate::infra::HttpClientConfig;
use crate::infra::evm::normalize::{hex_address, parse_address};
use crate::infra::observability::LogFormat;

const DEFAULT_EVM_CHAIN: &str = "ethereum";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Backend selected by `CHAIN_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Koios,
    GraphQl,
    EvmRpc,
}

impl BackendKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Koios => "koios",
            BackendKind::GraphQl => "graphql",
            BackendKind::EvmRpc => "evm-rpc",
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "koios" => Ok(BackendKind::Koios),
            "graphql" => Ok(BackendKind::GraphQl),
            "evm-rpc" | "evm" => Ok(BackendKind::EvmRpc),
            other => Err(ConfigError::InvalidValue {
                key: "CHAIN_BACKEND".to_string(),
                message: format!("unknown backend '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct AppConfig {
    pub backend: BackendKind,
    #[validate(url)]
    pub koios_url: Option<String>,
    pub koios_auth_token: Option<SecretString>,
    #[validate(url)]
    pub graphql_url: Option<String>,
    #[validate(url)]
    pub evm_rpc_url: Option<String>,
    pub evm_rpc_auth_token: Option<SecretString>,
    #[validate(length(min = 1))]
    pub evm_chain: String,
    /// Lower-cased ERC-20 contract addresses.
    pub evm_supported_tokens: Vec<String>,
    pub database_url: Option<SecretString>,
    #[validate(range(min = 1, max = 300))]
    pub http_timeout_secs: u64,
    pub log_format: LogFormat,
    pub metrics_addr: Option<SocketAddr>,
}

impl AppConfig {
    /// Reads the configuration from the process environment, after loading
    /// `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let backend: BackendKind = get("CHAIN_BACKEND")
            .ok_or_else(|| ConfigError::MissingEnvVar("CHAIN_BACKEND".to_string()))?
            .parse()?;

        let config = Self {
            backend,
            koios_url: get("KOIOS_URL"),
            koios_auth_token: get("KOIOS_AUTH_TOKEN").map(SecretString::from),
            graphql_url: get("GRAPHQL_URL"),
            evm_rpc_url: get("EVM_RPC_URL"),
            evm_rpc_auth_token: get("EVM_RPC_AUTH_TOKEN").map(SecretString::from),
            evm_chain: get("EVM_CHAIN").unwrap_or_else(|| DEFAULT_EVM_CHAIN.to_string()),
            evm_supported_tokens: get("EVM_SUPPORTED_TOKENS")
                .map(|raw| parse_token_list(&raw))
                .transpose()?
                .unwrap_or_default(),
            database_url: get("DATABASE_URL").map(SecretString::from),
            http_timeout_secs: get("HTTP_TIMEOUT_SECS")
                .map(|raw| parse_value("HTTP_TIMEOUT_SECS", &raw))
                .transpose()?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            log_format: get("LOG_FORMAT")
                .map(|raw| raw.parse::<LogFormat>())
                .transpose()?
                .unwrap_or_default(),
            metrics_addr: get("METRICS_ADDR")
                .map(|raw| parse_value("METRICS_ADDR", &raw))
                .transpose()?,
        };

        config.validate()?;
        config.require_backend_settings()?;
        Ok(config)
    }

    fn require_backend_settings(&self) -> Result<(), ConfigError> {
        let missing = |key: &str| -> Result<(), ConfigError> {
            Err(ConfigError::MissingEnvVar(key.to_string()))
        };
        match self.backend {
            BackendKind::Koios if self.koios_url.is_none() => missing("KOIOS_URL"),
            BackendKind::GraphQl if self.graphql_url.is_none() => missing("GRAPHQL_URL"),
            BackendKind::EvmRpc if self.evm_rpc_url.is_none() => missing("EVM_RPC_URL"),
            BackendKind::EvmRpc if self.database_url.is_none() => missing("DATABASE_URL"),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Transport settings for a backend client, with its optional token.
    #[must_use]
    pub fn http_client_config(&self, auth_token: Option<&SecretString>) -> HttpClientConfig {
        let config = HttpClientConfig::default().with_timeout(self.http_timeout());
        match auth_token {
            Some(token) => config.with_auth_token(token.clone()),
            None => config,
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_token_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            parse_address(entry)
                .map(|address| hex_address(&address))
                .map_err(|e| ConfigError::InvalidValue {
                    key: "EVM_SUPPORTED_TOKENS".to_string(),
                    message: e.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_koios_defaults() {
        let config = load(&[
            ("CHAIN_BACKEND", "koios"),
            ("KOIOS_URL", "https://preprod.koios.rest/api/v1"),
        ])
        .unwrap();
        assert_eq!(config.backend, BackendKind::Koios);
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.evm_chain, "ethereum");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.metrics_addr.is_none());
        assert!(config.evm_supported_tokens.is_empty());
    }

    #[test]
    fn test_missing_backend() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::MissingEnvVar(key)) if key == "CHAIN_BACKEND"
        ));
        assert!(matches!(
            load(&[("CHAIN_BACKEND", "solana")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_backend_url_required() {
        assert!(matches!(
            load(&[("CHAIN_BACKEND", "graphql")]),
            Err(ConfigError::MissingEnvVar(key)) if key == "GRAPHQL_URL"
        ));
        assert!(matches!(
            load(&[("CHAIN_BACKEND", "evm-rpc"), ("EVM_RPC_URL", "http://localhost:8545")]),
            Err(ConfigError::MissingEnvVar(key)) if key == "DATABASE_URL"
        ));
    }

    #[test]
    fn test_timeout_range() {
        let base = [("CHAIN_BACKEND", "koios"), ("KOIOS_URL", "http://localhost:8080")];
        for bad in ["0", "301"] {
            let mut pairs = base.to_vec();
            pairs.push(("HTTP_TIMEOUT_SECS", bad));
            assert!(load(&pairs).is_err(), "{bad}");
        }
        let mut pairs = base.to_vec();
        pairs.push(("HTTP_TIMEOUT_SECS", "abc"));
        assert!(matches!(load(&pairs), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = load(&[("CHAIN_BACKEND", "koios"), ("KOIOS_URL", "not a url")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_evm_settings() {
        let config = load(&[
            ("CHAIN_BACKEND", "evm-rpc"),
            ("EVM_RPC_URL", "http://localhost:8545"),
            ("EVM_RPC_AUTH_TOKEN", "secret"),
            ("EVM_CHAIN", "binance"),
            ("DATABASE_URL", "postgres://localhost/bridge"),
            (
                "EVM_SUPPORTED_TOKENS",
                "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48, 0xdAC17F958D2ee523a2206206994597C13D831ec7",
            ),
            ("LOG_FORMAT", "json"),
            ("METRICS_ADDR", "127.0.0.1:9000"),
        ])
        .unwrap();
        assert_eq!(config.evm_chain, "binance");
        assert_eq!(
            config.evm_supported_tokens,
            vec![
                "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
                "0xdac17f958d2ee523a2206206994597c13d831ec7"
            ]
        );
        assert_eq!(
            config.evm_rpc_auth_token.as_ref().unwrap().expose_secret(),
            "secret"
        );
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.metrics_addr, Some("127.0.0.1:9000".parse().unwrap()));
    }

    #[test]
    fn test_invalid_token_address() {
        let result = load(&[
            ("CHAIN_BACKEND", "evm-rpc"),
            ("EVM_RPC_URL", "http://localhost:8545"),
            ("DATABASE_URL", "postgres://localhost/bridge"),
            ("EVM_SUPPORTED_TOKENS", "0x123"),
        ]);
        assert!(matches!(result, Err(ConfigError::InvalidValue { key, .. }) if key == "EVM_SUPPORTED_TOKENS"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[
            ("CHAIN_BACKEND", "koios"),
            ("KOIOS_URL", "http://localhost:8080"),
            ("KOIOS_AUTH_TOKEN", "super-secret"),
        ])
        .unwrap();
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
