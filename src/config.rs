//! Configuration management for the resolver service and bet clients
//!
//! TOML file, then environment overrides, then validation. The resolver
//! signing key never lives in the file; it is read from the environment only.

use crate::errors::{ConfigurationError, SecureGamesResult};
use crate::retry::RetryPolicy;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Primary key variable for the resolver signing key
pub const RESOLVER_KEY_ENV: &str = "RESOLVER_PRIVATE_KEY";
/// Fallback key variable
pub const FALLBACK_KEY_ENV: &str = "PRIVATE_KEY";

/// Which resolver implementation the server runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Fake transaction hashes, no chain access
    Mock,
    /// Signs and submits `resolveGame` on the configured chain
    Live,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Mock => write!(f, "mock"),
            Environment::Live => write!(f, "live"),
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Ok(Environment::Mock),
            "live" | "real" => Ok(Environment::Live),
            other => Err(ConfigurationError::InvalidValue {
                field: "resolver.environment".to_string(),
                value: other.to_string(),
                reason: "expected 'mock' or 'live'".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecureGamesConfig {
    pub chain: ChainConfig,
    pub resolver: ResolverConfig,
    pub api: ApiConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: String,
    /// Blocks on top of the receipt block before a transaction counts as confirmed
    pub confirmations: u64,
    pub read_timeout_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://forno.celo.org".to_string(),
            chain_id: 42220,
            contract_address: "0x61d11C622Bd98A71aD9361833379A2066Ad29CCa".to_string(),
            confirmations: 1,
            read_timeout_ms: 10_000,
        }
    }
}

impl ChainConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn contract(&self) -> Result<Address, ConfigurationError> {
        Address::from_str(&self.contract_address).map_err(|_| ConfigurationError::InvalidValue {
            field: "chain.contract_address".to_string(),
            value: self.contract_address.clone(),
            reason: "not a 20-byte hex address".to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub environment: Environment,
    /// Environment variable holding the signing key
    pub key_env: String,
    pub mock_delay_ms: u64,
    pub resolver_cache_ttl_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Mock,
            key_env: RESOLVER_KEY_ENV.to_string(),
            mock_delay_ms: 1_000,
            resolver_cache_ttl_secs: 300,
        }
    }
}

impl ResolverConfig {
    /// Read the signing key from `key_env`, falling back to `PRIVATE_KEY`.
    pub fn load_key(&self) -> Result<ResolverKey, ConfigurationError> {
        let raw = env::var(&self.key_env)
            .or_else(|_| env::var(FALLBACK_KEY_ENV))
            .map_err(|_| ConfigurationError::MissingRequired(self.key_env.clone()))?;
        ResolverKey::new(raw)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.resolver_cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub confirmation: RetryPolicy,
    pub resolution: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            confirmation: RetryPolicy::confirmation(),
            resolution: RetryPolicy::default(),
        }
    }
}

/// Resolver signing key. Never printed.
#[derive(Clone)]
pub struct ResolverKey(String);

impl ResolverKey {
    /// Accepts 64 hex chars with or without `0x`.
    pub fn new(raw: impl Into<String>) -> Result<Self, ConfigurationError> {
        let raw = raw.into();
        let trimmed = raw.trim().trim_start_matches("0x");
        if trimmed.len() != 64 {
            return Err(ConfigurationError::MalformedResolverKey(format!(
                "expected 64 hex characters, got {}",
                trimmed.len()
            )));
        }
        if hex::decode(trimmed).is_err() {
            return Err(ConfigurationError::MalformedResolverKey(
                "key contains non-hex characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn wallet(&self, chain_id: u64) -> Result<LocalWallet, ConfigurationError> {
        let wallet: LocalWallet = self.0.parse().map_err(|_| {
            ConfigurationError::MalformedResolverKey("not a valid secp256k1 scalar".to_string())
        })?;
        Ok(wallet.with_chain_id(chain_id))
    }

    /// EIP-55 address derived from the key
    pub fn address(&self) -> Result<String, ConfigurationError> {
        Ok(to_checksum(&self.wallet(1)?.address(), None))
    }
}

impl fmt::Debug for ResolverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResolverKey(<redacted>)")
    }
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> SecureGamesResult<SecureGamesConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            SecureGamesConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        // Live mode is useless without a key; refuse to start.
        if config.resolver.environment == Environment::Live {
            config.resolver.load_key()?;
        }

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> SecureGamesResult<SecureGamesConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut SecureGamesConfig) -> SecureGamesResult<()> {
        if let Ok(url) = env::var("SECUREGAMES_RPC_URL") {
            config.chain.rpc_url = url;
        }
        if let Ok(chain_id) = env::var("SECUREGAMES_CHAIN_ID") {
            config.chain.chain_id = chain_id.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "SECUREGAMES_CHAIN_ID".to_string(),
                value: chain_id,
                reason: "Invalid chain id".to_string(),
            })?;
        }
        if let Ok(address) = env::var("SECUREGAMES_CONTRACT_ADDRESS") {
            config.chain.contract_address = address;
        }
        if let Ok(environment) = env::var("SECUREGAMES_ENVIRONMENT") {
            config.resolver.environment = environment.parse()?;
        }
        if let Ok(host) = env::var("SECUREGAMES_API_HOST") {
            config.api.host = host;
        }
        if let Ok(port) = env::var("SECUREGAMES_API_PORT") {
            config.api.port = port.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "SECUREGAMES_API_PORT".to_string(),
                value: port,
                reason: "Invalid port number".to_string(),
            })?;
        }

        Ok(())
    }

    pub fn validate(&self, config: &SecureGamesConfig) -> SecureGamesResult<()> {
        if url::Url::parse(&config.chain.rpc_url).is_err() {
            return Err(ConfigurationError::InvalidValue {
                field: "chain.rpc_url".to_string(),
                value: config.chain.rpc_url.clone(),
                reason: "not a valid URL".to_string(),
            }
            .into());
        }

        if config.chain.chain_id == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "chain.chain_id".to_string(),
                value: "0".to_string(),
                reason: "Chain id cannot be zero".to_string(),
            }
            .into());
        }

        if config.resolver.environment == Environment::Live {
            config.chain.contract()?;
        }

        if config.chain.read_timeout_ms < 100 {
            return Err(ConfigurationError::InvalidValue {
                field: "chain.read_timeout_ms".to_string(),
                value: config.chain.read_timeout_ms.to_string(),
                reason: "Timeout must be at least 100ms".to_string(),
            }
            .into());
        }

        if config.api.port == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "api.port".to_string(),
                value: "0".to_string(),
                reason: "API port cannot be zero".to_string(),
            }
            .into());
        }

        for (field, policy) in [
            ("retry.confirmation", &config.retry.confirmation),
            ("retry.resolution", &config.retry.resolution),
        ] {
            if policy.max_attempts == 0 {
                return Err(ConfigurationError::InvalidValue {
                    field: format!("{}.max_attempts", field),
                    value: "0".to_string(),
                    reason: "At least one attempt is required".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    pub fn save(&self, config: &SecureGamesConfig, path: &str) -> SecureGamesResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> SecureGamesResult<()> {
    ConfigLoader::new().save(&SecureGamesConfig::default(), path)
}
