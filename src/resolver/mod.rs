//! Resolver service
//!
//! Holds the resolver signing key and settles finished games on chain. The
//! implementation is picked once at startup from [`Environment`].

pub mod chain;
pub mod mock;

pub use chain::ChainResolver;
pub use mock::MockResolver;

use crate::chain::{ChainGateway, EvmGateway};
use crate::common::multiplier_to_percent;
use crate::config::{Environment, SecureGamesConfig};
use crate::errors::{ResolutionError, SecureGamesResult};
use async_trait::async_trait;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// One settlement request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub game_id: String,
    pub did_win: bool,
    pub multiplier: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
}

impl ResolveRequest {
    /// Validate and convert the multiplier to the contract's integer percent
    pub fn multiplier_percent(&self) -> Result<u64, ResolutionError> {
        if self.game_id.trim().is_empty() {
            return Err(ResolutionError::InvalidRequest("gameId required".to_string()));
        }
        multiplier_to_percent(self.multiplier).ok_or_else(|| {
            ResolutionError::InvalidRequest(format!(
                "multiplier must be a positive number, got {}",
                self.multiplier
            ))
        })
    }
}

/// Result of a confirmed settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReceipt {
    pub transaction_hash: String,
    pub game_id: String,
    pub did_win: bool,
    pub multiplier: f64,
    pub multiplier_percent: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait Resolver: Send + Sync {
    fn environment(&self) -> Environment;

    /// Address that signs `resolveGame`, when there is one
    fn signer(&self) -> Option<Address>;

    /// Settle one game and wait for the settlement to confirm
    async fn resolve_game(&self, request: &ResolveRequest) -> Result<ResolutionReceipt, ResolutionError>;

    /// Check that the signer is the contract's resolver
    async fn verify(&self) -> Result<(), ResolutionError> {
        Ok(())
    }
}

/// Resolver plus the gateway used for read endpoints
pub struct ResolverStack {
    pub resolver: Arc<dyn Resolver>,
    pub gateway: Option<Arc<dyn ChainGateway>>,
}

/// Build the resolver selected by `config.resolver.environment`.
///
/// Live mode fails here when the key is missing or malformed.
pub fn build(config: &SecureGamesConfig) -> SecureGamesResult<ResolverStack> {
    match config.resolver.environment {
        Environment::Mock => {
            info!("🧪 Mock resolver: settlements are simulated, nothing is sent on chain");
            Ok(ResolverStack {
                resolver: Arc::new(MockResolver::new(Duration::from_millis(config.resolver.mock_delay_ms))),
                gateway: None,
            })
        }
        Environment::Live => {
            let key = config.resolver.load_key()?;
            let gateway: Arc<dyn ChainGateway> = Arc::new(EvmGateway::connect(&config.chain, &key)?);
            let resolver = ChainResolver::new(
                Arc::clone(&gateway),
                config.retry.confirmation,
                config.resolver.cache_ttl(),
            );
            Ok(ResolverStack {
                resolver: Arc::new(resolver),
                gateway: Some(gateway),
            })
        }
    }
}
