//! Resolver that signs and submits `resolveGame`

use super::{ResolutionReceipt, ResolveRequest, Resolver};
use crate::cache::TtlCache;
use crate::chain::ChainGateway;
use crate::config::Environment;
use crate::errors::{ChainError, ConfigurationError, ResolutionError};
use crate::retry::{poll_until, RetryPolicy};
use async_trait::async_trait;
use ethers::types::Address;
use ethers::utils::to_checksum;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct ChainResolver {
    gateway: Arc<dyn ChainGateway>,
    confirmation: RetryPolicy,
    /// Contract resolver address
    expected: TtlCache<(), Address>,
}

impl ChainResolver {
    pub fn new(gateway: Arc<dyn ChainGateway>, confirmation: RetryPolicy, cache_ttl: Duration) -> Self {
        Self {
            gateway,
            confirmation,
            expected: TtlCache::new(cache_ttl),
        }
    }

    async fn expected_resolver(&self) -> Result<Address, ResolutionError> {
        let gateway = &self.gateway;
        self.expected
            .get_or_try_fetch((), || gateway.get_resolver_account())
            .await
            .map_err(ResolutionError::Chain)
    }

    fn mismatch(&self, expected: Address) -> ResolutionError {
        let derived = to_checksum(&self.gateway.account(), None);
        let expected = to_checksum(&expected, None);
        error!(
            %derived,
            %expected,
            "❌ Resolver key mismatch: the configured key is not the contract resolver"
        );
        ConfigurationError::ResolverMismatch { derived, expected }.into()
    }
}

#[async_trait]
impl Resolver for ChainResolver {
    fn environment(&self) -> Environment {
        Environment::Live
    }

    fn signer(&self) -> Option<Address> {
        Some(self.gateway.account())
    }

    async fn verify(&self) -> Result<(), ResolutionError> {
        let expected = self.expected_resolver().await?;
        if expected != self.gateway.account() {
            return Err(self.mismatch(expected));
        }
        Ok(())
    }

    async fn resolve_game(&self, request: &ResolveRequest) -> Result<ResolutionReceipt, ResolutionError> {
        let multiplier_percent = request.multiplier_percent()?;
        self.verify().await?;

        info!(
            game_id = %request.game_id,
            did_win = request.did_win,
            multiplier_percent,
            "🎯 Resolving game"
        );

        let pending = match self
            .gateway
            .resolve_game(&request.game_id, request.did_win, multiplier_percent)
            .await
        {
            Ok(pending) => pending,
            Err(ChainError::OnlyResolver) => {
                // The resolver moved since we cached it
                self.expected.invalidate(&());
                let expected = self.expected_resolver().await?;
                return Err(self.mismatch(expected));
            }
            Err(e) => {
                warn!(game_id = %request.game_id, error = %e, "resolveGame rejected");
                return Err(e.into());
            }
        };

        let gateway = &self.gateway;
        let receipt = poll_until(&self.confirmation, "resolveGame confirmation", || {
            gateway.confirmation(&pending)
        })
        .await?;

        if !receipt.success {
            return Err(ChainError::Reverted(format!(
                "resolveGame transaction {} reverted",
                pending.hash_hex()
            ))
            .into());
        }

        info!(
            game_id = %request.game_id,
            tx_hash = %pending.hash_hex(),
            block_number = receipt.block_number,
            "✅ Game resolved"
        );

        Ok(ResolutionReceipt {
            transaction_hash: pending.hash_hex(),
            game_id: request.game_id.clone(),
            did_win: request.did_win,
            multiplier: request.multiplier,
            multiplier_percent,
            block_number: Some(receipt.block_number),
        })
    }
}
