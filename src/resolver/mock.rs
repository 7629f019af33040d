//! Mock resolver for local development
//!
//! Produces `mock-tx-*` hashes after a fixed delay. Settles each gameId at
//! most once, like the contract.

use super::{ResolutionReceipt, ResolveRequest, Resolver};
use crate::config::Environment;
use crate::errors::{ChainError, ResolutionError};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ethers::types::Address;
use rand::Rng;
use std::time::Duration;
use tracing::info;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub struct MockResolver {
    delay: Duration,
    settled: DashMap<String, ResolutionReceipt>,
}

impl MockResolver {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            settled: DashMap::new(),
        }
    }

    pub fn settled(&self, game_id: &str) -> Option<ResolutionReceipt> {
        self.settled.get(game_id).map(|r| r.clone())
    }

    fn mock_hash() -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..9)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        format!("mock-tx-{}-{}", chrono::Utc::now().timestamp_millis(), suffix)
    }
}

#[async_trait]
impl Resolver for MockResolver {
    fn environment(&self) -> Environment {
        Environment::Mock
    }

    fn signer(&self) -> Option<Address> {
        None
    }

    async fn resolve_game(&self, request: &ResolveRequest) -> Result<ResolutionReceipt, ResolutionError> {
        let multiplier_percent = request.multiplier_percent()?;
        if self.settled.contains_key(&request.game_id) {
            return Err(ChainError::AlreadyResolved(request.game_id.clone()).into());
        }

        tokio::time::sleep(self.delay).await;

        let receipt = ResolutionReceipt {
            transaction_hash: Self::mock_hash(),
            game_id: request.game_id.clone(),
            did_win: request.did_win,
            multiplier: request.multiplier,
            multiplier_percent,
            block_number: None,
        };

        // Two concurrent calls may both pass the first check; only one wins here.
        match self.settled.entry(request.game_id.clone()) {
            Entry::Occupied(_) => Err(ChainError::AlreadyResolved(request.game_id.clone()).into()),
            Entry::Vacant(slot) => {
                slot.insert(receipt.clone());
                info!(
                    game_id = %request.game_id,
                    tx_hash = %receipt.transaction_hash,
                    "🧪 Mock resolution"
                );
                Ok(receipt)
            }
        }
    }
}
