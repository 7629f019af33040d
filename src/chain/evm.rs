//! JSON-RPC gateway backed by ethers
//!
//! Writes go through a `SignerMiddleware` so the configured key signs locally.
//! Reads are bounded by `read_timeout` and degrade to `None`.

use super::abi::SecureGamesContract;
use super::{ChainGateway, ContractStats, GameDetails, PendingTx, TxReceipt, UserStats};
use crate::config::{ChainConfig, ResolverKey};
use crate::errors::{ChainError, ConfigurationError};
use async_trait::async_trait;
use ethers::contract::ContractError;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256, U64};
use ethers::utils::to_checksum;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type SignedClient = SignerMiddleware<Provider<Http>, LocalWallet>;

pub struct EvmGateway {
    contract: SecureGamesContract<SignedClient>,
    provider: Provider<Http>,
    account: Address,
    confirmations: u64,
    read_timeout: Duration,
}

impl EvmGateway {
    /// Build a gateway signing with `key`. Nothing is sent until the first call.
    pub fn connect(chain: &ChainConfig, key: &ResolverKey) -> Result<Self, ConfigurationError> {
        let provider = Provider::<Http>::try_from(chain.rpc_url.as_str()).map_err(|e| {
            ConfigurationError::InvalidValue {
                field: "chain.rpc_url".to_string(),
                value: chain.rpc_url.clone(),
                reason: e.to_string(),
            }
        })?;

        let wallet = key.wallet(chain.chain_id)?;
        let account = wallet.address();
        let address = chain.contract()?;

        let client = SignerMiddleware::new(provider.clone(), wallet);
        let contract = SecureGamesContract::new(address, Arc::new(client));

        info!(
            signer = %to_checksum(&account, None),
            contract = %to_checksum(&address, None),
            chain_id = chain.chain_id,
            "EVM gateway ready"
        );

        Ok(Self {
            contract,
            provider,
            account,
            confirmations: chain.confirmations.max(1),
            read_timeout: chain.read_timeout(),
        })
    }

    async fn read<T, E, F>(&self, what: &str, call: F) -> Option<T>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.read_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(what, error = %e, "Chain read failed");
                None
            }
            Err(_) => {
                warn!(what, timeout_ms = self.read_timeout.as_millis() as u64, "Chain read timed out");
                None
            }
        }
    }
}

/// Map a contract call failure onto the revert taxonomy
fn classify_contract_error(err: ContractError<SignedClient>, game_id: &str) -> ChainError {
    if let Some(reason) = err.decode_revert::<String>() {
        return ChainError::classify(&format!("execution reverted: {}", reason), game_id);
    }
    ChainError::classify(&err.to_string(), game_id)
}

#[async_trait]
impl ChainGateway for EvmGateway {
    fn account(&self) -> Address {
        self.account
    }

    async fn start_game(&self, game_id: &str, game_type: &str, value: U256) -> Result<PendingTx, ChainError> {
        let call = self
            .contract
            .start_game(game_id.to_string(), game_type.to_string())
            .value(value);
        let pending = call
            .send()
            .await
            .map_err(|e| classify_contract_error(e, game_id))?;
        let tx = PendingTx {
            hash: pending.tx_hash(),
        };
        info!(game_id, game_type, tx_hash = %tx.hash_hex(), "startGame submitted");
        Ok(tx)
    }

    async fn confirmation(&self, tx: &PendingTx) -> Result<Option<TxReceipt>, ChainError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx.hash)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        let Some(receipt) = receipt else {
            return Ok(None);
        };
        let Some(block_number) = receipt.block_number.map(|n| n.as_u64()) else {
            return Ok(None);
        };

        let latest = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .as_u64();
        if latest.saturating_add(1) < block_number.saturating_add(self.confirmations) {
            debug!(tx_hash = %tx.hash_hex(), block_number, latest, "Awaiting confirmations");
            return Ok(None);
        }

        Ok(Some(TxReceipt {
            hash: tx.hash,
            block_number,
            success: receipt.status != Some(U64::zero()),
        }))
    }

    async fn resolve_game(&self, game_id: &str, did_win: bool, multiplier_percent: u64) -> Result<PendingTx, ChainError> {
        let call = self
            .contract
            .resolve_game(game_id.to_string(), did_win, U256::from(multiplier_percent));
        let pending = call
            .send()
            .await
            .map_err(|e| classify_contract_error(e, game_id))?;
        let tx = PendingTx {
            hash: pending.tx_hash(),
        };
        info!(game_id, did_win, multiplier_percent, tx_hash = %tx.hash_hex(), "resolveGame submitted");
        Ok(tx)
    }

    async fn withdraw(&self) -> Result<PendingTx, ChainError> {
        let call = self.contract.withdraw();
        let pending = call
            .send()
            .await
            .map_err(|e| classify_contract_error(e, ""))?;
        Ok(PendingTx {
            hash: pending.tx_hash(),
        })
    }

    async fn get_game_details(&self, game_id: &str) -> Option<GameDetails> {
        let call = self.contract.get_game_details(game_id.to_string());
        self.read("getGameDetails", call.call()).await.map(GameDetails::from)
    }

    async fn get_user_stats(&self, account: Address) -> Option<UserStats> {
        let call = self.contract.get_user_stats(account);
        self.read("getUserStats", call.call()).await.map(UserStats::from)
    }

    async fn get_contract_stats(&self) -> Option<ContractStats> {
        let call = self.contract.get_contract_stats();
        self.read("getContractStats", call.call()).await.map(ContractStats::from)
    }

    async fn get_resolver_account(&self) -> Result<Address, ChainError> {
        let call = self.contract.get_resolver_account();
        match tokio::time::timeout(self.read_timeout, call.call()).await {
            Ok(result) => result.map_err(|e| ChainError::Rpc(e.to_string())),
            Err(_) => Err(ChainError::Timeout {
                what: "getResolverAccount".to_string(),
                timeout_ms: self.read_timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn gateway_at(rpc_url: String) -> EvmGateway {
        let chain = ChainConfig {
            rpc_url,
            read_timeout_ms: 300,
            ..ChainConfig::default()
        };
        EvmGateway::connect(&chain, &ResolverKey::new(TEST_KEY).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_reads_return_none_when_node_is_down() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gateway = gateway_at(format!("http://{}", addr));
        assert!(gateway.get_user_stats(Address::repeat_byte(0x01)).await.is_none());
        assert!(gateway.get_game_details("g1").await.is_none());
        assert!(gateway.get_contract_stats().await.is_none());
        assert!(matches!(
            gateway.get_resolver_account().await,
            Err(ChainError::Rpc(_))
        ));
    }

    #[tokio::test]
    async fn test_reads_return_none_on_timeout() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let gateway = gateway_at(format!("http://{}", addr));
        assert!(gateway.get_user_stats(Address::repeat_byte(0x01)).await.is_none());
        assert!(gateway.get_game_details("g1").await.is_none());
        assert!(matches!(
            gateway.get_resolver_account().await,
            Err(ChainError::Timeout { .. })
        ));
        drop(listener);
    }

    #[test]
    fn test_signer_is_derived_from_key() {
        let gateway = gateway_at("http://127.0.0.1:8545".to_string());
        let expected = ResolverKey::new(TEST_KEY).unwrap().wallet(42220).unwrap().address();
        assert_eq!(gateway.account(), expected);
    }
}
