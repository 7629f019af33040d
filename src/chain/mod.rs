//! Chain gateway
//!
//! The only path from this crate to the SecureGames contract. Writes return a
//! transaction handle; reads fail softly and return `None` when the node does
//! not answer in time.

pub mod abi;
pub mod evm;
pub mod ledger;

pub use evm::EvmGateway;
pub use ledger::{InMemoryChain, LedgerGateway};

use crate::common::GameStatus;
use crate::errors::ChainError;
use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

/// Decoded `getGameDetails` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDetails {
    pub game_id: String,
    pub player: Address,
    pub amount: U256,
    pub status: GameStatus,
    pub block_number: u64,
    pub game_type: String,
    pub multiplier_percent: u64,
    pub exists: bool,
}

impl GameDetails {
    /// What the contract returns for an unknown id
    pub fn missing(game_id: &str) -> Self {
        Self {
            game_id: game_id.to_string(),
            player: Address::zero(),
            amount: U256::zero(),
            status: GameStatus::Pending,
            block_number: 0,
            game_type: String::new(),
            multiplier_percent: 0,
            exists: false,
        }
    }
}

/// Decoded `getUserStats` result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_bet: U256,
    pub total_won: U256,
    pub total_lost: U256,
    pub withdrawable_balance: U256,
    pub games_played: u64,
    pub games_won: u64,
    pub join_block: u64,
    pub join_timestamp: u64,
    pub last_play_block: u64,
    pub last_play_timestamp: u64,
}

/// Decoded `getContractStats` result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractStats {
    pub total_users: u64,
    pub total_bets: U256,
    pub total_winnings: U256,
    pub total_games: u64,
}

/// Handle of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    pub hash: H256,
}

impl PendingTx {
    pub fn hash_hex(&self) -> String {
        format!("{:#x}", self.hash)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub hash: H256,
    pub block_number: u64,
    pub success: bool,
}

/// Contract events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum ContractEvent {
    GameStarted {
        game_id: String,
        player: Address,
        amount: U256,
        game_type: String,
        block_number: u64,
    },
    GameResolved {
        game_id: String,
        player: Address,
        did_win: bool,
        amount: U256,
        winnings: U256,
        multiplier_percent: u64,
    },
}

#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Address that signs this gateway's transactions
    fn account(&self) -> Address;

    /// Submit `startGame` carrying `value` wei
    async fn start_game(&self, game_id: &str, game_type: &str, value: U256) -> Result<PendingTx, ChainError>;

    /// Receipt once the transaction is confirmed, `None` while it is not
    async fn confirmation(&self, tx: &PendingTx) -> Result<Option<TxReceipt>, ChainError>;

    /// Submit `resolveGame`; only the contract resolver may call it
    async fn resolve_game(&self, game_id: &str, did_win: bool, multiplier_percent: u64) -> Result<PendingTx, ChainError>;

    async fn withdraw(&self) -> Result<PendingTx, ChainError>;

    async fn get_game_details(&self, game_id: &str) -> Option<GameDetails>;

    async fn get_user_stats(&self, account: Address) -> Option<UserStats>;

    async fn get_contract_stats(&self) -> Option<ContractStats>;

    async fn get_resolver_account(&self) -> Result<Address, ChainError>;
}
