//! API Request and Response Models

use crate::chain::{ContractStats, GameDetails, UserStats};
use crate::common::{from_wei, GameStatus};
use chrono::{DateTime, Utc};
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};

/// Body of `POST /resolve-game`.
///
/// Fields are optional so a missing one can be reported by name instead of
/// as a generic deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveGameRequest {
    pub game_id: Option<String>,
    pub did_win: Option<bool>,
    pub multiplier: Option<f64>,
    pub game_type: Option<String>,
    pub player: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveGameResponse {
    pub success: bool,
    pub transaction_hash: String,
    pub game_id: String,
    pub did_win: bool,
    pub multiplier: f64,
    pub multiplier_percent: u64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub environment: String,
    /// Checksummed resolver signer, absent in mock mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver_address: Option<String>,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Game record with amounts in native units
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    pub game_id: String,
    pub player: String,
    pub amount: f64,
    pub amount_wei: String,
    pub status: GameStatus,
    pub block_number: u64,
    pub game_type: String,
    pub multiplier_percent: u64,
}

impl From<GameDetails> for GameResponse {
    fn from(game: GameDetails) -> Self {
        Self {
            game_id: game.game_id,
            player: to_checksum(&game.player, None),
            amount: from_wei(game.amount),
            amount_wei: game.amount.to_string(),
            status: game.status,
            block_number: game.block_number,
            game_type: game.game_type,
            multiplier_percent: game.multiplier_percent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub address: String,
    pub total_bet: f64,
    pub total_won: f64,
    pub total_lost: f64,
    pub withdrawable_balance: f64,
    pub games_played: u64,
    pub games_won: u64,
    pub join_block: u64,
    pub join_timestamp: u64,
    pub last_play_block: u64,
    pub last_play_timestamp: u64,
}

impl UserStatsResponse {
    pub fn new(address: String, stats: UserStats) -> Self {
        Self {
            address,
            total_bet: from_wei(stats.total_bet),
            total_won: from_wei(stats.total_won),
            total_lost: from_wei(stats.total_lost),
            withdrawable_balance: from_wei(stats.withdrawable_balance),
            games_played: stats.games_played,
            games_won: stats.games_won,
            join_block: stats.join_block,
            join_timestamp: stats.join_timestamp,
            last_play_block: stats.last_play_block,
            last_play_timestamp: stats.last_play_timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractStatsResponse {
    pub total_users: u64,
    pub total_bets: f64,
    pub total_winnings: f64,
    pub total_games: u64,
}

impl From<ContractStats> for ContractStatsResponse {
    fn from(stats: ContractStats) -> Self {
        Self {
            total_users: stats.total_users,
            total_bets: from_wei(stats.total_bets),
            total_winnings: from_wei(stats.total_winnings),
            total_games: stats.total_games,
        }
    }
}
