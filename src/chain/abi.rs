//! SecureGames contract bindings
//!
//! Tuples returned by view functions are decoded here, once, into the named
//! structs the rest of the crate uses.

use super::{ContractStats, GameDetails, UserStats};
use crate::common::units::to_u64;
use crate::common::GameStatus;
use ethers::contract::abigen;
use ethers::types::{Address, U256};

abigen!(
    SecureGamesContract,
    r#"[
        function startGame(string gameId, string gameType) external payable
        function resolveGame(string gameId, bool didWin, uint256 multiplierPercent) external
        function getGameDetails(string gameId) external view returns (string, address, uint256, uint8, uint256, string, uint256, bool)
        function getUserStats(address user) external view returns (uint256, uint256, uint256, uint256, uint256, uint256, uint256, uint256, uint256, uint256)
        function getContractStats() external view returns (uint256, uint256, uint256, uint256)
        function getResolverAccount() external view returns (address)
        function withdraw() external
        event GameStarted(string gameId, address indexed player, uint256 amount, string gameType, uint256 blockNumber)
        event GameResolved(string gameId, address indexed player, bool didWin, uint256 amount, uint256 winnings, uint256 multiplierPercent)
    ]"#
);

pub type GameDetailsTuple = (String, Address, U256, u8, U256, String, U256, bool);
pub type UserStatsTuple = (U256, U256, U256, U256, U256, U256, U256, U256, U256, U256);
pub type ContractStatsTuple = (U256, U256, U256, U256);

impl From<GameDetailsTuple> for GameDetails {
    fn from(t: GameDetailsTuple) -> Self {
        let (game_id, player, amount, status, block_number, game_type, multiplier_percent, exists) = t;
        Self {
            game_id,
            player,
            amount,
            // Unknown codes only appear on zeroed records
            status: GameStatus::from_code(status).unwrap_or(GameStatus::Pending),
            block_number: to_u64(block_number),
            game_type,
            multiplier_percent: to_u64(multiplier_percent),
            exists,
        }
    }
}

impl From<UserStatsTuple> for UserStats {
    fn from(t: UserStatsTuple) -> Self {
        Self {
            total_bet: t.0,
            total_won: t.1,
            total_lost: t.2,
            withdrawable_balance: t.3,
            games_played: to_u64(t.4),
            games_won: to_u64(t.5),
            join_block: to_u64(t.6),
            join_timestamp: to_u64(t.7),
            last_play_block: to_u64(t.8),
            last_play_timestamp: to_u64(t.9),
        }
    }
}

impl From<ContractStatsTuple> for ContractStats {
    fn from(t: ContractStatsTuple) -> Self {
        Self {
            total_users: to_u64(t.0),
            total_bets: t.1,
            total_winnings: t.2,
            total_games: to_u64(t.3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_game_details() {
        let player = Address::repeat_byte(0x11);
        let details = GameDetails::from((
            "g1".to_string(),
            player,
            U256::from(100u64),
            1u8,
            U256::from(42u64),
            "mines".to_string(),
            U256::from(152u64),
            true,
        ));
        assert_eq!(details.status, GameStatus::Won);
        assert_eq!(details.block_number, 42);
        assert_eq!(details.multiplier_percent, 152);
        assert_eq!(details.player, player);
        assert!(details.exists);
    }

    #[test]
    fn test_decode_stats() {
        fn w(v: u64) -> U256 {
            U256::from(v)
        }
        let stats = UserStats::from((w(10), w(5), w(3), w(5), w(4), w(1), w(7), w(1_700_000_000), w(9), w(1_700_000_100)));
        assert_eq!(stats.withdrawable_balance, w(5));
        assert_eq!(stats.games_played, 4);
        assert_eq!(stats.join_block, 7);
        assert_eq!(stats.last_play_timestamp, 1_700_000_100);

        let contract = ContractStats::from((w(2), w(30), w(12), w(6)));
        assert_eq!(contract.total_users, 2);
        assert_eq!(contract.total_games, 6);
        assert_eq!(contract.total_winnings, w(12));
    }
}
