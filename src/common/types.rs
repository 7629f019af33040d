//! Shared type definitions for the bet lifecycle
//!
//! Canonical identifiers and enums used by the session, the chain gateway
//! and the resolver API.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Mines,
    /// Row-climb
    Paaji,
    Crash,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Mines => "mines",
            GameType::Paaji => "paaji",
            GameType::Crash => "crash",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mines" => Ok(GameType::Mines),
            "paaji" | "rows" | "row-climb" => Ok(GameType::Paaji),
            "crash" => Ok(GameType::Crash),
            other => Err(format!("unknown game type: {}", other)),
        }
    }
}

/// On-chain game status as stored by the contract (uint8)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Pending,
    Won,
    Lost,
}

impl GameStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(GameStatus::Pending),
            1 => Some(GameStatus::Won),
            2 => Some(GameStatus::Lost),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            GameStatus::Pending => 0,
            GameStatus::Won => 1,
            GameStatus::Lost => 2,
        }
    }
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Caller-chosen unique identifier of one wager
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `{type}-{unix_millis}-{9 base36 chars}`
    pub fn generate(game_type: GameType) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..9)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(format!(
            "{}-{}-{}",
            game_type,
            chrono::Utc::now().timestamp_millis(),
            suffix
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for GameId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_type_round_trip() {
        for game_type in [GameType::Mines, GameType::Paaji, GameType::Crash] {
            assert_eq!(game_type.to_string().parse::<GameType>().unwrap(), game_type);
        }
        assert_eq!(serde_json::to_string(&GameType::Paaji).unwrap(), "\"paaji\"");
        assert!("roulette".parse::<GameType>().is_err());
    }

    #[test]
    fn test_generated_game_id_format() {
        let id = GameId::generate(GameType::Mines);
        let parts: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "mines");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].bytes().all(|b| BASE36.contains(&b)));
        assert_ne!(id, GameId::generate(GameType::Mines));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(GameStatus::from_code(0), Some(GameStatus::Pending));
        assert_eq!(GameStatus::from_code(2), Some(GameStatus::Lost));
        assert_eq!(GameStatus::from_code(7), None);
        assert_eq!(GameStatus::Won.code(), 1);
    }
}
