//! Error types for the SecureGames bet lifecycle
//!
//! Every error carries an [`ErrorCategory`] so callers can decide between
//! "fix the input", "try again" and "call an operator" without string matching.

use crate::session::SessionStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification shared by every error in the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rejected locally before any network call
    UserInput,
    /// Wallet declined or could not sign
    Wallet,
    /// Contract reverted; retrying with the same gameId will not help
    Chain,
    /// Resolver key missing, malformed or not the contract resolver
    Configuration,
    /// RPC timeout or HTTP failure
    Transient,
}

impl ErrorCategory {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Wallet | ErrorCategory::Transient)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::UserInput => write!(f, "user_input"),
            ErrorCategory::Wallet => write!(f, "wallet"),
            ErrorCategory::Chain => write!(f, "chain"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Transient => write!(f, "transient"),
        }
    }
}

/// Root error type for binaries and configuration loading
#[derive(Debug, thiserror::Error)]
pub enum SecureGamesError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Bet error: {0}")]
    Bet(#[from] BetError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Missing required setting: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue { field: String, value: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    /// The reason never contains key material
    #[error("Malformed resolver key: {0}")]
    MalformedResolverKey(String),

    #[error("Resolver key mismatch: configured key derives {derived} but the contract resolver is {expected}")]
    ResolverMismatch { derived: String, expected: String },
}

/// Errors surfaced by the chain gateway, classified from revert reasons
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("Transaction rejected in wallet: {0}")]
    Rejected(String),

    #[error("Insufficient balance to cover the stake and gas")]
    InsufficientBalance,

    #[error("gameId already exists: {0}")]
    DuplicateGameId(String),

    #[error("Player already has a pending bet")]
    PendingBetExists,

    #[error("Only resolver can call this")]
    OnlyResolver,

    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("Game already resolved: {0}")]
    AlreadyResolved(String),

    #[error("Nothing to withdraw")]
    NothingToWithdraw,

    #[error("Contract reverted: {0}")]
    Reverted(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },
}

impl ChainError {
    /// Classify a provider or contract error message.
    ///
    /// `game_id` is attached to variants that name the game.
    pub fn classify(message: &str, game_id: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("user closed the window")
            || lower.contains("user rejected")
            || lower.contains("user denied")
        {
            ChainError::Rejected(message.to_string())
        } else if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
            ChainError::InsufficientBalance
        } else if lower.contains("gameid already exists") {
            ChainError::DuplicateGameId(game_id.to_string())
        } else if lower.contains("already have a pending bet") {
            ChainError::PendingBetExists
        } else if lower.contains("only resolver") {
            ChainError::OnlyResolver
        } else if lower.contains("game not found") {
            ChainError::GameNotFound(game_id.to_string())
        } else if lower.contains("game already resolved") {
            ChainError::AlreadyResolved(game_id.to_string())
        } else if lower.contains("nothing to withdraw") {
            ChainError::NothingToWithdraw
        } else if lower.contains("revert") {
            ChainError::Reverted(revert_reason(message))
        } else {
            ChainError::Rpc(message.to_string())
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ChainError::Rejected(_) => ErrorCategory::Wallet,
            ChainError::Rpc(_) | ChainError::Timeout { .. } => ErrorCategory::Transient,
            ChainError::OnlyResolver => ErrorCategory::Configuration,
            _ => ErrorCategory::Chain,
        }
    }
}

/// Extract the human part of "execution reverted: <reason>"
fn revert_reason(message: &str) -> String {
    match message.find("reverted:") {
        Some(idx) => message[idx + "reverted:".len()..].trim().to_string(),
        None => message.to_string(),
    }
}

/// Rule violations inside a round
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Mine count {0} is out of range (1-24)")]
    InvalidMineCount(u8),

    #[error("Cell {cell} is out of range (0-{max})")]
    CellOutOfRange { cell: usize, max: usize },

    #[error("Cell {0} is already revealed")]
    AlreadyRevealed(usize),

    #[error("Round is already over")]
    RoundOver,

    #[error("Action does not apply to a {0} round")]
    WrongGame(String),
}

/// Errors raised by [`crate::session::BetSession`]
#[derive(Debug, thiserror::Error)]
pub enum BetError {
    #[error("Invalid bet amount {amount}: minimum stake is {minimum}")]
    InvalidBetAmount { amount: f64, minimum: f64 },

    #[error("gameId required")]
    MissingGameId,

    /// The previous game's settlement failed and must be retried first
    #[error("Game {game_id} is not settled yet; retry its resolution first")]
    UnsettledGame { game_id: String },

    #[error("Cannot {action} while the session is {status}")]
    InvalidTransition {
        action: &'static str,
        status: SessionStatus,
    },

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl BetError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BetError::InvalidBetAmount { .. }
            | BetError::MissingGameId
            | BetError::UnsettledGame { .. }
            | BetError::InvalidTransition { .. }
            | BetError::Game(_) => ErrorCategory::UserInput,
            BetError::Chain(e) => e.category(),
            BetError::Resolution(e) => e.category(),
        }
    }

    /// Message suitable for display next to the bet controls
    pub fn user_message(&self) -> String {
        match self {
            BetError::InvalidBetAmount { minimum, .. } => {
                format!("Minimum bet amount is {}", minimum)
            }
            BetError::Chain(ChainError::Rejected(_)) => {
                "Transaction cancelled. Please try again when ready.".to_string()
            }
            BetError::Chain(ChainError::InsufficientBalance) => {
                "Insufficient balance. Please add more funds to your wallet.".to_string()
            }
            BetError::Chain(ChainError::PendingBetExists) => {
                "You already have a pending bet. Please wait for it to be resolved.".to_string()
            }
            BetError::Chain(ChainError::Rpc(_)) | BetError::Chain(ChainError::Timeout { .. }) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            BetError::UnsettledGame { .. } => {
                "Your last game has not been settled yet. Retry the settlement before placing a new bet.".to_string()
            }
            BetError::Resolution(e) => format!("Failed to resolve game: {}", e),
            other => other.to_string(),
        }
    }
}

/// Failures while settling a finished game
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolutionError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Failure reported by a remote resolver service. `code` is the body's
    /// `error` field when the body was JSON.
    #[error("{message}")]
    Service {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Resolver unreachable: {0}")]
    Network(String),
}

impl ResolutionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ResolutionError::InvalidRequest(_) => ErrorCategory::UserInput,
            ResolutionError::Configuration(_) => ErrorCategory::Configuration,
            ResolutionError::Chain(e) => e.category(),
            ResolutionError::Service { status, code, .. } => match (status, code.as_deref()) {
                (403, _) | (_, Some("configuration_error" | "resolver_mismatch")) => ErrorCategory::Configuration,
                (400, _) => ErrorCategory::UserInput,
                // A 2xx that failed to decode may still have settled on chain
                (200..=299 | 408 | 429 | 500..=599, _) => ErrorCategory::Transient,
                _ => ErrorCategory::Chain,
            },
            ResolutionError::Network(_) => ErrorCategory::Transient,
        }
    }

    /// True when the game was already settled by an earlier call
    pub fn is_already_resolved(&self) -> bool {
        matches!(
            self,
            ResolutionError::Chain(ChainError::AlreadyResolved(_))
                | ResolutionError::Service { status: 409, .. }
        )
    }

    pub fn is_resolver_mismatch(&self) -> bool {
        matches!(
            self,
            ResolutionError::Configuration(ConfigurationError::ResolverMismatch { .. })
                | ResolutionError::Service { status: 403, .. }
        )
    }
}

pub type SecureGamesResult<T> = Result<T, SecureGamesError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_revert_classification() {
        assert_eq!(
            ChainError::classify("execution reverted: gameId already exists", "g1"),
            ChainError::DuplicateGameId("g1".to_string())
        );
        assert_eq!(
            ChainError::classify("execution reverted: You already have a pending bet", "g1"),
            ChainError::PendingBetExists
        );
        assert_eq!(
            ChainError::classify("execution reverted: Only resolver can call this", "g1"),
            ChainError::OnlyResolver
        );
        assert_eq!(
            ChainError::classify("execution reverted: Game already resolved", "g1"),
            ChainError::AlreadyResolved("g1".to_string())
        );
        assert_eq!(
            ChainError::classify("execution reverted: Attach ETH to play", "g1"),
            ChainError::Reverted("Attach ETH to play".to_string())
        );
    }

    #[test]
    fn test_wallet_and_balance_classification() {
        assert!(matches!(
            ChainError::classify("User closed the window", "g1"),
            ChainError::Rejected(_)
        ));
        assert_eq!(
            ChainError::classify("insufficient funds for gas * price + value", "g1"),
            ChainError::InsufficientBalance
        );
        assert!(matches!(
            ChainError::classify("connection refused", "g1"),
            ChainError::Rpc(_)
        ));
    }

    #[test]
    fn test_categories() {
        assert_eq!(ChainError::Rejected("x".into()).category(), ErrorCategory::Wallet);
        assert_eq!(ChainError::Rpc("x".into()).category(), ErrorCategory::Transient);
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(!ErrorCategory::Chain.is_retryable());

        let err = BetError::InvalidBetAmount { amount: 0.001, minimum: 0.01 };
        assert_eq!(err.category(), ErrorCategory::UserInput);
        assert_eq!(err.user_message(), "Minimum bet amount is 0.01");
    }

    fn service(status: u16, code: Option<&str>) -> ResolutionError {
        ResolutionError::Service {
            status,
            code: code.map(str::to_string),
            message: "x".to_string(),
        }
    }

    #[test]
    fn test_service_categories() {
        assert_eq!(service(403, None).category(), ErrorCategory::Configuration);
        assert_eq!(
            service(500, Some("configuration_error")).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(service(500, None).category(), ErrorCategory::Transient);
        assert_eq!(service(500, Some("internal")).category(), ErrorCategory::Transient);
        assert_eq!(service(200, None).category(), ErrorCategory::Transient);
        assert_eq!(service(503, None).category(), ErrorCategory::Transient);
        assert_eq!(service(400, Some("bad_request")).category(), ErrorCategory::UserInput);
        assert_eq!(service(409, Some("already_resolved")).category(), ErrorCategory::Chain);
        assert_eq!(service(422, None).category(), ErrorCategory::Chain);
        assert!(service(409, None).is_already_resolved());
    }

    #[test]
    fn test_mismatch_names_both_addresses() {
        let err = ConfigurationError::ResolverMismatch {
            derived: "0xAAA".to_string(),
            expected: "0xBBB".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("0xAAA"));
        assert!(text.contains("0xBBB"));
        assert!(ResolutionError::from(err).is_resolver_mismatch());
    }

    #[test]
    fn test_error_source() {
        let root: SecureGamesError = ConfigurationError::MissingRequired("RESOLVER_PRIVATE_KEY".into()).into();
        assert!(root.to_string().contains("Configuration error"));
        assert!(root.source().is_some());
    }
}
