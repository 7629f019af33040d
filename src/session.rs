//! Bet session state machine
//!
//! One session tracks one wager:
//!
//! ```text
//! idle -> pending -> confirming -> in-progress -> {won | lost | cashed-out} -> idle
//! ```
//!
//! Gameplay is only dealt after the `startGame` transaction confirms, so a
//! round can never be resolved for a stake that was not escrowed. A terminal
//! round triggers exactly one resolution request.

use crate::chain::{ChainGateway, PendingTx};
use crate::common::{to_wei, GameId, GameType, MIN_BET};
use crate::errors::{BetError, ChainError, GameError, ResolutionError};
use crate::games::mines::{MAX_MINES, MIN_MINES};
use crate::games::{
    ActiveRound, Climb, CrashTick, DrawSource, GameSetup, Outcome, Reveal, RngDraws,
};
use crate::resolution::{OutcomeReport, Resolution};
use crate::retry::{poll_until, RetryPolicy};
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Idle,
    /// `startGame` submitted, no hash yet
    Pending,
    /// Hash known, waiting for confirmation
    Confirming,
    InProgress,
    Won,
    Lost,
    CashedOut,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Won | SessionStatus::Lost | SessionStatus::CashedOut)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, SessionStatus::Pending | SessionStatus::Confirming)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Pending => "pending",
            SessionStatus::Confirming => "confirming",
            SessionStatus::InProgress => "in-progress",
            SessionStatus::Won => "won",
            SessionStatus::Lost => "lost",
            SessionStatus::CashedOut => "cashed-out",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the settlement of a finished round stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResolutionState {
    NotRequested,
    /// `transaction_hash` is `None` when an earlier request settled the game
    Settled { transaction_hash: Option<String> },
    Failed { reason: String },
}

/// Serializable view of a session for the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub game_id: Option<GameId>,
    pub bet_amount: f64,
    pub game_type: Option<GameType>,
    pub status: SessionStatus,
    pub start_tx_hash: Option<String>,
    pub resolve_tx_hash: Option<String>,
    pub multiplier: Option<f64>,
    pub outcome: Option<Outcome>,
    pub resolution: ResolutionState,
    pub is_busy: bool,
}

pub struct BetSession {
    chain: Arc<dyn ChainGateway>,
    resolution: Arc<dyn Resolution>,
    draws: Box<dyn DrawSource>,
    confirmation: RetryPolicy,

    game_id: Option<GameId>,
    bet_amount: f64,
    game_type: Option<GameType>,
    status: SessionStatus,
    start_tx_hash: Option<String>,
    resolve_tx_hash: Option<String>,
    round: Option<ActiveRound>,
    outcome: Option<Outcome>,
    resolution_state: ResolutionState,
}

impl BetSession {
    pub fn new(chain: Arc<dyn ChainGateway>, resolution: Arc<dyn Resolution>) -> Self {
        Self {
            chain,
            resolution,
            draws: Box::new(RngDraws::from_entropy()),
            confirmation: RetryPolicy::confirmation(),
            game_id: None,
            bet_amount: 0.0,
            game_type: None,
            status: SessionStatus::Idle,
            start_tx_hash: None,
            resolve_tx_hash: None,
            round: None,
            outcome: None,
            resolution_state: ResolutionState::NotRequested,
        }
    }

    /// Replace the random source rounds are dealt from
    pub fn with_draws(mut self, draws: impl DrawSource + 'static) -> Self {
        self.draws = Box::new(draws);
        self
    }

    pub fn with_confirmation_policy(mut self, policy: RetryPolicy) -> Self {
        self.confirmation = policy;
        self
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn game_id(&self) -> Option<&GameId> {
        self.game_id.as_ref()
    }

    pub fn bet_amount(&self) -> f64 {
        self.bet_amount
    }

    pub fn round(&self) -> Option<&ActiveRound> {
        self.round.as_ref()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn start_tx_hash(&self) -> Option<&str> {
        self.start_tx_hash.as_deref()
    }

    pub fn resolve_tx_hash(&self) -> Option<&str> {
        self.resolve_tx_hash.as_deref()
    }

    pub fn resolution_state(&self) -> &ResolutionState {
        &self.resolution_state
    }

    /// True while a start transaction is in flight
    pub fn is_busy(&self) -> bool {
        self.status.is_busy()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            game_id: self.game_id.clone(),
            bet_amount: self.bet_amount,
            game_type: self.game_type,
            status: self.status,
            start_tx_hash: self.start_tx_hash.clone(),
            resolve_tx_hash: self.resolve_tx_hash.clone(),
            multiplier: self.round.as_ref().map(ActiveRound::multiplier),
            outcome: self.outcome,
            resolution: self.resolution_state.clone(),
            is_busy: self.is_busy(),
        }
    }

    /// Place a bet and wait until the stake is escrowed.
    ///
    /// Everything is validated before the chain is touched. Any failure after
    /// that returns the session to `idle`. Returns the start transaction hash.
    pub async fn start(&mut self, game_id: GameId, bet_amount: f64, setup: GameSetup) -> Result<String, BetError> {
        if !(self.status == SessionStatus::Idle || self.status.is_terminal()) {
            return Err(BetError::InvalidTransition {
                action: "start a bet",
                status: self.status,
            });
        }
        self.ensure_settled()?;
        if !bet_amount.is_finite() || bet_amount <= 0.0 || bet_amount < MIN_BET {
            return Err(BetError::InvalidBetAmount {
                amount: bet_amount,
                minimum: MIN_BET,
            });
        }
        if game_id.is_empty() {
            return Err(BetError::MissingGameId);
        }
        if let GameSetup::Mines { mine_count } = setup {
            if !(MIN_MINES..=MAX_MINES).contains(&mine_count) {
                return Err(GameError::InvalidMineCount(mine_count).into());
            }
        }
        let value = to_wei(bet_amount).ok_or(BetError::InvalidBetAmount {
            amount: bet_amount,
            minimum: MIN_BET,
        })?;

        self.clear();
        let game_type = setup.game_type();
        self.game_id = Some(game_id.clone());
        self.bet_amount = bet_amount;
        self.game_type = Some(game_type);
        self.status = SessionStatus::Pending;

        info!(game_id = %game_id, bet_amount, game_type = %game_type, "🎲 Placing bet");

        let pending = match self.chain.start_game(game_id.as_str(), game_type.as_str(), value).await {
            Ok(pending) => pending,
            Err(e) => return Err(self.abandon(e)),
        };
        self.start_tx_hash = Some(pending.hash_hex());
        self.status = SessionStatus::Confirming;

        let receipt = match self.await_confirmation(&pending).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.abandon(e)),
        };
        if !receipt.success {
            let reverted = ChainError::Reverted(format!("startGame transaction {} reverted", pending.hash_hex()));
            return Err(self.abandon(reverted));
        }

        self.round = Some(ActiveRound::deal(setup, &mut *self.draws)?);
        self.status = SessionStatus::InProgress;
        info!(
            game_id = %game_id,
            tx_hash = %pending.hash_hex(),
            block_number = receipt.block_number,
            "✅ Bet confirmed, round dealt"
        );
        Ok(pending.hash_hex())
    }

    async fn await_confirmation(&self, pending: &PendingTx) -> Result<crate::chain::TxReceipt, ChainError> {
        let chain = &self.chain;
        poll_until(&self.confirmation, "startGame confirmation", || chain.confirmation(pending)).await
    }

    /// Reveal one mines cell
    pub async fn pick_tile(&mut self, cell: usize) -> Result<Reveal, BetError> {
        let reveal = match self.round_mut("pick a tile")? {
            ActiveRound::Mines(round) => round.reveal(cell)?,
            other => return Err(GameError::WrongGame(other.game_type().to_string()).into()),
        };
        match reveal {
            Reveal::Mine { outcome } => self.finish(SessionStatus::Lost, outcome).await?,
            Reveal::Cleared { outcome } => self.finish(SessionStatus::Won, outcome).await?,
            Reveal::Gem { .. } => {}
        }
        Ok(reveal)
    }

    /// Pick `column` on the current row-climb row
    pub async fn climb_row(&mut self, column: usize) -> Result<Climb, BetError> {
        let climb = match self.round_mut("climb a row")? {
            ActiveRound::Paaji(round) => round.climb(column)?,
            other => return Err(GameError::WrongGame(other.game_type().to_string()).into()),
        };
        match climb {
            Climb::Busted { outcome, .. } => self.finish(SessionStatus::Lost, outcome).await?,
            Climb::Summit { outcome } => self.finish(SessionStatus::Won, outcome).await?,
            Climb::Safe { .. } => {}
        }
        Ok(climb)
    }

    /// Advance the crash clock to `elapsed` since the round started
    pub async fn let_timer_run(&mut self, elapsed: Duration) -> Result<CrashTick, BetError> {
        let tick = match self.round_mut("run the timer")? {
            ActiveRound::Crash(round) => round.tick(elapsed)?,
            other => return Err(GameError::WrongGame(other.game_type().to_string()).into()),
        };
        if let CrashTick::Crashed { outcome, .. } = tick {
            self.finish(SessionStatus::Lost, outcome).await?;
        }
        Ok(tick)
    }

    /// Stop playing and keep the current multiplier.
    ///
    /// A crash round pays the multiplier of the last [`BetSession::let_timer_run`];
    /// use [`BetSession::cash_out_at`] to cash out at a given elapsed time.
    pub async fn cash_out(&mut self) -> Result<Outcome, BetError> {
        let outcome = self.round_mut("cash out")?.cash_out()?;
        self.finish(SessionStatus::CashedOut, outcome).await?;
        Ok(outcome)
    }

    /// Crash only: run the clock to `elapsed`, then cash out at that multiplier.
    /// Returns the loss instead when the round crashed first.
    pub async fn cash_out_at(&mut self, elapsed: Duration) -> Result<Outcome, BetError> {
        if let CrashTick::Crashed { outcome, .. } = self.let_timer_run(elapsed).await? {
            return Ok(outcome);
        }
        self.cash_out().await
    }

    /// Request settlement of the finished round.
    ///
    /// Only the first call does anything; later calls return the recorded
    /// state. A failed request is kept as `Failed` and can be retried with
    /// [`BetSession::retry_resolution`].
    pub async fn resolve(&mut self, outcome: Outcome) -> Result<&ResolutionState, BetError> {
        if !self.status.is_terminal() {
            return Err(BetError::InvalidTransition {
                action: "resolve",
                status: self.status,
            });
        }
        if self.resolution_state != ResolutionState::NotRequested {
            return Ok(&self.resolution_state);
        }
        self.outcome = Some(outcome);
        self.submit_resolution(outcome).await?;
        Ok(&self.resolution_state)
    }

    /// Re-submit a failed settlement
    pub async fn retry_resolution(&mut self) -> Result<&ResolutionState, BetError> {
        let outcome = match (&self.resolution_state, self.outcome) {
            (ResolutionState::Failed { .. }, Some(outcome)) => outcome,
            _ => {
                return Err(BetError::InvalidTransition {
                    action: "retry resolution",
                    status: self.status,
                })
            }
        };
        self.submit_resolution(outcome).await?;
        Ok(&self.resolution_state)
    }

    /// Discard a bet whose start never completed. A transaction already
    /// handed to the wallet is not recalled.
    pub fn cancel(&mut self) -> Result<(), BetError> {
        if !self.status.is_busy() {
            return Err(BetError::InvalidTransition {
                action: "cancel",
                status: self.status,
            });
        }
        warn!(game_id = ?self.game_id.as_ref().map(GameId::as_str), "Bet cancelled before confirmation");
        self.clear();
        Ok(())
    }

    /// Return a finished session to `idle`. Refused while the last
    /// settlement is `Failed`.
    pub fn reset(&mut self) -> Result<(), BetError> {
        if !(self.status == SessionStatus::Idle || self.status.is_terminal()) {
            return Err(BetError::InvalidTransition {
                action: "reset",
                status: self.status,
            });
        }
        self.ensure_settled()?;
        self.clear();
        Ok(())
    }

    /// A failed settlement keeps its stake pending on chain; it must be
    /// retried before the session can be discarded.
    fn ensure_settled(&self) -> Result<(), BetError> {
        if let ResolutionState::Failed { reason } = &self.resolution_state {
            let game_id = self.game_id.as_ref().map(|id| id.to_string()).unwrap_or_default();
            warn!(game_id = %game_id, %reason, "Previous game is not settled");
            return Err(BetError::UnsettledGame { game_id });
        }
        Ok(())
    }

    fn round_mut(&mut self, action: &'static str) -> Result<&mut ActiveRound, BetError> {
        if self.status != SessionStatus::InProgress {
            return Err(BetError::InvalidTransition {
                action,
                status: self.status,
            });
        }
        let status = self.status;
        self.round
            .as_mut()
            .ok_or(BetError::InvalidTransition { action, status })
    }

    async fn finish(&mut self, status: SessionStatus, outcome: Outcome) -> Result<(), BetError> {
        self.status = status;
        info!(
            game_id = ?self.game_id.as_ref().map(GameId::as_str),
            status = %status,
            did_win = outcome.did_win,
            multiplier = outcome.multiplier,
            "🏁 Round finished"
        );
        self.resolve(outcome).await?;
        Ok(())
    }

    async fn submit_resolution(&mut self, outcome: Outcome) -> Result<(), BetError> {
        let report = OutcomeReport {
            game_id: self.game_id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
            did_win: outcome.did_win,
            multiplier: outcome.multiplier,
            game_type: self.game_type.map(|t| t.to_string()).unwrap_or_default(),
            player: to_checksum(&self.chain.account(), None),
        };

        match self.resolution.resolve_game(&report).await {
            Ok(receipt) => {
                info!(game_id = %report.game_id, tx_hash = %receipt.transaction_hash, "Settlement confirmed");
                self.resolve_tx_hash = Some(receipt.transaction_hash.clone());
                self.resolution_state = ResolutionState::Settled {
                    transaction_hash: Some(receipt.transaction_hash),
                };
                Ok(())
            }
            Err(e) if e.is_already_resolved() => {
                info!(game_id = %report.game_id, "Game was already settled");
                self.resolution_state = ResolutionState::Settled { transaction_hash: None };
                Ok(())
            }
            Err(e) => {
                self.record_failure(&report.game_id, &e);
                Err(e.into())
            }
        }
    }

    fn record_failure(&mut self, game_id: &str, e: &ResolutionError) {
        error!(game_id, category = %e.category(), error = %e, "❌ Settlement failed; game stays pending on chain");
        self.resolution_state = ResolutionState::Failed { reason: e.to_string() };
    }

    fn abandon(&mut self, err: ChainError) -> BetError {
        warn!(
            game_id = ?self.game_id.as_ref().map(GameId::as_str),
            category = %err.category(),
            error = %err,
            "Bet not placed, returning to idle"
        );
        self.clear();
        err.into()
    }

    fn clear(&mut self) {
        self.game_id = None;
        self.bet_amount = 0.0;
        self.game_type = None;
        self.status = SessionStatus::Idle;
        self.start_tx_hash = None;
        self.resolve_tx_hash = None;
        self.round = None;
        self.outcome = None;
        self.resolution_state = ResolutionState::NotRequested;
    }
}
