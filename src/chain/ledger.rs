//! In-memory SecureGames contract
//!
//! Mirrors the contract's external behaviour (reverts, accounting, events) so
//! the whole lifecycle can run without a node. Every successful call mines
//! exactly one block and is confirmed immediately.

use super::{ChainGateway, ContractEvent, ContractStats, GameDetails, PendingTx, TxReceipt, UserStats};
use crate::common::{payout, GameStatus};
use crate::errors::ChainError;
use async_trait::async_trait;
use dashmap::DashMap;
use ethers::types::{Address, H256, U256};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct GameRecord {
    player: Address,
    amount: U256,
    status: GameStatus,
    block_number: u64,
    game_type: String,
    multiplier_percent: u64,
}

#[derive(Debug, Default)]
struct LedgerState {
    resolver: Address,
    games: HashMap<String, GameRecord>,
    users: HashMap<Address, UserStats>,
    /// Unresolved game per player
    pending: HashMap<Address, String>,
    wallets: HashMap<Address, U256>,
    stats: ContractStats,
    /// Native value held by the contract
    escrow: U256,
    block_number: u64,
    tx_count: u64,
}

impl LedgerState {
    fn mine(&mut self, caller: Address, label: &str) -> TxReceipt {
        self.block_number += 1;
        self.tx_count += 1;

        let mut hasher = Sha256::new();
        hasher.update(caller.as_bytes());
        hasher.update(self.tx_count.to_be_bytes());
        hasher.update(label.as_bytes());
        let hash = H256::from_slice(&hasher.finalize());

        TxReceipt {
            hash,
            block_number: self.block_number,
            success: true,
        }
    }
}

fn revert(reason: &str, game_id: &str) -> ChainError {
    ChainError::classify(&format!("execution reverted: {}", reason), game_id)
}

fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

pub struct InMemoryChain {
    owner: Address,
    state: RwLock<LedgerState>,
    receipts: DashMap<H256, TxReceipt>,
    events: broadcast::Sender<ContractEvent>,
}

impl InMemoryChain {
    pub fn new(owner: Address, resolver: Address) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            owner,
            state: RwLock::new(LedgerState {
                resolver,
                ..Default::default()
            }),
            receipts: DashMap::new(),
            events,
        }
    }

    /// Gateway that signs as `account`
    pub fn gateway(self: &Arc<Self>, account: Address) -> LedgerGateway {
        LedgerGateway {
            chain: Arc::clone(self),
            account,
            reject_signatures: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContractEvent> {
        self.events.subscribe()
    }

    /// Credit native balance to a wallet
    pub fn fund(&self, account: Address, amount: U256) {
        if let Ok(mut state) = self.state.write() {
            let balance = state.wallets.entry(account).or_default();
            *balance += amount;
        }
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.state
            .read()
            .ok()
            .and_then(|s| s.wallets.get(&account).copied())
            .unwrap_or_default()
    }

    pub fn escrow(&self) -> U256 {
        self.state.read().map(|s| s.escrow).unwrap_or_default()
    }

    pub fn block_number(&self) -> u64 {
        self.state.read().map(|s| s.block_number).unwrap_or(0)
    }

    /// Successful transactions mined so far
    pub fn transaction_count(&self) -> u64 {
        self.state.read().map(|s| s.tx_count).unwrap_or(0)
    }

    pub fn resolver(&self) -> Address {
        self.state.read().map(|s| s.resolver).unwrap_or_default()
    }

    pub fn receipt(&self, hash: &H256) -> Option<TxReceipt> {
        self.receipts.get(hash).map(|r| *r)
    }

    fn poisoned() -> ChainError {
        ChainError::Rpc("ledger state lock poisoned".to_string())
    }

    fn commit(&self, receipt: TxReceipt, events: Vec<ContractEvent>) -> TxReceipt {
        self.receipts.insert(receipt.hash, receipt);
        for event in events {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
        receipt
    }

    pub fn start_game(&self, caller: Address, game_id: &str, game_type: &str, value: U256) -> Result<TxReceipt, ChainError> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;

        if value.is_zero() {
            return Err(revert("Attach ETH to play", game_id));
        }
        if game_id.is_empty() {
            return Err(revert("gameId required", game_id));
        }
        if state.games.contains_key(game_id) {
            return Err(revert("gameId already exists", game_id));
        }
        if state.pending.contains_key(&caller) {
            return Err(revert("You already have a pending bet", game_id));
        }
        let balance = state.wallets.get(&caller).copied().unwrap_or_default();
        if balance < value {
            return Err(ChainError::classify("insufficient funds for gas * price + value", game_id));
        }

        let receipt = state.mine(caller, &format!("startGame:{}", game_id));
        let block_number = receipt.block_number;
        let timestamp = now_secs();
        let game_type = if game_type.is_empty() { "unknown" } else { game_type }.to_string();

        state.wallets.insert(caller, balance - value);
        state.escrow += value;

        let is_new_user = !state.users.contains_key(&caller);
        let user = state.users.entry(caller).or_default();
        if is_new_user {
            user.join_block = block_number;
            user.join_timestamp = timestamp;
        }
        user.total_bet += value;
        user.games_played += 1;
        user.last_play_block = block_number;
        user.last_play_timestamp = timestamp;

        if is_new_user {
            state.stats.total_users += 1;
        }
        state.stats.total_bets += value;
        state.stats.total_games += 1;

        state.games.insert(
            game_id.to_string(),
            GameRecord {
                player: caller,
                amount: value,
                status: GameStatus::Pending,
                block_number,
                game_type: game_type.clone(),
                multiplier_percent: 0,
            },
        );
        state.pending.insert(caller, game_id.to_string());
        drop(state);

        debug!(game_id, block_number, "Ledger: game started");
        Ok(self.commit(
            receipt,
            vec![ContractEvent::GameStarted {
                game_id: game_id.to_string(),
                player: caller,
                amount: value,
                game_type,
                block_number,
            }],
        ))
    }

    pub fn resolve_game(&self, caller: Address, game_id: &str, did_win: bool, multiplier_percent: u64) -> Result<TxReceipt, ChainError> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;

        if caller != state.resolver {
            return Err(revert("Only resolver can call this", game_id));
        }
        let game = match state.games.get(game_id) {
            Some(game) => game.clone(),
            None => return Err(revert("Game not found", game_id)),
        };
        if game.status != GameStatus::Pending {
            return Err(revert("Game already resolved", game_id));
        }

        let percent = if multiplier_percent == 0 { 100 } else { multiplier_percent };
        let receipt = state.mine(caller, &format!("resolveGame:{}", game_id));

        let (status, recorded_percent, winnings) = if did_win {
            (GameStatus::Won, percent, payout(game.amount, percent))
        } else {
            (GameStatus::Lost, 100, U256::zero())
        };

        if let Some(record) = state.games.get_mut(game_id) {
            record.status = status;
            record.multiplier_percent = recorded_percent;
        }
        state.pending.remove(&game.player);

        let user = state.users.entry(game.player).or_default();
        if did_win {
            user.total_won += winnings;
            user.withdrawable_balance += winnings;
            user.games_won += 1;
        } else {
            user.total_lost += game.amount;
        }
        if did_win {
            state.stats.total_winnings += winnings;
        }
        drop(state);

        debug!(game_id, did_win, recorded_percent, "Ledger: game resolved");
        Ok(self.commit(
            receipt,
            vec![ContractEvent::GameResolved {
                game_id: game_id.to_string(),
                player: game.player,
                did_win,
                amount: game.amount,
                winnings,
                multiplier_percent: recorded_percent,
            }],
        ))
    }

    pub fn withdraw(&self, caller: Address) -> Result<TxReceipt, ChainError> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;

        let amount = state
            .users
            .get(&caller)
            .map(|u| u.withdrawable_balance)
            .unwrap_or_default();
        if amount.is_zero() {
            return Err(revert("Nothing to withdraw", ""));
        }

        let receipt = state.mine(caller, "withdraw");
        if let Some(user) = state.users.get_mut(&caller) {
            user.withdrawable_balance = U256::zero();
        }
        state.escrow = state.escrow.saturating_sub(amount);
        *state.wallets.entry(caller).or_default() += amount;
        drop(state);

        Ok(self.commit(receipt, Vec::new()))
    }

    /// Owner-only resolver rotation
    pub fn update_resolver(&self, caller: Address, new_resolver: Address) -> Result<TxReceipt, ChainError> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        if caller != self.owner {
            return Err(revert("Only owner can call this", ""));
        }
        if new_resolver.is_zero() {
            return Err(revert("Invalid resolver address", ""));
        }
        state.resolver = new_resolver;
        let receipt = state.mine(caller, "updateResolver");
        drop(state);
        Ok(self.commit(receipt, Vec::new()))
    }

    pub fn game_details(&self, game_id: &str) -> GameDetails {
        let state = match self.state.read() {
            Ok(state) => state,
            Err(_) => return GameDetails::missing(game_id),
        };
        match state.games.get(game_id) {
            Some(game) => GameDetails {
                game_id: game_id.to_string(),
                player: game.player,
                amount: game.amount,
                status: game.status,
                block_number: game.block_number,
                game_type: game.game_type.clone(),
                multiplier_percent: game.multiplier_percent,
                exists: true,
            },
            None => GameDetails::missing(game_id),
        }
    }

    pub fn user_stats(&self, account: Address) -> UserStats {
        self.state
            .read()
            .ok()
            .and_then(|s| s.users.get(&account).cloned())
            .unwrap_or_default()
    }

    pub fn contract_stats(&self) -> ContractStats {
        self.state.read().map(|s| s.stats.clone()).unwrap_or_default()
    }
}

/// [`ChainGateway`] over an [`InMemoryChain`], signing as one account
pub struct LedgerGateway {
    chain: Arc<InMemoryChain>,
    account: Address,
    reject_signatures: AtomicBool,
}

impl LedgerGateway {
    pub fn chain(&self) -> &Arc<InMemoryChain> {
        &self.chain
    }

    /// Make the simulated wallet decline every signature request
    pub fn set_rejects_signatures(&self, reject: bool) {
        self.reject_signatures.store(reject, Ordering::SeqCst);
    }

    fn check_signature(&self) -> Result<(), ChainError> {
        if self.reject_signatures.load(Ordering::SeqCst) {
            return Err(ChainError::classify("User closed the window", ""));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainGateway for LedgerGateway {
    fn account(&self) -> Address {
        self.account
    }

    async fn start_game(&self, game_id: &str, game_type: &str, value: U256) -> Result<PendingTx, ChainError> {
        self.check_signature()?;
        let receipt = self.chain.start_game(self.account, game_id, game_type, value)?;
        Ok(PendingTx { hash: receipt.hash })
    }

    async fn confirmation(&self, tx: &PendingTx) -> Result<Option<TxReceipt>, ChainError> {
        Ok(self.chain.receipt(&tx.hash))
    }

    async fn resolve_game(&self, game_id: &str, did_win: bool, multiplier_percent: u64) -> Result<PendingTx, ChainError> {
        self.check_signature()?;
        let receipt = self.chain.resolve_game(self.account, game_id, did_win, multiplier_percent)?;
        Ok(PendingTx { hash: receipt.hash })
    }

    async fn withdraw(&self) -> Result<PendingTx, ChainError> {
        self.check_signature()?;
        let receipt = self.chain.withdraw(self.account)?;
        Ok(PendingTx { hash: receipt.hash })
    }

    async fn get_game_details(&self, game_id: &str) -> Option<GameDetails> {
        Some(self.chain.game_details(game_id))
    }

    async fn get_user_stats(&self, account: Address) -> Option<UserStats> {
        Some(self.chain.user_stats(account))
    }

    async fn get_contract_stats(&self) -> Option<ContractStats> {
        Some(self.chain.contract_stats())
    }

    async fn get_resolver_account(&self) -> Result<Address, ChainError> {
        Ok(self.chain.resolver())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::to_wei;

    fn setup() -> (Arc<InMemoryChain>, Address, Address, Address) {
        let owner = Address::repeat_byte(0x01);
        let resolver = Address::repeat_byte(0x02);
        let player = Address::repeat_byte(0x03);
        let chain = Arc::new(InMemoryChain::new(owner, resolver));
        chain.fund(player, to_wei(10.0).unwrap());
        (chain, owner, resolver, player)
    }

    fn eth(amount: f64) -> U256 {
        to_wei(amount).unwrap()
    }

    #[test]
    fn test_start_game_validations() {
        let (chain, _, _, player) = setup();
        assert!(matches!(
            chain.start_game(player, "g1", "mines", U256::zero()),
            Err(ChainError::Reverted(reason)) if reason == "Attach ETH to play"
        ));
        assert!(matches!(
            chain.start_game(player, "", "mines", eth(0.1)),
            Err(ChainError::Reverted(reason)) if reason == "gameId required"
        ));

        chain.start_game(player, "g1", "", eth(0.1)).unwrap();
        assert_eq!(chain.game_details("g1").game_type, "unknown");
        assert_eq!(
            chain.start_game(player, "g1", "mines", eth(0.1)),
            Err(ChainError::DuplicateGameId("g1".to_string()))
        );
        assert_eq!(
            chain.start_game(player, "g2", "mines", eth(0.1)),
            Err(ChainError::PendingBetExists)
        );

        let broke = Address::repeat_byte(0x09);
        assert_eq!(
            chain.start_game(broke, "g3", "mines", eth(0.1)),
            Err(ChainError::InsufficientBalance)
        );
        assert_eq!(chain.transaction_count(), 1);
    }

    #[test]
    fn test_win_credits_withdrawable_balance() {
        let (chain, _, resolver, player) = setup();
        chain.start_game(player, "g1", "paaji", eth(0.1)).unwrap();
        chain.resolve_game(resolver, "g1", true, 152).unwrap();

        let details = chain.game_details("g1");
        assert_eq!(details.status, GameStatus::Won);
        assert_eq!(details.multiplier_percent, 152);

        let stats = chain.user_stats(player);
        assert_eq!(stats.withdrawable_balance, eth(0.152));
        assert_eq!(stats.total_won, eth(0.152));
        assert_eq!(stats.games_won, 1);
        assert_eq!(stats.total_lost, U256::zero());

        let contract = chain.contract_stats();
        assert_eq!(contract.total_users, 1);
        assert_eq!(contract.total_games, 1);
        assert_eq!(contract.total_winnings, eth(0.152));
    }

    #[test]
    fn test_loss_records_stake_and_default_percent() {
        let (chain, _, resolver, player) = setup();
        chain.start_game(player, "g1", "crash", eth(0.5)).unwrap();
        chain.resolve_game(resolver, "g1", false, 0).unwrap();

        let details = chain.game_details("g1");
        assert_eq!(details.status, GameStatus::Lost);
        assert_eq!(details.multiplier_percent, 100);

        let stats = chain.user_stats(player);
        assert_eq!(stats.total_lost, eth(0.5));
        assert_eq!(stats.withdrawable_balance, U256::zero());
    }

    #[test]
    fn test_resolution_guards() {
        let (chain, _, resolver, player) = setup();
        chain.start_game(player, "g1", "mines", eth(0.1)).unwrap();

        assert_eq!(
            chain.resolve_game(player, "g1", true, 200),
            Err(ChainError::OnlyResolver)
        );
        assert_eq!(
            chain.resolve_game(resolver, "nope", true, 200),
            Err(ChainError::GameNotFound("nope".to_string()))
        );

        chain.resolve_game(resolver, "g1", true, 200).unwrap();
        assert_eq!(
            chain.resolve_game(resolver, "g1", true, 200),
            Err(ChainError::AlreadyResolved("g1".to_string()))
        );
        assert_eq!(chain.user_stats(player).withdrawable_balance, eth(0.2));

        // Player is free to bet again once settled
        chain.start_game(player, "g2", "mines", eth(0.1)).unwrap();
    }

    #[test]
    fn test_withdraw_moves_balance_to_wallet() {
        let (chain, _, resolver, player) = setup();
        assert_eq!(chain.withdraw(player), Err(ChainError::NothingToWithdraw));

        chain.start_game(player, "g1", "mines", eth(1.0)).unwrap();
        chain.resolve_game(resolver, "g1", true, 250).unwrap();
        chain.withdraw(player).unwrap();

        assert_eq!(chain.balance_of(player), eth(11.5));
        assert_eq!(chain.user_stats(player).withdrawable_balance, U256::zero());
        assert_eq!(chain.escrow(), U256::zero());
    }

    #[test]
    fn test_update_resolver_is_owner_only() {
        let (chain, owner, resolver, player) = setup();
        assert!(chain.update_resolver(player, player).is_err());
        assert!(matches!(
            chain.update_resolver(owner, Address::zero()),
            Err(ChainError::Reverted(reason)) if reason == "Invalid resolver address"
        ));
        chain.update_resolver(owner, player).unwrap();
        assert_eq!(chain.resolver(), player);
        assert_ne!(chain.resolver(), resolver);
    }

    #[tokio::test]
    async fn test_events_and_gateway_reads() {
        let (chain, _, resolver, player) = setup();
        let mut events = chain.subscribe();
        let gateway = chain.gateway(player);

        let tx = gateway.start_game("g1", "mines", eth(0.1)).await.unwrap();
        let receipt = gateway.confirmation(&tx).await.unwrap().unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.block_number, chain.block_number());

        chain.resolve_game(resolver, "g1", false, 100).unwrap();
        assert!(matches!(events.recv().await.unwrap(), ContractEvent::GameStarted { .. }));
        match events.recv().await.unwrap() {
            ContractEvent::GameResolved { did_win, winnings, .. } => {
                assert!(!did_win);
                assert!(winnings.is_zero());
            }
            other => panic!("unexpected event {:?}", other),
        }

        let missing = gateway.get_game_details("nope").await.unwrap();
        assert!(!missing.exists);
        assert_eq!(gateway.get_resolver_account().await.unwrap(), resolver);

        gateway.set_rejects_signatures(true);
        assert!(matches!(
            gateway.start_game("g2", "mines", eth(0.1)).await,
            Err(ChainError::Rejected(_))
        ));
    }
}
