//! Play one bet end to end against the in-memory ledger
//!
//! Useful for watching the lifecycle logs without a node or a wallet.

use clap::{Parser, ValueEnum};
use ethers::types::Address;
use ethers::utils::to_checksum;
use securegames::api::init_tracing;
use securegames::chain::InMemoryChain;
use securegames::common::{from_wei, to_wei, GameId};
use securegames::games::{Climb, CrashTick, Difficulty, GameSetup, Reveal, RngDraws};
use securegames::config::ConfigLoader;
use securegames::resolution::{InProcessResolution, Resolution, ResolutionGateway};
use securegames::resolver::ChainResolver;
use securegames::retry::RetryPolicy;
use securegames::BetSession;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Game {
    Mines,
    Paaji,
    Crash,
}

#[derive(Parser, Debug)]
#[command(name = "simulate-bet")]
#[command(about = "Simulate one SecureGames bet against an in-memory contract", long_about = None)]
struct Args {
    #[arg(long, value_enum, default_value = "mines")]
    game: Game,

    /// Stake in native units
    #[arg(long, default_value = "0.1")]
    amount: f64,

    /// Mines on the board
    #[arg(long, default_value = "3")]
    mines: u8,

    /// Use the hard row-climb table
    #[arg(long)]
    hard: bool,

    /// Safe picks (mines, paaji) before cashing out
    #[arg(long, default_value = "3")]
    steps: usize,

    /// Crash only: cash out once the multiplier reaches this
    #[arg(long, default_value = "2.0")]
    target: f64,

    /// Seed for reproducible rounds
    #[arg(long)]
    seed: Option<u64>,

    /// Post the outcome to a running resolver (mock mode) instead of settling in-process
    #[arg(long)]
    resolver_url: Option<String>,

    /// Configuration file supplying the resolution retry policy
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();
    let args = Args::parse();

    let owner = Address::repeat_byte(0x01);
    let resolver_account = Address::repeat_byte(0x02);
    let player = Address::repeat_byte(0x03);

    let chain = Arc::new(InMemoryChain::new(owner, resolver_account));
    chain.fund(player, to_wei(10.0).ok_or("invalid funding amount")?);

    let resolution: Arc<dyn Resolution> = match &args.resolver_url {
        Some(url) => {
            let mut loader = ConfigLoader::new();
            if let Some(path) = &args.config {
                loader = loader.with_path(path);
            }
            let config = loader.load()?;
            let gateway = ResolutionGateway::new(url)?.with_retry_policy(config.retry.resolution);
            info!("🌐 Settling through {}", gateway.endpoint());
            Arc::new(gateway)
        }
        None => {
            let resolver = ChainResolver::new(
                Arc::new(chain.gateway(resolver_account)),
                RetryPolicy::immediate(3),
                Duration::from_secs(300),
            );
            Arc::new(InProcessResolution::new(Arc::new(resolver)))
        }
    };
    let draws = match args.seed {
        Some(seed) => RngDraws::seeded(seed),
        None => RngDraws::seeded(rand::random()),
    };
    let mut session = BetSession::new(Arc::new(chain.gateway(player)), resolution)
        .with_draws(draws)
        .with_confirmation_policy(RetryPolicy::immediate(3));

    let setup = match args.game {
        Game::Mines => GameSetup::Mines { mine_count: args.mines },
        Game::Paaji => GameSetup::Paaji {
            difficulty: if args.hard { Difficulty::Hard } else { Difficulty::Easy },
        },
        Game::Crash => GameSetup::Crash,
    };

    let game_id = GameId::generate(setup.game_type());
    session.start(game_id, args.amount, setup).await?;

    match args.game {
        Game::Mines => play_mines(&mut session, args.steps).await?,
        Game::Paaji => play_paaji(&mut session, args.steps).await?,
        Game::Crash => play_crash(&mut session, args.target).await?,
    }

    let snapshot = session.snapshot();
    info!("📄 Session: {}", serde_json::to_string_pretty(&snapshot)?);

    let stats = chain.user_stats(player);
    info!("👤 Player {}", to_checksum(&player, None));
    info!("   Total bet:     {}", from_wei(stats.total_bet));
    info!("   Total won:     {}", from_wei(stats.total_won));
    info!("   Total lost:    {}", from_wei(stats.total_lost));
    info!("   Withdrawable:  {}", from_wei(stats.withdrawable_balance));
    Ok(())
}

async fn play_mines(session: &mut BetSession, steps: usize) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut gems = 0;
    for cell in 0..securegames::games::mines::GRID_SIZE {
        match session.pick_tile(cell).await? {
            Reveal::Gem { multiplier, .. } => {
                gems += 1;
                info!("💎 Cell {} safe, multiplier {:.4}x", cell, multiplier);
                if gems >= steps {
                    session.cash_out().await?;
                    return Ok(());
                }
            }
            Reveal::Mine { .. } => {
                info!("💣 Cell {} was a mine", cell);
                return Ok(());
            }
            Reveal::Cleared { outcome } => {
                info!("🏆 Board cleared at {:.4}x", outcome.multiplier);
                return Ok(());
            }
        }
    }
    Ok(())
}

async fn play_paaji(session: &mut BetSession, steps: usize) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    for _ in 0..steps {
        match session.climb_row(0).await? {
            Climb::Safe { row, multiplier } => info!("🪜 Row {} safe, multiplier {:.2}x", row, multiplier),
            Climb::Busted { row, .. } => {
                info!("💥 Busted on row {}", row);
                return Ok(());
            }
            Climb::Summit { outcome } => {
                info!("🏔️  Summit at {:.2}x", outcome.multiplier);
                return Ok(());
            }
        }
    }
    session.cash_out().await?;
    Ok(())
}

async fn play_crash(session: &mut BetSession, target: f64) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut elapsed = Duration::ZERO;
    loop {
        elapsed += Duration::from_millis(100);
        match session.let_timer_run(elapsed).await? {
            CrashTick::Running { multiplier } if multiplier >= target => {
                info!("🚀 Cashing out at {:.2}x", multiplier);
                session.cash_out_at(elapsed).await?;
                return Ok(());
            }
            CrashTick::Running { .. } => {}
            CrashTick::Crashed { crash_point, .. } => {
                info!("💥 Crashed at {:.2}x", crash_point);
                return Ok(());
            }
        }
    }
}
