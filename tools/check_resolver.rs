//! Compare the configured resolver key with the contract's resolver
//!
//! Prints the derived signer address and the on-chain resolver. Never prints
//! the key itself. Exits non-zero on mismatch.

use clap::Parser;
use ethers::utils::to_checksum;
use securegames::chain::{ChainGateway, EvmGateway};
use securegames::config::ConfigLoader;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "check-resolver")]
#[command(about = "Check that the resolver key matches the SecureGames contract", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let config = loader.load()?;

    let key = config.resolver.load_key()?;
    println!("🔑 Key source:        {}", config.resolver.key_env);
    println!("   Derived address:   {}", key.address()?);
    println!("   Contract:          {}", config.chain.contract_address);
    println!("   RPC:               {}", config.chain.rpc_url);

    let gateway = EvmGateway::connect(&config.chain, &key)?;
    let expected = gateway.get_resolver_account().await?;
    let derived = gateway.account();
    println!("   Contract resolver: {}", to_checksum(&expected, None));

    if derived == expected {
        println!("✅ Key matches the contract resolver");
        Ok(true)
    } else {
        println!("❌ Mismatch: set RESOLVER_PRIVATE_KEY to the key for {}", to_checksum(&expected, None));
        Ok(false)
    }
}
