mod commands;

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use chronoshare_config::{ChronoshareConfig, DATABASE, LEDGER};
use chronoshare_core::{Address, Clock, Ledger, ManualClock, RocksDbStore, SharedLedger, SystemClock};

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let (caller_label, args) = split_caller(&args[1..]);

    if args.is_empty() {
        print_usage();
        return;
    }

    let cmd = args[0].as_str();
    match cmd {
        "help" | "--help" | "-h" => {
            print_usage();
            return;
        }
        "sample-config" => {
            println!("{}", ChronoshareConfig::generate_sample());
            return;
        }
        _ => {}
    }

    let ledger = match open_ledger() {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("❌ Error opening ledger at {}: {:#}", DATABASE.path, e);
            std::process::exit(1);
        }
    };

    let caller = match resolve_account(caller_label.unwrap_or(LEDGER.operator_label)) {
        Ok(caller) => caller,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let result = match cmd {
        "airdrop" => commands::airdrop(&ledger, &args[1..]).await,
        "create" => commands::create(&ledger, caller, &args[1..]).await,
        "join" => commands::join(&ledger, caller, &args[1..]).await,
        "register" => commands::register(&ledger, caller, &args[1..]).await,
        "vote" => commands::vote(&ledger, caller, &args[1..]).await,
        "share" => commands::share(&ledger, caller, &args[1..]).await,
        "publish" => commands::publish(&ledger, caller, &args[1..]).await,
        "fund" => commands::fund(&ledger, caller, &args[1..]).await,
        "refresh" => commands::refresh(&ledger, caller, &args[1..]).await,
        "trigger" => commands::trigger(&ledger, caller, &args[1..]).await,
        "calculate" => commands::calculate(&ledger, caller, &args[1..]).await,
        "claim-reward" => commands::claim_reward(&ledger, caller, &args[1..]).await,
        "claim-deposit" => commands::claim_deposit(&ledger, caller, &args[1..]).await,
        "refund" => commands::refund(&ledger, caller, &args[1..]).await,
        "reclaim" => commands::reclaim(&ledger, caller, &args[1..]).await,
        "abort" => commands::abort(&ledger, caller, &args[1..]).await,
        "sweep" => commands::sweep(&ledger, caller, &args[1..]).await,
        "info" => commands::info(&ledger, &args[1..]).await,
        "holders" => commands::holders(&ledger, &args[1..]).await,
        "participant" => commands::participant(&ledger, &args[1..]).await,
        "events" => commands::events(&ledger, &args[1..]).await,
        "balance" => commands::balance(&ledger, &args[1..]).await,
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {} failed: {:#}", cmd, e);
        std::process::exit(1);
    }
}

/// Pulls `--as <label>` out of the argument list.
fn split_caller(args: &[String]) -> (Option<&str>, Vec<String>) {
    let mut caller = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--as" {
            caller = args.get(i + 1).map(|s| s.as_str());
            i += 2;
            continue;
        }
        rest.push(args[i].clone());
        i += 1;
    }
    (caller, rest)
}

/// A `0x`-prefixed 40-hex-digit string is taken as an address, anything
/// else as a label hashed into one.
pub(crate) fn resolve_account(label: &str) -> Result<Address> {
    if label.starts_with("0x") && label.len() == 42 {
        return label
            .parse::<Address>()
            .with_context(|| format!("invalid address {}", label));
    }
    Ok(Address::from_label(label))
}

fn open_ledger() -> Result<SharedLedger> {
    let clock: Arc<dyn Clock> = match LEDGER.pinned_time {
        Some(now) => {
            log::info!("Using pinned time {}", now);
            Arc::new(ManualClock::new(now))
        }
        None => Arc::new(SystemClock),
    };
    let store = RocksDbStore::open(DATABASE.path)?;
    let ledger = Ledger::open(store, clock)?;
    Ok(SharedLedger::new(ledger))
}

fn print_usage() {
    println!("Chronoshare CLI - timed-release vote sessions");
    println!();
    println!("USAGE:");
    println!("  chronoshare [--as <label>] <command> [args]");
    println!();
    println!("SETUP COMMANDS:");
    println!("  airdrop <label> <amount>                 Mint balance for an account");
    println!("  create <title> <opt,opt..> [deposit] [threshold]");
    println!("                                           Deploy a session + registry pair");
    println!();
    println!("PARTICIPATION COMMANDS:");
    println!("  join <id> <bls-pubkey-hex>               Join as holder (pays the deposit)");
    println!("  register <id>                            Register as voter");
    println!("  vote <id> <ct-hex> <g1r-hex> <g2r-hex> <alpha,..> <threshold>");
    println!("                                           Cast an encrypted vote");
    println!("  share <id> <vote> <share-index> <hex>    Submit a decryption share");
    println!("  publish <id> <value-hex>                 Publish a decryption value");
    println!();
    println!("SETTLEMENT COMMANDS:");
    println!("  fund <id> <amount>                       Add external reward funding (owner)");
    println!("  refresh <id>                             Persist the current status");
    println!("  trigger <id>                             Trigger reward calculation");
    println!("  calculate <id>                           Calculate rewards (owner)");
    println!("  claim-reward <id>                        Withdraw owed reward");
    println!("  claim-deposit <id>                       Withdraw deposit after completion");
    println!("  abort <id>                               Cancel the session (owner)");
    println!("  refund <id>                              Withdraw deposit of an aborted session");
    println!("  reclaim <id>                             Withdraw funding of an aborted session (owner)");
    println!("  sweep <id>                               Withdraw the rounding remainder (owner)");
    println!();
    println!("QUERY COMMANDS:");
    println!("  info <id>                                Session parameters and status");
    println!("  holders <id>                             Active holders and their keys");
    println!("  participant <id> <label>                 Participant record and claims");
    println!("  events [from]                            Event log");
    println!("  balance <label>                          Account balance");
    println!();
    println!("OTHER COMMANDS:");
    println!("  sample-config                            Print a sample config.toml");
    println!("  help                                     Show this help message");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  CS_CONFIG            Config file path");
    println!("  CS_DB_PATH           Database path");
    println!("  CS_NOW               Pin the ledger clock (unix seconds)");
    println!("  CS_OPERATOR          Default caller label");
    println!("  RUST_LOG             Log level (debug/info/warn/error)");
}
