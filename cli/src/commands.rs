use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chronoshare_config::SESSION_DEFAULTS;
use chronoshare_core::{
    Address, Amount, Call, DeployedPair, DirectoryCall, Outcome, RegistryCall, SessionCall,
    SessionId, SessionParams, SharedLedger, VoteSubmission,
};

use crate::resolve_account;

// ============================================================================
// Argument helpers
// ============================================================================

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(|s| s.as_str())
        .ok_or_else(|| anyhow!("missing argument <{}>", name))
}

fn parse_arg<T>(args: &[String], index: usize, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = arg(args, index, name)?;
    raw.parse()
        .map_err(|e| anyhow!("invalid <{}> '{}': {}", name, raw, e))
}

fn hex_arg(args: &[String], index: usize, name: &str) -> Result<Vec<u8>> {
    let raw = arg(args, index, name)?;
    hex::decode(raw.trim_start_matches("0x")).with_context(|| format!("<{}> is not hex", name))
}

fn list_arg(args: &[String], index: usize, name: &str) -> Result<Vec<String>> {
    Ok(arg(args, index, name)?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn session_id(args: &[String]) -> Result<SessionId> {
    parse_arg(args, 0, "id")
}

async fn pair(ledger: &SharedLedger, id: SessionId) -> Result<DeployedPair> {
    Ok(ledger.read(|l| l.pair(id)).await?)
}

async fn on_registry(
    ledger: &SharedLedger,
    caller: Address,
    value: Amount,
    id: SessionId,
    call: RegistryCall,
) -> Result<Outcome> {
    let registry = pair(ledger, id).await?.registry;
    Ok(ledger
        .execute(caller, value, Call::Registry { registry, call })
        .await?)
}

async fn on_session(
    ledger: &SharedLedger,
    caller: Address,
    id: SessionId,
    call: SessionCall,
) -> Result<Outcome> {
    let session = pair(ledger, id).await?.session;
    Ok(ledger
        .execute(caller, 0, Call::Session { session, call })
        .await?)
}

fn paid(outcome: &Outcome, what: &str, caller: Address) {
    if let Some(amount) = outcome.amount() {
        println!("✅ {} {} to {}", what, amount, caller);
    }
}

// ============================================================================
// Setup
// ============================================================================

pub async fn airdrop(ledger: &SharedLedger, args: &[String]) -> Result<()> {
    let account = resolve_account(arg(args, 0, "label")?)?;
    let amount: Amount = parse_arg(args, 1, "amount")?;
    let balance = ledger.airdrop(account, amount).await?;
    println!("💸 Airdropped {} to {} (balance {})", amount, account, balance);
    Ok(())
}

pub async fn create(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let defaults = &*SESSION_DEFAULTS;
    let title = arg(args, 0, "title")?.to_string();
    let options = list_arg(args, 1, "options")?;
    let required_deposit = match args.get(2) {
        Some(_) => parse_arg(args, 2, "deposit")?,
        None => defaults.required_deposit,
    };
    let min_share_threshold = match args.get(3) {
        Some(_) => parse_arg(args, 3, "threshold")?,
        None => defaults.min_share_threshold,
    };

    let now = ledger.read(|l| l.now()).await;
    let start_date = now + defaults.registration_secs;
    let end_date = start_date + defaults.voting_secs;
    let shares_end_date = end_date + defaults.shares_secs;

    let params = SessionParams {
        title,
        description: String::new(),
        start_date,
        end_date,
        shares_end_date,
        options,
        metadata: "{}".into(),
        required_deposit,
        min_share_threshold,
    };
    let outcome = ledger
        .execute(
            caller,
            0,
            Call::Directory(DirectoryCall::CreateSessionPair(params)),
        )
        .await?;
    let deployed = outcome
        .pair()
        .ok_or_else(|| anyhow!("unexpected outcome {:?}", outcome))?;

    println!("✅ Session {} deployed", deployed.session_id);
    println!("   session:  {}", deployed.session);
    println!("   registry: {}", deployed.registry);
    println!(
        "   registration until {}, voting until {}, shares until {}",
        start_date, end_date, shares_end_date
    );
    Ok(())
}

// ============================================================================
// Participation
// ============================================================================

pub async fn join(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let bls_public_key_hex = arg(args, 1, "bls-pubkey-hex")?.to_string();
    let deposit = ledger
        .read(|l| l.session_by_id(id).map(|s| s.info(l.now()).required_deposit))
        .await?;

    on_registry(
        ledger,
        caller,
        deposit,
        id,
        RegistryCall::JoinAsHolder {
            session_id: id,
            bls_public_key_hex,
        },
    )
    .await?;
    println!("✅ {} joined session {} as holder (deposit {})", caller, id, deposit);
    Ok(())
}

pub async fn register(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    on_registry(
        ledger,
        caller,
        0,
        id,
        RegistryCall::RegisterAsVoter { session_id: id },
    )
    .await?;
    println!("✅ {} registered as voter in session {}", caller, id);
    Ok(())
}

pub async fn vote(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let submission = VoteSubmission {
        ciphertext: hex_arg(args, 1, "ciphertext-hex")?,
        g1r: hex_arg(args, 2, "g1r-hex")?,
        g2r: hex_arg(args, 3, "g2r-hex")?,
        alpha: list_arg(args, 4, "alpha")?,
        threshold: parse_arg(args, 5, "threshold")?,
    };
    let outcome = on_session(ledger, caller, id, SessionCall::CastVote(submission)).await?;
    if let Some(index) = outcome.vote_index() {
        println!("🗳️  Vote {} cast in session {}", index, id);
    }
    Ok(())
}

pub async fn share(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let call = SessionCall::SubmitShares {
        vote_index: parse_arg(args, 1, "vote")?,
        share_index: parse_arg(args, 2, "share-index")?,
        share: hex_arg(args, 3, "share-hex")?,
    };
    on_session(ledger, caller, id, call).await?;
    println!("✅ Share submitted by {} in session {}", caller, id);
    Ok(())
}

pub async fn publish(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let value_hex = arg(args, 1, "value-hex")?.to_string();
    on_session(
        ledger,
        caller,
        id,
        SessionCall::SubmitDecryptionValue { value_hex },
    )
    .await?;
    println!("✅ Decryption value published by {} in session {}", caller, id);
    Ok(())
}

// ============================================================================
// Settlement
// ============================================================================

pub async fn fund(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let amount: Amount = parse_arg(args, 1, "amount")?;
    let outcome = on_registry(
        ledger,
        caller,
        amount,
        id,
        RegistryCall::AddExternalFunding { session_id: id },
    )
    .await?;
    if let Some(total) = outcome.amount() {
        println!("✅ Funded session {} with {} (total {})", id, amount, total);
    }
    Ok(())
}

pub async fn refresh(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let outcome = on_session(ledger, caller, id, SessionCall::RefreshStatus).await?;
    if let Some(status) = outcome.status() {
        println!("Session {} is {:?}", id, status);
    }
    Ok(())
}

fn print_rewards(outcome: &Outcome) {
    if let Some(r) = outcome.rewards() {
        println!("✅ Rewards calculated");
        println!("   pool:      {} ({} funding + {} forfeited)", r.pool(), r.external_funding, r.forfeited);
        println!("   eligible:  {}", r.eligible_holders);
        println!("   per head:  {}", r.per_holder);
        println!("   remainder: {}", r.remainder);
    }
}

pub async fn trigger(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let outcome = on_session(ledger, caller, id, SessionCall::TriggerRewardCalculation).await?;
    print_rewards(&outcome);
    Ok(())
}

pub async fn calculate(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let outcome = on_registry(
        ledger,
        caller,
        0,
        id,
        RegistryCall::CalculateRewards { session_id: id },
    )
    .await?;
    print_rewards(&outcome);
    Ok(())
}

pub async fn claim_reward(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let outcome = on_registry(ledger, caller, 0, id, RegistryCall::ClaimReward { session_id: id }).await?;
    paid(&outcome, "Paid reward", caller);
    Ok(())
}

pub async fn claim_deposit(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let outcome = on_registry(ledger, caller, 0, id, RegistryCall::ClaimDeposit { session_id: id }).await?;
    paid(&outcome, "Returned deposit", caller);
    Ok(())
}

pub async fn refund(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let outcome = on_registry(
        ledger,
        caller,
        0,
        id,
        RegistryCall::RefundAbortedDeposit { session_id: id },
    )
    .await?;
    paid(&outcome, "Refunded deposit", caller);
    Ok(())
}

pub async fn reclaim(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let outcome = on_registry(
        ledger,
        caller,
        0,
        id,
        RegistryCall::ReclaimExternalFunding { session_id: id },
    )
    .await?;
    paid(&outcome, "Returned funding", caller);
    Ok(())
}

pub async fn sweep(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let outcome = on_registry(ledger, caller, 0, id, RegistryCall::SweepRemainder { session_id: id }).await?;
    paid(&outcome, "Swept remainder", caller);
    Ok(())
}

pub async fn abort(ledger: &SharedLedger, caller: Address, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    on_session(ledger, caller, id, SessionCall::Abort).await?;
    println!("🛑 Session {} aborted", id);
    Ok(())
}

// ============================================================================
// Queries
// ============================================================================

pub async fn info(ledger: &SharedLedger, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let text = ledger
        .read(|l| -> Result<String> {
            let pair = l.pair(id)?;
            let session = l.session(&pair.session)?;
            let registry = l.registry(&pair.registry)?;
            let summary = serde_json::json!({
                "session_id": id,
                "session": pair.session,
                "registry": pair.registry,
                "owner": session.owner(),
                "info": session.info(l.now()),
                "cached_status": session.cached_status(),
                "votes": session.number_of_votes(),
                "shares": session.decryption_shares().len(),
                "decryption_values": session.decryption_values().len(),
                "holders": registry.number_of_active_holders(id)?,
                "reward_pool": registry.total_reward_pool(id)?,
                "rewards": registry.reward_pool_breakdown(id)?,
                "undistributed": registry.undistributed_remainder(id)?,
                "reward_triggered": session.reward_triggered(),
            });
            Ok(serde_json::to_string_pretty(&summary)?)
        })
        .await?;
    println!("{}", text);
    Ok(())
}

pub async fn holders(ledger: &SharedLedger, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let (addresses, keys) = ledger
        .read(|l| l.registry_by_id(id).and_then(|r| r.holder_bls_keys(id)))
        .await?;
    if addresses.is_empty() {
        println!("No holders in session {}", id);
    }
    for (i, (address, key)) in addresses.iter().zip(keys.iter()).enumerate() {
        println!("{:>3}. {}  {}", i + 1, address, key);
    }
    Ok(())
}

pub async fn participant(ledger: &SharedLedger, args: &[String]) -> Result<()> {
    let id = session_id(args)?;
    let who = resolve_account(arg(args, 1, "label")?)?;
    let text = ledger
        .read(|l| -> Result<String> {
            let session = l.session_by_id(id)?;
            let registry = l.registry_by_id(id)?;
            let summary = serde_json::json!({
                "address": who,
                "participant": registry.participant_info(id, &who)?,
                "holder_index": registry.holder_index(id, &who),
                "has_voted": session.has_voted(&who),
                "has_submitted_decryption_value": session.has_submitted_decryption_value(&who),
                "rewards_owed": registry.rewards_owed(id, &who),
                "reward_claimed": registry.reward_claimed(id, &who),
                "deposit_claimed": registry.deposit_claimed(id, &who),
            });
            Ok(serde_json::to_string_pretty(&summary)?)
        })
        .await?;
    println!("{}", text);
    Ok(())
}

pub async fn events(ledger: &SharedLedger, args: &[String]) -> Result<()> {
    let from: u64 = match args.first() {
        Some(_) => parse_arg(args, 0, "from")?,
        None => 0,
    };
    let lines = ledger
        .read(|l| -> Result<Vec<String>> {
            l.events_from(from)
                .iter()
                .map(|r| {
                    Ok(format!(
                        "#{:<5} t={} {} {}",
                        r.seq,
                        r.at,
                        r.emitter.short(),
                        serde_json::to_string(&r.event)?
                    ))
                })
                .collect()
        })
        .await?;
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

pub async fn balance(ledger: &SharedLedger, args: &[String]) -> Result<()> {
    let who = resolve_account(arg(args, 0, "label")?)?;
    println!("{}: {}", who, ledger.balance_of(&who).await);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn list_arguments_drop_blanks() {
        let args = strings(&["yes, no,,maybe "]);
        assert_eq!(list_arg(&args, 0, "options").unwrap(), vec!["yes", "no", "maybe"]);
    }

    #[test]
    fn hex_arguments_accept_prefix() {
        let args = strings(&["0xdead", "beef", "xyz"]);
        assert_eq!(hex_arg(&args, 0, "a").unwrap(), vec![0xde, 0xad]);
        assert_eq!(hex_arg(&args, 1, "b").unwrap(), vec![0xbe, 0xef]);
        assert!(hex_arg(&args, 2, "c").is_err());
    }

    #[test]
    fn missing_and_malformed_arguments_are_named() {
        let args = strings(&["seven"]);
        let err = parse_arg::<u64>(&args, 0, "id").unwrap_err();
        assert!(err.to_string().contains("<id>"));
        let err = arg(&args, 1, "amount").unwrap_err();
        assert_eq!(err.to_string(), "missing argument <amount>");
    }
}
