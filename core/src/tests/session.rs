use super::common::*;
use crate::{Event, LedgerError, RegistryCall, SessionCall, SessionStatus};

#[test]
fn info_reflects_creation_parameters() {
    let f = Fixture::new(100, 2);
    let info = f.session().info(REG_END);
    assert_eq!(info.title, "Board election");
    assert_eq!(info.start_date, REG_END);
    assert_eq!(info.end_date, VOTE_END);
    assert_eq!(info.shares_end_date, SHARES_END);
    assert_eq!(info.options, vec!["alice".to_string(), "bob".to_string()]);
    assert_eq!(info.required_deposit, 100);
    assert_eq!(info.min_share_threshold, 2);
    assert_eq!(info.status, SessionStatus::VotingOpen);
    assert_eq!(f.session().registration_end_date(), REG_END);

    let directory = f.ledger.directory();
    assert_eq!(directory.deployed_session_count(), 1);
    assert_eq!(directory.vote_session_address(0), Some(f.pair.session));
    assert_eq!(directory.registry_address(0), Some(f.pair.registry));
}

#[test]
fn only_registered_participants_vote_once() {
    let mut f = Fixture::new(100, 1);
    let voter = user("voter");
    let outsider = user("outsider");
    f.register(voter).unwrap();
    f.register(user("second")).unwrap();
    f.at(REG_END);

    assert_eq!(f.vote(outsider), Err(LedgerError::NotRegistered(outsider)));
    assert_eq!(f.vote(voter), Ok(0));
    assert_eq!(f.vote(voter), Err(LedgerError::AlreadyVoted(voter)));
    assert_eq!(f.vote(user("second")), Ok(1));

    let session = f.session();
    assert!(session.has_voted(&voter));
    assert!(!session.has_voted(&outsider));
    assert_eq!(session.number_of_votes(), 2);
    let first = session.vote(0).unwrap();
    assert_eq!(first.voter, voter);
    assert_eq!(first.ciphertext, submission().ciphertext);
    assert!(session.vote(2).is_none());
}

#[test]
fn share_submission_rules() {
    let mut f = Fixture::new(100, 2);
    let h1 = f.funded("h1", 100);
    let h2 = f.funded("h2", 100);
    let voter = user("voter");
    let id = f.id();
    f.join(h1, 100).unwrap();
    f.join(h2, 100).unwrap();
    f.register(voter).unwrap();
    f.at(REG_END);
    let v = f.vote(voter).unwrap();
    f.at(VOTE_END);

    assert_eq!(f.submit_shares(voter, v), Err(LedgerError::NotHolder(voter)));
    assert_eq!(f.submit_shares(h1, 9), Err(LedgerError::VoteNotFound(9)));

    f.submit_shares(h1, v).unwrap();
    assert!(!f.session().has_reached_share_threshold(v));
    assert_eq!(f.submit_shares(h1, v), Err(LedgerError::AlreadySubmitted(h1)));

    f.submit_shares(h2, v).unwrap();
    assert!(f.session().has_reached_share_threshold(v));

    let shares = f.session().shares_for_vote(v);
    assert_eq!(shares.len(), 2);
    assert_eq!(shares[0].holder, h1);
    assert_eq!(shares[0].share_index, 1);
    assert_eq!(shares[1].share_index, 2);
    assert_eq!(f.registry().holder_index(id, &h2), Some(2));

    let recorded = f
        .ledger
        .state()
        .events()
        .iter()
        .filter(|r| matches!(r.event, Event::SharesRecorded { .. }))
        .count();
    assert_eq!(recorded, 2);
}

#[test]
fn decryption_values_follow_shares() {
    let mut f = Fixture::new(100, 1);
    let holder = f.funded("holder", 100);
    f.join(holder, 100).unwrap();
    f.at(REG_END);
    let v = f.vote(holder).unwrap();
    f.at(VOTE_END);

    let publish = |value: &str| SessionCall::SubmitDecryptionValue {
        value_hex: value.to_string(),
    };

    assert_eq!(
        f.session_call(holder, publish("0x01")),
        Err(LedgerError::SharesNotSubmitted(holder))
    );
    f.submit_shares(holder, v).unwrap();
    f.session_call(holder, publish("0x01")).unwrap();
    assert_eq!(
        f.session_call(holder, publish("0x02")),
        Err(LedgerError::AlreadySubmitted(holder))
    );
    assert!(f.session().has_submitted_decryption_value(&holder));
    assert_eq!(f.session().decryption_values().len(), 1);
    assert_eq!(f.session().decryption_values()[0].value_hex, "0x01");
}

#[test]
fn holder_keys_are_enumerated_in_join_order() {
    let mut f = Fixture::new(1, 1);
    let a = f.funded("a", 1);
    let b = f.funded("b", 1);
    let id = f.id();
    f.join(a, 1).unwrap();
    f.register(user("voter")).unwrap();
    f.join(b, 1).unwrap();

    let (addresses, keys) = f.registry().holder_bls_keys(id).unwrap();
    assert_eq!(addresses, vec![a, b]);
    assert_eq!(keys[0], format!("b1{}", hex::encode(a.as_bytes())));
    assert_eq!(f.registry().active_holders(id).unwrap(), &[a, b]);
    assert!(f.registry().is_registered(id, &user("voter")));
    assert_eq!(f.registry().holder_index(id, &user("voter")), None);
}

#[test]
fn abort_is_owner_only_and_sticky() {
    let mut f = Fixture::new(100, 1);
    let holder = f.funded("holder", 100);
    let voter = user("voter");
    let owner = f.owner;
    let id = f.id();
    f.join(holder, 100).unwrap();
    f.register(voter).unwrap();
    f.fund(40).unwrap();
    f.at(REG_END);

    assert!(matches!(
        f.session_call(voter, SessionCall::Abort),
        Err(LedgerError::Unauthorized { .. })
    ));
    f.session_call(owner, SessionCall::Abort).unwrap();

    assert_eq!(
        f.vote(voter),
        Err(LedgerError::PhaseViolation {
            operation: "castVote",
            status: SessionStatus::Aborted,
        })
    );
    f.at(SHARES_END);
    let refreshed = f
        .session_call(voter, SessionCall::RefreshStatus)
        .unwrap()
        .status();
    assert_eq!(refreshed, Some(SessionStatus::Aborted));
    assert!(matches!(
        f.calculate(owner),
        Err(LedgerError::PhaseViolation { .. })
    ));
    assert!(matches!(
        f.session_call(owner, SessionCall::Abort),
        Err(LedgerError::PhaseViolation { .. })
    ));
    assert!(matches!(f.fund(1), Err(LedgerError::PhaseViolation { .. })));

    // funds leave through the abort exits, once each
    let refund = RegistryCall::RefundAbortedDeposit { session_id: id };
    assert_eq!(
        f.registry_call(holder, 0, refund.clone()).unwrap().amount(),
        Some(100)
    );
    assert_eq!(
        f.registry_call(holder, 0, refund),
        Err(LedgerError::AlreadyClaimed(holder))
    );
    assert!(f.claim_deposit(holder).is_err());

    let reclaim = RegistryCall::ReclaimExternalFunding { session_id: id };
    assert!(matches!(
        f.registry_call(holder, 0, reclaim.clone()),
        Err(LedgerError::Unauthorized { .. })
    ));
    assert_eq!(
        f.registry_call(owner, 0, reclaim.clone()).unwrap().amount(),
        Some(40)
    );
    assert_eq!(
        f.registry_call(owner, 0, reclaim),
        Err(LedgerError::AlreadyClaimed(owner))
    );
    assert_eq!(f.balance(&f.pair.registry), 0);
    assert_eq!(f.balance(&holder), 100);
}

#[test]
fn abort_is_refused_once_completed() {
    let mut f = Fixture::new(100, 1);
    let owner = f.owner;
    f.at(SHARES_END);
    assert_eq!(
        f.session_call(owner, SessionCall::Abort),
        Err(LedgerError::PhaseViolation {
            operation: "abort",
            status: SessionStatus::Completed,
        })
    );
    let holder = f.funded("holder", 0);
    assert!(matches!(
        f.registry_call(holder, 0, RegistryCall::RefundAbortedDeposit { session_id: 0 }),
        Err(LedgerError::PhaseViolation { .. })
    ));
}

#[test]
fn events_are_sequenced_without_gaps() {
    let mut f = Fixture::new(100, 1);
    let holder = f.funded("holder", 100);
    f.join(holder, 100).unwrap();
    let _ = f.join(holder, 100);
    f.at(REG_END);
    f.vote(holder).unwrap();

    let events = f.ledger.state().events();
    for (i, record) in events.iter().enumerate() {
        assert_eq!(record.seq, i as u64);
    }
    assert!(matches!(
        events[0].event,
        Event::SessionPairDeployed { session_id: 0, .. }
    ));
    assert_eq!(events[0].emitter, f.ledger.directory().address());
    assert!(matches!(events[1].event, Event::SessionContractLinked { .. }));
    assert!(matches!(
        events.last().map(|r| &r.event),
        Some(Event::VoteCast { vote_index: 0, .. })
    ));
    assert_eq!(f.ledger.events_from(2).len(), events.len() - 2);
}
