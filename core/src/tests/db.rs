use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::TempDir;

use super::common::*;
use crate::ledger::ChangeSet;
use crate::ledger::LedgerSnapshot;
use crate::{
    Call, DirectoryCall, ErrorKind, Ledger, ManualClock, MemStore, RegistryCall, RocksDbStore,
    SessionCall, StateStore,
};

/// Keeps the directory alive for as long as the store is in use.
fn temp_db() -> (TempDir, RocksDbStore) {
    let dir = TempDir::new().unwrap();
    let store = RocksDbStore::open(dir.path()).unwrap();
    (dir, store)
}

fn run_session(ledger: &mut Ledger, clock: &ManualClock) -> crate::DeployedPair {
    let owner = user("owner");
    let holder = user("holder");
    ledger.airdrop(owner, 1_000).unwrap();
    ledger.airdrop(holder, 100).unwrap();

    let pair = ledger
        .execute(
            owner,
            0,
            Call::Directory(DirectoryCall::CreateSessionPair(params(100, 1))),
        )
        .unwrap()
        .pair()
        .unwrap();
    let registry = pair.registry;
    ledger
        .execute(
            holder,
            100,
            Call::Registry {
                registry,
                call: RegistryCall::JoinAsHolder {
                    session_id: pair.session_id,
                    bls_public_key_hex: "b1".into(),
                },
            },
        )
        .unwrap();

    clock.set(REG_END);
    ledger
        .execute(
            holder,
            0,
            Call::Session {
                session: pair.session,
                call: SessionCall::CastVote(submission()),
            },
        )
        .unwrap();
    pair
}

#[test]
fn empty_store_loads_empty_snapshot() {
    let (_dir, db) = temp_db();
    let snapshot = db.load().unwrap();
    assert!(snapshot.directory.is_none());
    assert!(snapshot.sessions.is_empty());
    assert!(snapshot.events.is_empty());
}

#[test]
fn ledger_survives_reopen() {
    let (dir, db) = temp_db();
    let clock = ManualClock::new(T0);

    let (pair, before) = {
        let mut ledger = Ledger::open(db, Arc::new(clock.clone())).unwrap();
        let pair = run_session(&mut ledger, &clock);
        (pair, ledger.state().clone())
    };

    let reopened = RocksDbStore::open(dir.path()).unwrap();
    let ledger = Ledger::open(reopened, Arc::new(clock.clone())).unwrap();

    assert_eq!(ledger.state(), &before);
    assert_eq!(ledger.balance_of(&pair.registry), 100);
    assert_eq!(ledger.session(&pair.session).unwrap().number_of_votes(), 1);
    assert!(
        ledger
            .registry(&pair.registry)
            .unwrap()
            .is_registered(pair.session_id, &user("holder"))
    );
    assert_eq!(ledger.now(), REG_END);
}

#[test]
fn failed_calls_leave_the_store_untouched() {
    let (_dir, db) = temp_db();
    let clock = ManualClock::new(T0);
    let mut ledger = Ledger::open(db.clone(), Arc::new(clock.clone())).unwrap();
    let pair = run_session(&mut ledger, &clock);

    let before = db.load().unwrap();
    let err = ledger.execute(
        user("holder"),
        0,
        Call::Session {
            session: pair.session,
            call: SessionCall::CastVote(submission()),
        },
    );
    assert!(err.is_err());
    assert_eq!(db.load().unwrap(), before);
}

#[test]
fn events_are_read_back_in_order() {
    let (_dir, db) = temp_db();
    let clock = ManualClock::new(T0);
    let mut ledger = Ledger::open(db.clone(), Arc::new(clock.clone())).unwrap();
    run_session(&mut ledger, &clock);

    let all = db.events_from(0).unwrap();
    assert_eq!(all.len(), ledger.state().events().len());
    assert!(all.windows(2).all(|w| w[0].seq + 1 == w[1].seq));

    let tail = db.events_from(3).unwrap();
    assert_eq!(tail.first().map(|e| e.seq), Some(3));
}

#[test]
fn balances_round_trip_through_wincode() {
    let (_dir, db) = temp_db();
    let who = user("who");
    db.commit(&ChangeSet {
        balances: vec![(who, 42)],
        ..Default::default()
    })
    .unwrap();
    assert_eq!(db.balance(&who).unwrap(), 42);
    assert_eq!(db.balance(&user("nobody")).unwrap(), 0);
    assert_eq!(db.load().unwrap().balances, vec![(who, 42)]);
}

#[test]
fn mem_store_reopens_with_the_same_state() {
    let store = MemStore::new();
    let clock = ManualClock::new(T0);
    let before = {
        let mut ledger = Ledger::open(store.clone(), Arc::new(clock.clone())).unwrap();
        run_session(&mut ledger, &clock);
        ledger.state().clone()
    };
    let ledger = Ledger::open(store.clone(), Arc::new(clock)).unwrap();
    assert_eq!(ledger.state(), &before);
    assert_eq!(store.event_count(), before.events().len());
}

/// In-memory store whose commits can be switched off.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: MemStore,
    refuse: Arc<AtomicBool>,
}

impl StateStore for FlakyStore {
    fn load(&self) -> anyhow::Result<LedgerSnapshot> {
        self.inner.load()
    }

    fn commit(&self, changes: &ChangeSet) -> anyhow::Result<()> {
        if self.refuse.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.commit(changes)
    }
}

#[test]
fn refused_commit_leaves_memory_and_events_untouched() {
    let store = FlakyStore::default();
    let clock = ManualClock::new(T0);
    let mut ledger = Ledger::open(store.clone(), Arc::new(clock.clone())).unwrap();
    let owner = user("owner");
    let holder = user("holder");
    ledger.airdrop(holder, 500).unwrap();
    let pair = ledger
        .execute(
            owner,
            0,
            Call::Directory(DirectoryCall::CreateSessionPair(params(100, 1))),
        )
        .unwrap()
        .pair()
        .unwrap();

    let before = ledger.state().clone();
    store.refuse.store(true, Ordering::SeqCst);
    let err = ledger
        .execute(
            holder,
            100,
            Call::Registry {
                registry: pair.registry,
                call: RegistryCall::JoinAsHolder {
                    session_id: pair.session_id,
                    bls_public_key_hex: "b1aa".into(),
                },
            },
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(ledger.state(), &before);
    assert_eq!(ledger.balance_of(&holder), 500);
    assert_eq!(store.inner.event_count(), before.events().len());

    store.refuse.store(false, Ordering::SeqCst);
    let reopened = Ledger::open(store.inner.clone(), Arc::new(clock)).unwrap();
    assert_eq!(reopened.state(), &before);
}
