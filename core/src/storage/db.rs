use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chronoshare_address::Address;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use wincode::{SchemaRead, SchemaWrite};

use crate::directory::SessionDirectory;
use crate::ledger::{ChangeSet, EventRecord, LedgerSnapshot};
use crate::registry::ParticipantRegistry;
use crate::session::VoteSession;
use crate::storage::StateStore;
use crate::Amount;

const CF_DIRECTORY: &str = "directory";
const CF_SESSIONS: &str = "sessions";
const CF_REGISTRIES: &str = "registries";
const CF_BALANCES: &str = "balances";
const CF_EVENTS: &str = "events";

const DIRECTORY_KEY: &[u8] = b"directory";

#[derive(Debug, Clone, Copy, PartialEq, Eq, SchemaRead, SchemaWrite)]
struct BalanceRecord {
    amount: u64,
}

/// A thread-safe wrapper around RocksDB.
///
/// Components are stored whole as JSON under their address. Events are
/// keyed by big-endian sequence number so iteration follows the log.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_DIRECTORY, Options::default()),
            ColumnFamilyDescriptor::new(CF_SESSIONS, Options::default()),
            ColumnFamilyDescriptor::new(CF_REGISTRIES, Options::default()),
            ColumnFamilyDescriptor::new(CF_BALANCES, Options::default()),
            ColumnFamilyDescriptor::new(CF_EVENTS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn balance(&self, account: &Address) -> Result<Amount> {
        let cf = self
            .db
            .cf_handle(CF_BALANCES)
            .context("balances CF missing")?;

        match self.db.get_cf(cf, account.as_bytes())? {
            Some(bytes) => Ok(wincode::deserialize::<BalanceRecord>(&bytes)?.amount),
            None => Ok(0),
        }
    }

    pub fn session(&self, address: &Address) -> Result<Option<VoteSession>> {
        let cf = self
            .db
            .cf_handle(CF_SESSIONS)
            .context("sessions CF missing")?;

        match self.db.get_cf(cf, address.as_bytes())? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).context("corrupt session record")?,
            )),
            None => Ok(None),
        }
    }

    /// Events with `seq >= from`, in order.
    pub fn events_from(&self, from: u64) -> Result<Vec<EventRecord>> {
        let cf = self
            .db
            .cf_handle(CF_EVENTS)
            .context("events CF missing")?;

        let start = from.to_be_bytes();
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(&start, rocksdb::Direction::Forward),
        );

        let mut events = Vec::new();
        for item in iter {
            let (_, value) = item?;
            events.push(serde_json::from_slice(&value).context("corrupt event record")?);
        }
        Ok(events)
    }

    fn load_all<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self
            .db
            .cf_handle(cf_name)
            .with_context(|| format!("{} CF missing", cf_name))?;

        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            out.push(
                serde_json::from_slice(&value)
                    .with_context(|| format!("corrupt record in {}", cf_name))?,
            );
        }
        Ok(out)
    }
}

impl StateStore for RocksDbStore {
    fn load(&self) -> Result<LedgerSnapshot> {
        let cf_directory = self
            .db
            .cf_handle(CF_DIRECTORY)
            .context("directory CF missing")?;
        let directory: Option<SessionDirectory> = match self.db.get_cf(cf_directory, DIRECTORY_KEY)? {
            Some(bytes) => Some(serde_json::from_slice(&bytes).context("corrupt directory record")?),
            None => None,
        };

        let sessions: Vec<VoteSession> = self.load_all(CF_SESSIONS)?;
        let registries: Vec<ParticipantRegistry> = self.load_all(CF_REGISTRIES)?;

        let cf_balances = self
            .db
            .cf_handle(CF_BALANCES)
            .context("balances CF missing")?;
        let mut balances = Vec::new();
        for item in self.db.iterator_cf(cf_balances, IteratorMode::Start) {
            let (key, value) = item?;
            let bytes: [u8; Address::LEN] = key
                .as_ref()
                .try_into()
                .context("invalid balance key length")?;
            let record: BalanceRecord = wincode::deserialize(&value)?;
            balances.push((Address(bytes), record.amount));
        }

        Ok(LedgerSnapshot {
            directory,
            sessions,
            registries,
            balances,
            events: self.events_from(0)?,
        })
    }

    /// Writes the whole change set as one `WriteBatch`.
    fn commit(&self, changes: &ChangeSet) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_directory = self
            .db
            .cf_handle(CF_DIRECTORY)
            .context("directory CF missing")?;
        let cf_sessions = self
            .db
            .cf_handle(CF_SESSIONS)
            .context("sessions CF missing")?;
        let cf_registries = self
            .db
            .cf_handle(CF_REGISTRIES)
            .context("registries CF missing")?;
        let cf_balances = self
            .db
            .cf_handle(CF_BALANCES)
            .context("balances CF missing")?;
        let cf_events = self
            .db
            .cf_handle(CF_EVENTS)
            .context("events CF missing")?;

        if let Some(directory) = &changes.directory {
            batch.put_cf(cf_directory, DIRECTORY_KEY, serde_json::to_vec(directory)?);
        }

        for session in &changes.sessions {
            batch.put_cf(
                cf_sessions,
                session.address().as_bytes(),
                serde_json::to_vec(session)?,
            );
        }

        for registry in &changes.registries {
            batch.put_cf(
                cf_registries,
                registry.address().as_bytes(),
                serde_json::to_vec(registry)?,
            );
        }

        for (account, amount) in &changes.balances {
            let bytes = wincode::serialize(&BalanceRecord { amount: *amount })?;
            batch.put_cf(cf_balances, account.as_bytes(), bytes);
        }

        for event in &changes.events {
            batch.put_cf(cf_events, event.seq.to_be_bytes(), serde_json::to_vec(event)?);
        }

        self.db.write(batch)?;
        Ok(())
    }
}
