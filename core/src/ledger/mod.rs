//! Execution host for directory, session and registry calls.
//!
//! Supplies what every call relies on: an authenticated caller, attached
//! value, a monotonic clock, native balances, an append-only event log and
//! all-or-nothing commits.

mod call;
mod context;
mod effects;
mod engine;
mod events;
mod handle;
mod state;
mod transaction;

pub use call::{Call, DirectoryCall, Outcome, RegistryCall, SessionCall};
pub use context::{CallContext, Clock, ManualClock, SystemClock};
pub use effects::Effects;
pub use engine::Ledger;
pub use events::{Event, EventRecord};
pub use handle::SharedLedger;
pub use state::{directory_address, ChangeSet, LedgerSnapshot, LedgerState};
