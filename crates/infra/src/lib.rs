//! Infrastructure layer: serialized ledger service, value channel, journal, config.

pub mod channel;
pub mod config;
pub mod journal;
pub mod service;


pub use channel::{ChannelError, InMemoryWallets, ValueChannel};
pub use config::{ConfigError, ServerConfig};
pub use journal::{EventJournal, JournalError, LEDGER_AGGREGATE_TYPE};
pub use service::{DispatchError, Envelope, LedgerService};
