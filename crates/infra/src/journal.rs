//! Append-only journal of committed ledger events.

use std::sync::RwLock;

use curvebook_core::Aggregate;
use curvebook_events::{Event, EventEnvelope};
use curvebook_ledger::{Ledger, LedgerEvent, LedgerId};
use uuid::Uuid;

/// Aggregate type recorded on every envelope.
pub const LEDGER_AGGREGATE_TYPE: &str = "curvebook.ledger";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JournalError {
    #[error("expected sequence {expected}, got {found}")]
    OutOfOrder { expected: u64, found: u64 },
    #[error("journal lock poisoned")]
    Poisoned,
}

/// In-memory append-only event journal.
///
/// Sequence numbers are the ledger version after each event, so they start
/// at 1 and have no gaps.
#[derive(Debug, Default)]
pub struct EventJournal {
    entries: RwLock<Vec<EventEnvelope<LedgerEvent>>>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, envelope: EventEnvelope<LedgerEvent>) -> Result<(), JournalError> {
        let mut entries = self.entries.write().map_err(|_| JournalError::Poisoned)?;
        let expected = entries.len() as u64 + 1;
        if envelope.sequence_number() != expected {
            return Err(JournalError::OutOfOrder {
                expected,
                found: envelope.sequence_number(),
            });
        }
        entries.push(envelope);
        Ok(())
    }

    pub fn entries(&self) -> Result<Vec<EventEnvelope<LedgerEvent>>, JournalError> {
        let entries = self.entries.read().map_err(|_| JournalError::Poisoned)?;
        Ok(entries.clone())
    }

    /// Entries with a sequence number strictly greater than `after`.
    pub fn since(&self, after: u64) -> Result<Vec<EventEnvelope<LedgerEvent>>, JournalError> {
        let entries = self.entries.read().map_err(|_| JournalError::Poisoned)?;
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(entries.len());
        Ok(entries[start..].to_vec())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild a ledger by applying every journaled event to `empty`.
    pub fn replay(&self, mut empty: Ledger) -> Result<Ledger, JournalError> {
        let entries = self.entries.read().map_err(|_| JournalError::Poisoned)?;
        for envelope in entries.iter() {
            empty.apply(envelope.payload());
        }
        Ok(empty)
    }
}

/// Wrap an event committed as the `sequence`-th event of the ledger stream.
pub fn envelope_for(ledger_id: LedgerId, sequence: u64, event: LedgerEvent) -> EventEnvelope<LedgerEvent> {
    tracing::trace!(event_type = event.event_type(), sequence, "enveloping event");
    EventEnvelope::new(Uuid::now_v7(), ledger_id.0, LEDGER_AGGREGATE_TYPE, sequence, event)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use curvebook_core::{AccountId, AggregateId, AggregateRoot};
    use curvebook_events::execute;
    use curvebook_ledger::{Buy, LedgerCommand, LedgerId, ReceiveValue};

    use super::*;

    fn ledger_id() -> LedgerId {
        LedgerId::new(AggregateId::new())
    }

    #[test]
    fn replay_rebuilds_live_state() {
        let id = ledger_id();
        let mut live = Ledger::empty(id);
        let journal = EventJournal::new();
        let alice = AccountId::new();

        for cmd in [
            LedgerCommand::Buy(Buy {
                caller: alice,
                deposit: 10u128.pow(18),
                occurred_at: Utc::now(),
            }),
            LedgerCommand::Receive(ReceiveValue {
                caller: alice,
                value: 5,
                occurred_at: Utc::now(),
            }),
        ] {
            for event in live.handle(&cmd).unwrap() {
                live.apply(&event);
                journal.append(envelope_for(id, live.version(), event)).unwrap();
            }
        }

        assert_eq!(journal.len(), 2);
        assert_eq!(journal.replay(Ledger::empty(id)).unwrap(), live);
        assert_eq!(journal.since(1).unwrap().len(), 1);

        // replay from a fresh ledger matches executing the same commands
        let mut other = Ledger::empty(id);
        execute(
            &mut other,
            &LedgerCommand::Buy(Buy {
                caller: alice,
                deposit: 10u128.pow(18),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(other.balance_of(alice), live.balance_of(alice));
    }

    #[test]
    fn rejects_gaps() {
        let id = ledger_id();
        let mut ledger = Ledger::empty(id);
        let cmd = LedgerCommand::Receive(ReceiveValue {
            caller: AccountId::new(),
            value: 1,
            occurred_at: Utc::now(),
        });
        let events = ledger.handle(&cmd).unwrap();
        ledger.apply(&events[0]);
        ledger.apply(&events[0]);
        let journal = EventJournal::new();

        let err = journal.append(envelope_for(id, ledger.version(), events[0].clone())).unwrap_err();

        assert_eq!(err, JournalError::OutOfOrder { expected: 1, found: 2 });
        assert!(journal.is_empty());
    }
}
