//! Ledger transition pipeline (application-level orchestration).
//!
//! `LedgerService` owns the ledger aggregate and is the only way to mutate it.
//!
//! ```text
//! Command
//!   ↓
//! 1. Reentry guard + transition lock (one global order)
//!   ↓
//! 2. Decide (pure `handle`, rejections leave state untouched)
//!   ↓
//! 3. Move value: collect deposit before applying, or apply then pay out
//!    (a failed payout restores the pre-transition checkpoint)
//!   ↓
//! 4. Commit: committed read model, journal, event bus
//! ```
//!
//! Reads are served from the committed read model, so they never wait on an
//! in-flight payout and never observe a transition that may still roll back.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::ThreadId;

use curvebook_core::{AccountId, Aggregate, AggregateRoot, LedgerError};
use curvebook_events::{Event, EventBus, EventEnvelope, Subscription};
use curvebook_ledger::{
    Approve, Buy, BuyQuote, DecreaseAllowance, FallbackCall, IncreaseAllowance, Ledger,
    LedgerCommand, LedgerEvent, LedgerId, LedgerSnapshot, ReceiveValue, Sell, SellQuote, Transfer,
    TransferFrom,
};
use chrono::Utc;

use crate::channel::{ChannelError, ValueChannel};
use crate::journal::{EventJournal, envelope_for};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Domain rejection; nothing changed.
    #[error(transparent)]
    Rejected(#[from] LedgerError),
    /// The seller could not be paid; the sale was rolled back.
    #[error("payout of {amount} to {account} failed: {source}")]
    PayoutFailed {
        account: AccountId,
        amount: u128,
        source: ChannelError,
    },
    /// The attached value could not be collected; nothing changed.
    #[error("deposit of {amount} from {account} failed: {source}")]
    DepositFailed {
        account: AccountId,
        amount: u128,
        source: ChannelError,
    },
    /// A transition was attempted from inside another transition's value call.
    #[error("reentrant transition by {account}")]
    Reentrancy { account: AccountId },
    #[error("ledger state lock poisoned")]
    Poisoned,
}

impl DispatchError {
    /// Stable machine-readable code (used by transport layers).
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::Rejected(e) => e.code(),
            DispatchError::PayoutFailed { .. } => "payout_failed",
            DispatchError::DepositFailed { .. } => "deposit_failed",
            DispatchError::Reentrancy { .. } => "reentrancy",
            DispatchError::Poisoned => "storage_fault",
        }
    }
}

impl<T> From<PoisonError<T>> for DispatchError {
    fn from(_: PoisonError<T>) -> Self {
        DispatchError::Poisoned
    }
}

pub type Envelope = EventEnvelope<LedgerEvent>;

/// The transition currently holding the ledger lock.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    thread: ThreadId,
    /// Counterparty of a value call that has not returned yet.
    pending: Option<AccountId>,
}

impl InFlight {
    fn blocks(&self, thread: ThreadId, caller: AccountId) -> bool {
        self.thread == thread || self.pending == Some(caller)
    }
}

/// Exclusive right to run one transition. Clears the reentry owner before
/// the ledger lock is released.
struct Turn<'a> {
    ledger: MutexGuard<'a, Ledger>,
    owner: &'a Mutex<Option<InFlight>>,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        if let Ok(mut owner) = self.owner.lock() {
            *owner = None;
        }
    }
}

/// Serialized, value-moving front of a single [`Ledger`].
///
/// ## Generic Parameters
///
/// - `C`: value channel moving backing currency in and out of the reserve
/// - `B`: event bus receiving committed events
pub struct LedgerService<C, B> {
    live: Mutex<Ledger>,
    committed: RwLock<Ledger>,
    owner: Mutex<Option<InFlight>>,
    journal: EventJournal,
    channel: C,
    bus: B,
}

impl<C, B> LedgerService<C, B>
where
    C: ValueChannel,
    B: EventBus<Envelope>,
{
    pub fn new(ledger: Ledger, channel: C, bus: B) -> Self {
        Self {
            committed: RwLock::new(ledger.clone()),
            live: Mutex::new(ledger),
            owner: Mutex::new(None),
            journal: EventJournal::new(),
            channel,
            bus,
        }
    }

    pub fn ledger_id(&self) -> Result<LedgerId, DispatchError> {
        self.read(|ledger| *ledger.id())
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    pub fn subscribe(&self) -> Subscription<Envelope> {
        self.bus.subscribe()
    }

    // --- transitions ---------------------------------------------------------

    /// Mint against `deposit`, collected from the caller first. Returns units minted.
    pub fn buy(&self, caller: AccountId, deposit: u128) -> Result<u128, DispatchError> {
        let events = self.execute(LedgerCommand::Buy(Buy {
            caller,
            deposit,
            occurred_at: Utc::now(),
        }))?;
        Ok(events
            .iter()
            .find_map(|e| match e {
                LedgerEvent::Bought(b) => Some(b.minted),
                _ => None,
            })
            .unwrap_or(0))
    }

    /// Burn `amount` and pay the caller from the reserve. Returns the payout.
    pub fn sell(&self, caller: AccountId, amount: u128) -> Result<u128, DispatchError> {
        let events = self.execute(LedgerCommand::Sell(Sell {
            caller,
            amount,
            occurred_at: Utc::now(),
        }))?;
        Ok(payout_of(&events).unwrap_or(0))
    }

    pub fn transfer(&self, caller: AccountId, to: AccountId, value: u128) -> Result<bool, DispatchError> {
        self.execute(LedgerCommand::Transfer(Transfer {
            caller,
            to,
            value,
            occurred_at: Utc::now(),
        }))
        .map(|_| true)
    }

    pub fn approve(&self, caller: AccountId, spender: AccountId, value: u128) -> Result<bool, DispatchError> {
        self.execute(LedgerCommand::Approve(Approve {
            caller,
            spender,
            value,
            occurred_at: Utc::now(),
        }))
        .map(|_| true)
    }

    pub fn transfer_from(
        &self,
        caller: AccountId,
        from: AccountId,
        to: AccountId,
        value: u128,
    ) -> Result<bool, DispatchError> {
        self.execute(LedgerCommand::TransferFrom(TransferFrom {
            caller,
            from,
            to,
            value,
            occurred_at: Utc::now(),
        }))
        .map(|_| true)
    }

    pub fn increase_allowance(
        &self,
        caller: AccountId,
        spender: AccountId,
        delta: u128,
    ) -> Result<bool, DispatchError> {
        self.execute(LedgerCommand::IncreaseAllowance(IncreaseAllowance {
            caller,
            spender,
            delta,
            occurred_at: Utc::now(),
        }))
        .map(|_| true)
    }

    pub fn decrease_allowance(
        &self,
        caller: AccountId,
        spender: AccountId,
        delta: u128,
    ) -> Result<bool, DispatchError> {
        self.execute(LedgerCommand::DecreaseAllowance(DecreaseAllowance {
            caller,
            spender,
            delta,
            occurred_at: Utc::now(),
        }))
        .map(|_| true)
    }

    /// Reserve top-up without minting.
    pub fn receive(&self, caller: AccountId, value: u128) -> Result<(), DispatchError> {
        self.execute(LedgerCommand::Receive(ReceiveValue {
            caller,
            value,
            occurred_at: Utc::now(),
        }))
        .map(|_| ())
    }

    /// Fallback entry: accepts value like `receive`, ignores `data`.
    pub fn fallback(&self, caller: AccountId, value: u128, data: Vec<u8>) -> Result<(), DispatchError> {
        self.execute(LedgerCommand::Fallback(FallbackCall {
            caller,
            value,
            data,
            occurred_at: Utc::now(),
        }))
        .map(|_| ())
    }

    /// Run one command through the full pipeline and return its committed events.
    ///
    /// A rejected command (any `Err`) leaves the ledger, the reserve and the
    /// value channel exactly as they were.
    pub fn execute(&self, command: LedgerCommand) -> Result<Vec<LedgerEvent>, DispatchError> {
        let caller = command.caller();

        // 1) Reentry guard + transition lock
        let mut turn = self.enter(caller)?;

        // 2) Decide events (no mutation)
        let decided = turn.ledger.handle(&command).map_err(|e| {
            tracing::debug!(command = command.name(), %caller, code = e.code(), "transition rejected");
            DispatchError::from(e)
        })?;
        if decided.is_empty() {
            return Ok(decided);
        }

        // 3) Move value around the state change
        match payout_of(&decided) {
            Some(payout) => {
                // Mutate-then-call: the burn is in place before the seller sees value.
                let checkpoint = turn.ledger.checkpoint(&decided);
                for event in &decided {
                    turn.ledger.apply(event);
                }
                if let Err(source) = self.value_call(caller, || self.channel.pay(caller, payout)) {
                    turn.ledger.restore(checkpoint);
                    tracing::warn!(%caller, payout, error = %source, "payout failed, sale rolled back");
                    return Err(DispatchError::PayoutFailed {
                        account: caller,
                        amount: payout,
                        source,
                    });
                }
            }
            None => {
                let attached = command.attached_value();
                if attached > 0 {
                    if let Err(source) = self.value_call(caller, || self.channel.collect(caller, attached)) {
                        tracing::warn!(%caller, amount = attached, error = %source, "deposit collection failed");
                        return Err(DispatchError::DepositFailed {
                            account: caller,
                            amount: attached,
                            source,
                        });
                    }
                }
                for event in &decided {
                    turn.ledger.apply(event);
                }
            }
        }

        // 4) Commit
        self.commit(&turn.ledger, &decided);
        log_accepted(&command, &decided);

        Ok(decided)
    }

    /// Take the transition lock, rejecting nested transitions.
    ///
    /// A transition is nested when it comes from the thread holding the turn,
    /// or from the counterparty of a pending value call on any thread. Both
    /// would otherwise wait on the lock their own value call is holding.
    fn enter(&self, caller: AccountId) -> Result<Turn<'_>, DispatchError> {
        let me = std::thread::current().id();
        let in_flight = *self.owner.lock()?;
        if let Some(in_flight) = in_flight {
            if in_flight.blocks(me, caller) {
                tracing::warn!(account = %caller, "reentrant transition rejected");
                return Err(DispatchError::Reentrancy { account: caller });
            }
        }

        let ledger = self.live.lock()?;
        *self.owner.lock()? = Some(InFlight {
            thread: me,
            pending: None,
        });
        Ok(Turn {
            ledger,
            owner: &self.owner,
        })
    }

    /// Run a value-channel call with `account` marked as its pending counterparty.
    fn value_call<T>(&self, account: AccountId, call: impl FnOnce() -> T) -> T {
        self.mark_pending(Some(account));
        let result = call();
        self.mark_pending(None);
        result
    }

    fn mark_pending(&self, account: Option<AccountId>) {
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(in_flight) = owner.as_mut() {
            in_flight.pending = account;
        }
    }

    fn commit(&self, live: &Ledger, events: &[LedgerEvent]) {
        let first = live.version() - events.len() as u64 + 1;
        {
            let mut committed = self
                .committed
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if self.committed.is_poisoned() || committed.version() + 1 != first {
                // The live ledger is authoritative while the turn is held.
                tracing::warn!(version = live.version(), "committed read model resynced");
                *committed = live.clone();
                self.committed.clear_poison();
            } else {
                for event in events {
                    committed.apply(event);
                }
            }
        }

        for (sequence, event) in (first..).zip(events) {
            let envelope = envelope_for(*live.id(), sequence, event.clone());
            if let Err(e) = self.journal.append(envelope.clone()) {
                tracing::error!(error = %e, sequence, "journal append failed");
            }
            if let Err(e) = self.bus.publish(envelope) {
                tracing::warn!(error = ?e, sequence, "event publication failed");
            }
        }
    }

    // --- reads (committed state) ----------------------------------------------

    fn read<T>(&self, f: impl FnOnce(&Ledger) -> T) -> Result<T, DispatchError> {
        let committed = self.committed.read()?;
        Ok(f(&committed))
    }

    pub fn current_price(&self) -> Result<u128, DispatchError> {
        Ok(self.read(|l| l.current_price())??)
    }

    pub fn balance_of(&self, account: AccountId) -> Result<u128, DispatchError> {
        self.read(|l| l.balance_of(account))
    }

    pub fn allowance(&self, owner: AccountId, spender: AccountId) -> Result<u128, DispatchError> {
        self.read(|l| l.allowance(owner, spender))
    }

    pub fn total_supply(&self) -> Result<u128, DispatchError> {
        self.read(|l| l.total_supply())
    }

    pub fn reserve(&self) -> Result<u128, DispatchError> {
        self.read(|l| l.reserve())
    }

    pub fn net_traded(&self) -> Result<u128, DispatchError> {
        self.read(|l| l.net_traded())
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot, DispatchError> {
        Ok(self.read(|l| l.snapshot())??)
    }

    pub fn quote_buy(&self, deposit: u128) -> Result<BuyQuote, DispatchError> {
        Ok(self.read(|l| l.quote_buy(deposit))??)
    }

    pub fn quote_sell(&self, amount: u128) -> Result<SellQuote, DispatchError> {
        Ok(self.read(|l| l.quote_sell(amount))??)
    }

    /// A copy of the committed ledger.
    pub fn committed_state(&self) -> Result<Ledger, DispatchError> {
        self.read(Ledger::clone)
    }
}

fn payout_of(events: &[LedgerEvent]) -> Option<u128> {
    events.iter().find_map(|e| match e {
        LedgerEvent::Sold(s) => Some(s.payout),
        _ => None,
    })
}

fn log_accepted(command: &LedgerCommand, events: &[LedgerEvent]) {
    for event in events {
        match event {
            LedgerEvent::Bought(e) => {
                tracing::info!(caller = %e.caller, deposit = e.deposit, minted = e.minted, price = e.price, "bought");
            }
            LedgerEvent::Sold(e) => {
                tracing::info!(caller = %e.caller, amount = e.amount, payout = e.payout, price = e.price, "sold");
            }
            other => {
                tracing::debug!(command = command.name(), event_type = other.event_type(), "transition accepted");
            }
        }
    }
}
