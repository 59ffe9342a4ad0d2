use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use curvebook_core::{
    AccountId, Aggregate, AggregateId, AggregateRoot, LedgerError, LedgerResult, checked_add,
};
use curvebook_events::Event;
use curvebook_pricing::PricingEngine;

/// Ledger identifier (aggregate id).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerId(pub AggregateId);

impl LedgerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LedgerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Ledger (balances, allowances, supply, volume, reserve).
///
/// Invariants:
/// - the sum of all balances equals `total_supply`
/// - `total_supply` moves only through buy (mint) and sell (burn)
/// - `net_traded` never goes below zero
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    id: LedgerId,
    engine: PricingEngine,
    balances: HashMap<AccountId, u128>,
    allowances: HashMap<(AccountId, AccountId), u128>,
    total_supply: u128,
    net_traded: u128,
    reserve: u128,
    version: u64,
}

impl Ledger {
    /// Empty ledger priced by the build-time curve.
    pub fn empty(id: LedgerId) -> Self {
        Self::with_engine(id, PricingEngine::DEFAULT)
    }

    pub fn with_engine(id: LedgerId, engine: PricingEngine) -> Self {
        Self {
            id,
            engine,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: 0,
            net_traded: 0,
            reserve: 0,
            version: 0,
        }
    }

    pub fn engine(&self) -> &PricingEngine {
        &self.engine
    }

    pub fn balance_of(&self, account: AccountId) -> u128 {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: AccountId, spender: AccountId) -> u128 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn net_traded(&self) -> u128 {
        self.net_traded
    }

    pub fn reserve(&self) -> u128 {
        self.reserve
    }

    /// Unit price at the current net traded volume.
    pub fn current_price(&self) -> LedgerResult<u128> {
        self.engine.price(self.net_traded)
    }

    /// Accounts currently holding a non-zero balance.
    pub fn holders(&self) -> impl Iterator<Item = (AccountId, u128)> + '_ {
        self.balances
            .iter()
            .filter(|(_, balance)| **balance > 0)
            .map(|(account, balance)| (*account, *balance))
    }

    /// `sum(balances) == total_supply` and `total_supply == 0 => net_traded == 0`.
    pub fn invariants_hold(&self) -> bool {
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, balance| acc.checked_add(*balance));
        sum == Some(self.total_supply) && (self.total_supply != 0 || self.net_traded == 0)
    }

    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        Ok(LedgerSnapshot {
            ledger_id: self.id,
            version: self.version,
            total_supply: self.total_supply,
            net_traded: self.net_traded,
            reserve: self.reserve,
            current_price: self.current_price()?,
            holders: self.holders().count(),
        })
    }

    /// Preview a buy against the current state.
    ///
    /// Rejects with exactly the errors `buy` would, without touching state.
    pub fn quote_buy(&self, deposit: u128) -> LedgerResult<BuyQuote> {
        if deposit == 0 {
            return Err(LedgerError::ZeroDeposit);
        }
        let price = self.current_price()?;
        if price == 0 {
            return Err(LedgerError::InvalidPrice);
        }
        let minted = self.engine.tokens_for_value(deposit, price)?;
        if minted == 0 {
            return Err(LedgerError::DepositTooSmall);
        }
        checked_add(self.total_supply, minted)?;
        checked_add(self.net_traded, minted)?;
        checked_add(self.reserve, deposit)?;
        Ok(BuyQuote { minted, price })
    }

    /// Preview a sell of `amount` units against the current state, ignoring
    /// the seller's balance.
    ///
    /// The price is taken at the pre-burn volume: a seller gets the price as
    /// of before their own sale reduces it.
    pub fn quote_sell(&self, amount: u128) -> LedgerResult<SellQuote> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let price = self.current_price()?;
        let payout = self.engine.value_for_tokens(amount, price)?;
        if self.reserve < payout {
            return Err(LedgerError::ReserveExhausted {
                reserve: self.reserve,
                owed: payout,
            });
        }
        Ok(SellQuote { payout, price })
    }

    /// Capture every field the given events will touch.
    ///
    /// Restoring the checkpoint after applying those events yields a ledger
    /// equal to the one the checkpoint was taken from.
    pub fn checkpoint(&self, events: &[LedgerEvent]) -> Checkpoint {
        let mut balances = Vec::new();
        let mut allowances = Vec::new();
        for event in events {
            for account in event.touched_accounts() {
                if !balances.iter().any(|(a, _)| *a == account) {
                    balances.push((account, self.balances.get(&account).copied()));
                }
            }
            if let Some(key) = event.touched_allowance() {
                if !allowances.iter().any(|(k, _)| *k == key) {
                    allowances.push((key, self.allowances.get(&key).copied()));
                }
            }
        }
        Checkpoint {
            balances,
            allowances,
            total_supply: self.total_supply,
            net_traded: self.net_traded,
            reserve: self.reserve,
            version: self.version,
        }
    }

    /// Roll back to a checkpoint taken with [`Ledger::checkpoint`].
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        for (account, balance) in checkpoint.balances {
            match balance {
                Some(b) => self.balances.insert(account, b),
                None => self.balances.remove(&account),
            };
        }
        for (key, allowance) in checkpoint.allowances {
            match allowance {
                Some(a) => self.allowances.insert(key, a),
                None => self.allowances.remove(&key),
            };
        }
        self.total_supply = checkpoint.total_supply;
        self.net_traded = checkpoint.net_traded;
        self.reserve = checkpoint.reserve;
        self.version = checkpoint.version;
    }
}

impl AggregateRoot for Ledger {
    type Id = LedgerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Read-side summary of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub ledger_id: LedgerId,
    pub version: u64,
    pub total_supply: u128,
    pub net_traded: u128,
    pub reserve: u128,
    pub current_price: u128,
    pub holders: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyQuote {
    pub minted: u128,
    pub price: u128,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellQuote {
    pub payout: u128,
    pub price: u128,
}

/// Saved state of the fields touched by a batch of events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    balances: Vec<(AccountId, Option<u128>)>,
    allowances: Vec<((AccountId, AccountId), Option<u128>)>,
    total_supply: u128,
    net_traded: u128,
    reserve: u128,
    version: u64,
}

/// Command: Buy (mint against a deposit already attached to the call).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buy {
    pub caller: AccountId,
    pub deposit: u128,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Sell (burn against a payout from the reserve).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sell {
    pub caller: AccountId,
    pub amount: u128,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub caller: AccountId,
    pub to: AccountId,
    pub value: u128,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Approve (absolute set, not additive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approve {
    pub caller: AccountId,
    pub spender: AccountId,
    pub value: u128,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFrom {
    pub caller: AccountId,
    pub from: AccountId,
    pub to: AccountId,
    pub value: u128,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncreaseAllowance {
    pub caller: AccountId,
    pub spender: AccountId,
    pub delta: u128,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecreaseAllowance {
    pub caller: AccountId,
    pub spender: AccountId,
    pub delta: u128,
    pub occurred_at: DateTime<Utc>,
}

/// Command: bare value receipt (reserve top-up, no minting).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveValue {
    pub caller: AccountId,
    pub value: u128,
    pub occurred_at: DateTime<Utc>,
}

/// Command: fallback call carrying value and an opaque payload.
///
/// The payload has no defined behavior; the value lands in the reserve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackCall {
    pub caller: AccountId,
    pub value: u128,
    pub data: Vec<u8>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    Buy(Buy),
    Sell(Sell),
    Transfer(Transfer),
    Approve(Approve),
    TransferFrom(TransferFrom),
    IncreaseAllowance(IncreaseAllowance),
    DecreaseAllowance(DecreaseAllowance),
    Receive(ReceiveValue),
    Fallback(FallbackCall),
}

impl LedgerCommand {
    pub fn caller(&self) -> AccountId {
        match self {
            LedgerCommand::Buy(c) => c.caller,
            LedgerCommand::Sell(c) => c.caller,
            LedgerCommand::Transfer(c) => c.caller,
            LedgerCommand::Approve(c) => c.caller,
            LedgerCommand::TransferFrom(c) => c.caller,
            LedgerCommand::IncreaseAllowance(c) => c.caller,
            LedgerCommand::DecreaseAllowance(c) => c.caller,
            LedgerCommand::Receive(c) => c.caller,
            LedgerCommand::Fallback(c) => c.caller,
        }
    }

    /// Backing value the caller attaches to this command.
    pub fn attached_value(&self) -> u128 {
        match self {
            LedgerCommand::Buy(c) => c.deposit,
            LedgerCommand::Receive(c) => c.value,
            LedgerCommand::Fallback(c) => c.value,
            _ => 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LedgerCommand::Buy(_) => "buy",
            LedgerCommand::Sell(_) => "sell",
            LedgerCommand::Transfer(_) => "transfer",
            LedgerCommand::Approve(_) => "approve",
            LedgerCommand::TransferFrom(_) => "transfer_from",
            LedgerCommand::IncreaseAllowance(_) => "increase_allowance",
            LedgerCommand::DecreaseAllowance(_) => "decrease_allowance",
            LedgerCommand::Receive(_) => "receive",
            LedgerCommand::Fallback(_) => "fallback",
        }
    }
}

/// Event: Bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bought {
    pub caller: AccountId,
    pub deposit: u128,
    pub minted: u128,
    pub price: u128,
    pub occurred_at: DateTime<Utc>,
}

/// Event: Sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sold {
    pub caller: AccountId,
    pub amount: u128,
    pub payout: u128,
    pub price: u128,
    pub occurred_at: DateTime<Utc>,
}

/// Event: Transferred. `spender` is set when the move consumed an allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transferred {
    pub from: AccountId,
    pub to: AccountId,
    pub value: u128,
    pub spender: Option<AccountId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: Approved. Carries the resulting (absolute) allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approved {
    pub owner: AccountId,
    pub spender: AccountId,
    pub value: u128,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueEntry {
    Receive,
    Fallback,
}

/// Event: ValueReceived (reserve top-up without minting).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueReceived {
    pub from: AccountId,
    pub value: u128,
    pub entry: ValueEntry,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Bought(Bought),
    Sold(Sold),
    Transferred(Transferred),
    Approved(Approved),
    ValueReceived(ValueReceived),
}

impl LedgerEvent {
    fn touched_accounts(&self) -> Vec<AccountId> {
        match self {
            LedgerEvent::Bought(e) => vec![e.caller],
            LedgerEvent::Sold(e) => vec![e.caller],
            LedgerEvent::Transferred(e) => vec![e.from, e.to],
            LedgerEvent::Approved(_) | LedgerEvent::ValueReceived(_) => vec![],
        }
    }

    fn touched_allowance(&self) -> Option<(AccountId, AccountId)> {
        match self {
            LedgerEvent::Transferred(e) => e.spender.map(|spender| (e.from, spender)),
            LedgerEvent::Approved(e) => Some((e.owner, e.spender)),
            _ => None,
        }
    }
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::Bought(_) => "ledger.token.bought",
            LedgerEvent::Sold(_) => "ledger.token.sold",
            LedgerEvent::Transferred(_) => "ledger.token.transferred",
            LedgerEvent::Approved(_) => "ledger.token.approved",
            LedgerEvent::ValueReceived(_) => "ledger.reserve.value_received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::Bought(e) => e.occurred_at,
            LedgerEvent::Sold(e) => e.occurred_at,
            LedgerEvent::Transferred(e) => e.occurred_at,
            LedgerEvent::Approved(e) => e.occurred_at,
            LedgerEvent::ValueReceived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Ledger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = LedgerError;

    // `handle` has already proven every operation below fits.
    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::Bought(e) => {
                self.total_supply += e.minted;
                *self.balances.entry(e.caller).or_insert(0) += e.minted;
                self.net_traded += e.minted;
                self.reserve += e.deposit;
            }
            LedgerEvent::Sold(e) => {
                *self.balances.entry(e.caller).or_insert(0) -= e.amount;
                self.total_supply -= e.amount;
                self.net_traded = self.net_traded.saturating_sub(e.amount);
                self.reserve -= e.payout;
            }
            LedgerEvent::Transferred(e) => {
                if let Some(spender) = e.spender {
                    *self.allowances.entry((e.from, spender)).or_insert(0) -= e.value;
                }
                *self.balances.entry(e.from).or_insert(0) -= e.value;
                *self.balances.entry(e.to).or_insert(0) += e.value;
            }
            LedgerEvent::Approved(e) => {
                self.allowances.insert((e.owner, e.spender), e.value);
            }
            LedgerEvent::ValueReceived(e) => {
                self.reserve += e.value;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::Buy(cmd) => self.handle_buy(cmd),
            LedgerCommand::Sell(cmd) => self.handle_sell(cmd),
            LedgerCommand::Transfer(cmd) => {
                let moved = self.check_transfer(cmd.caller, cmd.to, cmd.value)?;
                Ok(vec![LedgerEvent::Transferred(Transferred {
                    from: cmd.caller,
                    to: cmd.to,
                    value: moved,
                    spender: None,
                    occurred_at: cmd.occurred_at,
                })])
            }
            LedgerCommand::Approve(cmd) => Ok(vec![approved(
                cmd.caller,
                cmd.spender,
                cmd.value,
                cmd.occurred_at,
            )]),
            LedgerCommand::TransferFrom(cmd) => self.handle_transfer_from(cmd),
            LedgerCommand::IncreaseAllowance(cmd) => {
                let value = checked_add(self.allowance(cmd.caller, cmd.spender), cmd.delta)?;
                Ok(vec![approved(cmd.caller, cmd.spender, value, cmd.occurred_at)])
            }
            LedgerCommand::DecreaseAllowance(cmd) => {
                let allowed = self.allowance(cmd.caller, cmd.spender);
                if allowed < cmd.delta {
                    return Err(LedgerError::AllowanceExceeded {
                        allowed,
                        requested: cmd.delta,
                    });
                }
                Ok(vec![approved(
                    cmd.caller,
                    cmd.spender,
                    allowed - cmd.delta,
                    cmd.occurred_at,
                )])
            }
            LedgerCommand::Receive(cmd) => {
                self.handle_value_receipt(cmd.caller, cmd.value, ValueEntry::Receive, cmd.occurred_at)
            }
            LedgerCommand::Fallback(cmd) => {
                self.handle_value_receipt(cmd.caller, cmd.value, ValueEntry::Fallback, cmd.occurred_at)
            }
        }
    }
}

fn approved(
    owner: AccountId,
    spender: AccountId,
    value: u128,
    occurred_at: DateTime<Utc>,
) -> LedgerEvent {
    LedgerEvent::Approved(Approved {
        owner,
        spender,
        value,
        occurred_at,
    })
}

impl Ledger {
    fn handle_buy(&self, cmd: &Buy) -> Result<Vec<LedgerEvent>, LedgerError> {
        let quote = self.quote_buy(cmd.deposit)?;
        // The caller's balance is bounded by total supply, already checked.
        Ok(vec![LedgerEvent::Bought(Bought {
            caller: cmd.caller,
            deposit: cmd.deposit,
            minted: quote.minted,
            price: quote.price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_sell(&self, cmd: &Sell) -> Result<Vec<LedgerEvent>, LedgerError> {
        if cmd.amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let available = self.balance_of(cmd.caller);
        if available < cmd.amount {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: cmd.amount,
            });
        }
        let quote = self.quote_sell(cmd.amount)?;
        Ok(vec![LedgerEvent::Sold(Sold {
            caller: cmd.caller,
            amount: cmd.amount,
            payout: quote.payout,
            price: quote.price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_transfer_from(&self, cmd: &TransferFrom) -> Result<Vec<LedgerEvent>, LedgerError> {
        let allowed = self.allowance(cmd.from, cmd.caller);
        if allowed < cmd.value {
            return Err(LedgerError::AllowanceExceeded {
                allowed,
                requested: cmd.value,
            });
        }
        let moved = self.check_transfer(cmd.from, cmd.to, cmd.value)?;
        Ok(vec![LedgerEvent::Transferred(Transferred {
            from: cmd.from,
            to: cmd.to,
            value: moved,
            spender: Some(cmd.caller),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn check_transfer(&self, from: AccountId, to: AccountId, value: u128) -> LedgerResult<u128> {
        if to.is_null() {
            return Err(LedgerError::TransferToNullIdentity);
        }
        let available = self.balance_of(from);
        if available < value {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: value,
            });
        }
        if from != to {
            checked_add(self.balance_of(to), value)?;
        }
        Ok(value)
    }

    fn handle_value_receipt(
        &self,
        from: AccountId,
        value: u128,
        entry: ValueEntry,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        if value == 0 {
            return Ok(vec![]);
        }
        checked_add(self.reserve, value)?;
        Ok(vec![LedgerEvent::ValueReceived(ValueReceived {
            from,
            value,
            entry,
            occurred_at,
        })])
    }
}
