use std::sync::Arc;

use curvebook_events::{Event, EventBus, InMemoryEventBus};
use curvebook_infra::{Envelope, InMemoryWallets, LedgerService};
use curvebook_ledger::{Ledger, LedgerId};

pub type ApiBus = Arc<InMemoryEventBus<Envelope>>;
pub type ApiLedgerService = LedgerService<Arc<InMemoryWallets>, ApiBus>;

/// Everything the handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub ledger: ApiLedgerService,
    pub wallets: Arc<InMemoryWallets>,
}

/// In-memory wiring (dev/test): ledger service over dev wallets + event feed.
pub fn build_services(ledger_id: LedgerId) -> AppServices {
    let wallets = Arc::new(InMemoryWallets::new());
    let bus: ApiBus = Arc::new(InMemoryEventBus::new());

    // Background subscriber: bus -> structured log feed.
    // Must be called from within a tokio runtime.
    {
        let subscription = bus.subscribe();
        tokio::task::spawn_blocking(move || {
            while let Ok(envelope) = subscription.recv() {
                tracing::debug!(
                    ledger_id = %envelope.aggregate_id(),
                    sequence = envelope.sequence_number(),
                    event_type = envelope.payload().event_type(),
                    "ledger event committed"
                );
            }
        });
    }

    let ledger = LedgerService::new(Ledger::empty(ledger_id), wallets.clone(), bus);
    AppServices { ledger, wallets }
}
