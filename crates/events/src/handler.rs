/// Execute an aggregate command deterministically (no IO, no async).
///
/// 1. **Decide**: `aggregate.handle(command)` produces events (pure, no mutation).
/// 2. **Evolve**: each event is applied via `aggregate.apply(event)`.
///
/// On rejection the aggregate is untouched. This is the inline form of the
/// transition; `LedgerService` in `curvebook-infra` adds serialization, value
/// movement and publication around the same two steps.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: curvebook_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
