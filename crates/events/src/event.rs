use chrono::{DateTime, Utc};

/// A fact emitted by a procurement aggregate.
///
/// Lifecycle events are append-only records of what a document went
/// through (submitted, confirmed, completed, deleted). Consumers key on
/// [`Event::event_type`] and [`Event::version`], never on the Rust type.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, `<context>.<aggregate>.<past-tense verb>`
    /// (e.g. `procurement.document.confirmed`).
    fn event_type(&self) -> &'static str;

    /// Payload schema version of this event type.
    fn version(&self) -> u32;

    /// Business time of the fact.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// True for events after which the aggregate accepts no further command.
    fn is_terminal(&self) -> bool {
        false
    }
}
