//! Procurement documents: purchase requests, RFQs, purchase orders and sale orders.
//!
//! - [`document`] / [`line`]: the document model (one header shape, a kind tag).
//! - [`derivation`] / [`recompute`]: derived line fields and the change dispatcher.
//! - [`aggregation`]: document totals and planned date.
//! - [`conversion`] / [`lineage`]: deriving documents from one another and
//!   walking the resulting back-references.
//! - [`lifecycle`]: state transitions as an event-sourced aggregate.
//! - [`service`]: the write path tying it together.

pub mod aggregation;
pub mod clock;
pub mod config;
pub mod conversion;
pub mod derivation;
pub mod document;
pub mod lifecycle;
pub mod line;
pub mod lineage;
pub mod recompute;
pub mod service;

pub use aggregation::{earliest_planned_date, recompute_totals};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use conversion::{DerivationStrategy, RequestToRfq, RequestToSaleOrder, RfqToPurchaseOrder, derive};
pub use derivation::{LineContext, Services, derive_line};
pub use document::{Document, DocumentDraft, DocumentHeader, DocumentKind, DocumentState, SourceRef};
pub use lifecycle::{DocumentCommand, DocumentDeleted, DocumentEvent, StateChanged, Transition};
pub use line::{DerivedField, DisplayType, Line, LineEdit};
pub use lineage::{derived_from, purchase_orders_for_request};
pub use recompute::{Computation, FieldChange};
pub use service::{DocumentService, NEW_REFERENCE};
