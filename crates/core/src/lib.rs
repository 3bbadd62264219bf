//! `procura-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the error model, aggregate/entity/value-object traits and the
//! decimal money helpers every other crate rounds with.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    CompanyId, DocumentId, FiscalPositionId, LineId, PackagingId, PartyId, PaymentTermId,
    ProductId, TaxId, UomId, UserId,
};
pub use money::{Currency, CurrencyCode, checked, round_digits, round_to_increment};
pub use value_object::ValueObject;
