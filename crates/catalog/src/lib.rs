//! External collaborators of the procurement engine.
//!
//! The engine never owns product master data, vendor pricelists, exchange
//! rates or reference sequences. It reaches them through the traits below,
//! each of which may fail; failures propagate to the caller as
//! [`procura_core::DomainError`] through [`ServiceError`].
//!
//! [`InMemoryCatalog`], [`RateTable`] and [`InMemorySequence`] are reference
//! implementations for tests, fixtures and the demo CLI.

pub mod currency;
pub mod error;
pub mod memory;
pub mod pricing;
pub mod product;
pub mod sequence;
pub mod uom;

pub use currency::{CurrencyConversion, ExchangeRate, RateTable};
pub use error::{ServiceError, ServiceResult};
pub use memory::InMemoryCatalog;
pub use pricing::{SellerOffer, SellerPricing};
pub use product::{Packaging, PackagingCatalog, Product, ProductCatalog};
pub use sequence::{InMemorySequence, ReferenceSequence};
pub use uom::{UnitConversion, Uom};
