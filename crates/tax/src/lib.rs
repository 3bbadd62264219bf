//! Tax computation for procurement documents.
//!
//! - [`tax`]: tax definitions as handed over by the tax-definition collaborator.
//! - [`compute`]: the per-tax primitive ([`TaxComputer`]) and its reference
//!   implementation.
//! - [`engine`]: per-line and per-document totals under a [`RoundingPolicy`].
//! - [`price`]: stripping price-included taxes from vendor/standard prices.

pub mod compute;
pub mod engine;
pub mod error;
pub mod price;
pub mod tax;

pub use compute::{StandardTaxComputer, TaxAmount, TaxBreakdown, TaxComputer};
pub use engine::{RoundingPolicy, TaxGroupTotal, TaxLine, TaxSummary, Totals, compute};
pub use error::TaxError;
pub use price::fix_tax_included_price;
pub use tax::{AmountType, TaxDefinition};
