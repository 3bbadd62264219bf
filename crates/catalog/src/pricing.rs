use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{Currency, PartyId, ProductId, UomId};

use crate::error::ServiceResult;

/// A vendor pricelist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerOffer {
    pub partner_id: PartyId,
    pub product_id: ProductId,
    /// Price per `uom_id`, in `currency`.
    pub price: Decimal,
    pub currency: Currency,
    pub uom_id: UomId,
    #[serde(default)]
    pub lead_time_days: u32,
    /// Minimum quantity (in `uom_id`) for the offer to apply.
    #[serde(default)]
    pub min_qty: Decimal,
    #[serde(default)]
    pub date_start: Option<NaiveDate>,
    #[serde(default)]
    pub date_end: Option<NaiveDate>,
    /// Lower sequences are preferred.
    #[serde(default)]
    pub sequence: i32,
}

impl SellerOffer {
    /// True when the offer is valid on `date` (an unknown date matches any window).
    pub fn is_valid_on(&self, date: Option<NaiveDate>) -> bool {
        let Some(date) = date else {
            return true;
        };
        self.date_start.is_none_or(|start| start <= date)
            && self.date_end.is_none_or(|end| date <= end)
    }
}

/// Seller resolution service.
pub trait SellerPricing {
    /// Best matching offer for `quantity` of `product` in `uom` on `date`.
    ///
    /// `Ok(None)` means no vendor offers the product on those terms; it is not
    /// an error.
    fn select_seller(
        &self,
        product: ProductId,
        quantity: Decimal,
        date: Option<NaiveDate>,
        uom: UomId,
    ) -> ServiceResult<Option<SellerOffer>>;
}
