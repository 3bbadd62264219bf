use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::UomId;

use crate::error::{ServiceError, ServiceResult, checked};

/// Unit of measure.
///
/// Units of one category convert through the category's reference unit:
/// `ratio` is how many reference units one of this unit holds (a dozen holds
/// 12 units, a gram 0.001 kg).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uom {
    pub id: UomId,
    pub name: String,
    pub category: String,
    pub ratio: Decimal,
    /// Rounding increment for quantities expressed in this unit (e.g. 0.01).
    pub rounding: Decimal,
}

impl Uom {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        ratio: Decimal,
        rounding: Decimal,
    ) -> Self {
        Self {
            id: UomId::new(),
            name: name.into(),
            category: category.into(),
            ratio,
            rounding,
        }
    }

    fn ensure_same_category(&self, to: &Uom) -> ServiceResult<()> {
        if self.category != to.category {
            return Err(ServiceError::IncompatibleUnits {
                from: self.name.clone(),
                to: to.name.clone(),
            });
        }
        if to.ratio.is_zero() {
            return Err(ServiceError::unavailable(
                "catalog",
                format!("unit {} has a zero ratio", to.name),
            ));
        }
        Ok(())
    }

    /// Express `qty` of this unit in `to` (not rounded).
    pub fn quantity_to(&self, qty: Decimal, to: &Uom) -> ServiceResult<Decimal> {
        if self.id == to.id {
            return Ok(qty);
        }
        self.ensure_same_category(to)?;
        let reference = checked(qty.checked_mul(self.ratio), "converted quantity")?;
        checked(reference.checked_div(to.ratio), "converted quantity")
    }

    /// Express a price per this unit as a price per `to` (not rounded).
    pub fn price_to(&self, price: Decimal, to: &Uom) -> ServiceResult<Decimal> {
        if self.id == to.id {
            return Ok(price);
        }
        self.ensure_same_category(to)?;
        if self.ratio.is_zero() {
            return Err(ServiceError::unavailable(
                "catalog",
                format!("unit {} has a zero ratio", self.name),
            ));
        }
        let reference = checked(price.checked_div(self.ratio), "converted price")?;
        checked(reference.checked_mul(to.ratio), "converted price")
    }
}

/// Unit conversion service.
pub trait UnitConversion {
    fn uom(&self, id: UomId) -> ServiceResult<Uom>;

    fn convert_quantity(&self, qty: Decimal, from: UomId, to: UomId) -> ServiceResult<Decimal> {
        if from == to {
            return Ok(qty);
        }
        self.uom(from)?.quantity_to(qty, &self.uom(to)?)
    }

    fn convert_price(&self, price: Decimal, from: UomId, to: UomId) -> ServiceResult<Decimal> {
        if from == to {
            return Ok(price);
        }
        self.uom(from)?.price_to(price, &self.uom(to)?)
    }
}
