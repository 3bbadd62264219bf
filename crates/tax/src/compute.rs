//! The per-tax computation primitive.
//!
//! Tax-type semantics (percentage, fixed, group, price-included) belong to the
//! tax-definition collaborator. The engine only talks to it through
//! [`TaxComputer`], which returns **unrounded** figures so that the caller can
//! apply whichever rounding policy is active.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{Currency, TaxId};

use crate::error::{TaxError, checked};
use crate::tax::{AmountType, TaxDefinition};

/// Raw amount produced by one leaf tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxAmount {
    pub tax_id: TaxId,
    pub name: String,
    pub base: Decimal,
    pub amount: Decimal,
}

/// Raw result of applying a tax set to `price_unit × quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// Untaxed amount (price-included taxes already extracted).
    pub total_excluded: Decimal,
    pub taxes: Vec<TaxAmount>,
}

impl TaxBreakdown {
    pub fn total_tax(&self) -> Result<Decimal, TaxError> {
        self.taxes.iter().try_fold(Decimal::ZERO, |acc, t| {
            checked(acc.checked_add(t.amount), "tax amount")
        })
    }

    pub fn total_included(&self) -> Result<Decimal, TaxError> {
        checked(self.total_excluded.checked_add(self.total_tax()?), "line total")
    }
}

/// External per-tax computation primitive.
pub trait TaxComputer {
    /// Apply `taxes` to `price_unit × quantity`.
    ///
    /// Implementations must not round: the engine rounds per line or per
    /// document depending on its policy.
    fn compute_all(
        &self,
        taxes: &[TaxDefinition],
        price_unit: Decimal,
        quantity: Decimal,
        currency: &Currency,
    ) -> Result<TaxBreakdown, TaxError>;
}

/// Reference implementation of [`TaxComputer`].
///
/// Price-included taxes are extracted from the gross amount first (fixed
/// amounts subtracted, percentages divided out together). The remaining taxes
/// are then applied in sequence order, each on the running base, which grows
/// by the amount of every tax flagged `include_base_amount`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTaxComputer;

impl TaxComputer for StandardTaxComputer {
    fn compute_all(
        &self,
        taxes: &[TaxDefinition],
        price_unit: Decimal,
        quantity: Decimal,
        _currency: &Currency,
    ) -> Result<TaxBreakdown, TaxError> {
        let hundred = Decimal::ONE_HUNDRED;
        let flat = TaxDefinition::flatten(taxes);
        let gross = checked(price_unit.checked_mul(quantity), "line amount")?;

        let mut fixed_included = Decimal::ZERO;
        let mut percent_included = Decimal::ZERO;
        for tax in flat.iter().filter(|t| t.price_include) {
            match tax.amount_type {
                AmountType::Percent => {
                    percent_included =
                        checked(percent_included.checked_add(tax.amount), "included tax rate")?;
                }
                AmountType::Fixed => {
                    let fixed = checked(tax.amount.checked_mul(quantity), "fixed tax amount")?;
                    fixed_included = checked(fixed_included.checked_add(fixed), "fixed tax amount")?;
                }
                AmountType::Group { .. } => {
                    return Err(TaxError::Unsupported {
                        name: tax.name.clone(),
                        reason: "nested group survived flattening".to_string(),
                    });
                }
            }
        }

        let divisor = checked(
            Decimal::ONE.checked_add(percent_included / hundred),
            "included tax rate",
        )?;
        if divisor <= Decimal::ZERO {
            return Err(TaxError::InvalidIncludedRate(percent_included.to_string()));
        }
        let net = checked(gross.checked_sub(fixed_included), "line amount")?;
        let total_excluded = checked(net.checked_div(divisor), "line amount")?;

        let mut running_base = total_excluded;
        let mut amounts = Vec::with_capacity(flat.len());
        for tax in &flat {
            let base = if tax.price_include {
                total_excluded
            } else {
                running_base
            };
            let amount = match tax.amount_type {
                AmountType::Percent => checked(base.checked_mul(tax.amount), "tax amount")? / hundred,
                AmountType::Fixed => checked(tax.amount.checked_mul(quantity), "fixed tax amount")?,
                AmountType::Group { .. } => Decimal::ZERO,
            };
            if tax.include_base_amount {
                running_base = checked(running_base.checked_add(amount), "tax base")?;
            }
            amounts.push(TaxAmount {
                tax_id: tax.id,
                name: tax.name.clone(),
                base,
                amount,
            });
        }

        Ok(TaxBreakdown {
            total_excluded,
            taxes: amounts,
        })
    }
}
