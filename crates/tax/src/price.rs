use rust_decimal::Decimal;

use procura_core::Currency;

use crate::compute::TaxComputer;
use crate::error::TaxError;
use crate::tax::TaxDefinition;

/// Remove price-included taxes the line will not charge.
///
/// Vendor and standard prices are expressed with the product's own taxes. When
/// one of those is price-included but absent from the line's tax set, its share
/// is stripped so the line does not silently pay it. Without such a mismatch
/// the price is returned unchanged.
pub fn fix_tax_included_price(
    price: Decimal,
    product_taxes: &[TaxDefinition],
    line_taxes: &[TaxDefinition],
    currency: &Currency,
    computer: &dyn TaxComputer,
) -> Result<Decimal, TaxError> {
    let line_leaves = TaxDefinition::flatten(line_taxes);
    let stray: Vec<TaxDefinition> = TaxDefinition::flatten(product_taxes)
        .into_iter()
        .filter(|t| t.price_include && !line_leaves.iter().any(|l| l.id == t.id))
        .collect();

    if stray.is_empty() {
        return Ok(price);
    }

    Ok(computer
        .compute_all(&stray, price, Decimal::ONE, currency)?
        .total_excluded)
}
