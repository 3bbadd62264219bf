//! Change-driven recomputation of derived line fields.
//!
//! A [`FieldChange`] names what moved. [`plan`] looks it up in a static
//! dependency table and returns the computations to run, in dependency order,
//! so each one sees the outputs of the ones before it.
//!
//! Hard changes (product, quantity, unit, packaging) clear the override flags
//! of every field they recompute. Soft changes (the document's order date)
//! leave overridden fields alone.

use serde::{Deserialize, Serialize};

use procura_core::DomainResult;

use crate::derivation::{self, LineContext, Services};
use crate::line::{DerivedField, Line};

/// Something a derived field depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldChange {
    Product,
    Quantity,
    Uom,
    Packaging,
    PriceUnit,
    Taxes,
    OrderDate,
    Currency,
}

impl FieldChange {
    pub fn is_hard(self) -> bool {
        matches!(
            self,
            FieldChange::Product | FieldChange::Quantity | FieldChange::Uom | FieldChange::Packaging
        )
    }
}

/// Recompute steps, declared in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Computation {
    DescriptionUom,
    Packaging,
    PackagingQty,
    PriceAndDate,
    Amounts,
}

impl Computation {
    pub const ALL: &'static [Computation] = &[
        Computation::DescriptionUom,
        Computation::Packaging,
        Computation::PackagingQty,
        Computation::PriceAndDate,
        Computation::Amounts,
    ];

    /// Derived fields this step writes.
    pub fn outputs(self) -> &'static [DerivedField] {
        match self {
            Computation::DescriptionUom => &[DerivedField::Description, DerivedField::Uom],
            Computation::Packaging => &[DerivedField::Packaging],
            Computation::PackagingQty => &[DerivedField::PackagingQty],
            Computation::PriceAndDate => &[DerivedField::PriceUnit, DerivedField::DatePlanned],
            Computation::Amounts => &[],
        }
    }
}

const DEPENDENCIES: &[(FieldChange, &[Computation])] = &[
    (FieldChange::Product, Computation::ALL),
    (
        FieldChange::Quantity,
        &[
            Computation::Packaging,
            Computation::PackagingQty,
            Computation::PriceAndDate,
            Computation::Amounts,
        ],
    ),
    (
        FieldChange::Uom,
        &[
            Computation::Packaging,
            Computation::PackagingQty,
            Computation::PriceAndDate,
            Computation::Amounts,
        ],
    ),
    (FieldChange::Packaging, &[Computation::PackagingQty]),
    (FieldChange::PriceUnit, &[Computation::Amounts]),
    (FieldChange::Taxes, &[Computation::Amounts]),
    (FieldChange::OrderDate, &[Computation::PriceAndDate, Computation::Amounts]),
    (FieldChange::Currency, &[Computation::Amounts]),
];

/// Computations triggered by `changes`, deduplicated and in dependency order.
pub fn plan(changes: &[FieldChange]) -> Vec<Computation> {
    let mut steps: Vec<Computation> = DEPENDENCIES
        .iter()
        .filter(|(change, _)| changes.contains(change))
        .flat_map(|(_, steps)| steps.iter().copied())
        .collect();
    steps.sort();
    steps.dedup();
    steps
}

/// Apply `changes` to `line`, all or nothing.
///
/// On error the line is left exactly as it was.
pub fn apply(
    line: &mut Line,
    changes: &[FieldChange],
    ctx: &LineContext<'_>,
    services: &Services<'_>,
) -> DomainResult<()> {
    let steps = plan(changes);
    if steps.is_empty() {
        return Ok(());
    }
    let hard = changes.iter().any(|c| c.is_hard());

    let mut next = line.clone();
    run(&mut next, &steps, hard, ctx, services)?;
    *line = next;
    Ok(())
}

pub(crate) fn run(
    line: &mut Line,
    steps: &[Computation],
    hard: bool,
    ctx: &LineContext<'_>,
    services: &Services<'_>,
) -> DomainResult<()> {
    if line.is_pseudo() {
        line.clear_amounts();
        return Ok(());
    }

    if hard {
        for field in steps.iter().flat_map(|s| s.outputs()) {
            line.overrides.remove(field);
        }
    }

    for step in steps {
        tracing::debug!(line_id = %line.id, step = ?step, "recomputing line");
        match step {
            Computation::DescriptionUom => {
                derivation::description_and_uom(line, services)?;
                derivation::ensure_uom_matches_product(line, services)?;
            }
            Computation::Packaging => {
                derivation::packaging(line, services)?;
                derivation::ensure_packaging_matches_product(line, services)?;
            }
            Computation::PackagingQty => {
                if !steps.contains(&Computation::Packaging) {
                    derivation::ensure_packaging_matches_product(line, services)?;
                }
                derivation::packaging_qty(line, services)?
            }
            Computation::PriceAndDate => {
                if !steps.contains(&Computation::DescriptionUom) {
                    derivation::ensure_uom_matches_product(line, services)?;
                }
                if ctx.vendor_priced {
                    derivation::price_and_date(line, ctx, services)?;
                }
            }
            Computation::Amounts => derivation::amounts(line, ctx, services)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use procura_catalog::{InMemoryCatalog, Product, RateTable, SellerOffer, Uom};
    use procura_core::{CompanyId, Currency, CurrencyCode, PartyId};
    use procura_tax::StandardTaxComputer;
    use rust_decimal_macros::dec;

    use crate::line::LineEdit;

    fn usd() -> Currency {
        Currency::new(CurrencyCode::new("USD").unwrap(), 2)
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn plans_follow_dependency_order() {
        assert_eq!(plan(&[FieldChange::Product]), Computation::ALL.to_vec());
        assert_eq!(
            plan(&[FieldChange::Taxes, FieldChange::Packaging]),
            vec![Computation::PackagingQty, Computation::Amounts]
        );
        assert_eq!(
            plan(&[FieldChange::OrderDate]),
            vec![Computation::PriceAndDate, Computation::Amounts]
        );
        assert!(plan(&[]).is_empty());
    }

    #[test]
    fn hardness_of_changes() {
        assert!(FieldChange::Quantity.is_hard());
        assert!(FieldChange::Packaging.is_hard());
        assert!(!FieldChange::OrderDate.is_hard());
        assert!(!FieldChange::Currency.is_hard());
    }

    struct World {
        catalog: InMemoryCatalog,
        rates: RateTable,
        product: Product,
    }

    fn world_with_offer() -> World {
        let units = Uom::new("Units", "Unit", dec!(1), dec!(0.01));
        let product = Product::new("Toner", units.id, dec!(50), usd());
        let catalog = InMemoryCatalog::new()
            .with_uom(units.clone())
            .with_product(product.clone())
            .with_offer(SellerOffer {
                partner_id: PartyId::new(),
                product_id: product.id,
                price: dec!(42),
                currency: usd(),
                uom_id: units.id,
                lead_time_days: 5,
                min_qty: dec!(0),
                date_start: None,
                date_end: None,
                sequence: 1,
            });
        World {
            catalog,
            rates: RateTable::new(CurrencyCode::new("USD").unwrap()),
            product,
        }
    }

    fn ctx(currency: &Currency, order_date: DateTime<Utc>) -> LineContext<'_> {
        LineContext {
            order_date: Some(order_date),
            currency: Some(currency),
            company: CompanyId::new(),
            product_price_digits: 2,
            vendor_priced: true,
            now: at(2024, 1, 1),
        }
    }

    #[test]
    fn soft_change_keeps_user_price_hard_change_resets_it() {
        let w = world_with_offer();
        let services = Services::from_catalog(&w.catalog, &w.rates, &StandardTaxComputer);
        let currency = usd();
        let first = ctx(&currency, at(2024, 3, 1));

        let mut line = Line::product(w.product.id, dec!(2));
        apply(&mut line, &[FieldChange::Product], &first, &services).unwrap();
        assert_eq!(line.price_unit(), dec!(42));

        line.write(&LineEdit::PriceUnit(dec!(40))).unwrap();
        apply(&mut line, &[FieldChange::PriceUnit], &first, &services).unwrap();
        assert_eq!(line.subtotal(), dec!(80));

        let moved = ctx(&currency, at(2024, 3, 10));
        apply(&mut line, &[FieldChange::OrderDate], &moved, &services).unwrap();
        assert_eq!(line.price_unit(), dec!(40));
        assert_eq!(line.date_planned(), Some(at(2024, 3, 15)));

        line.write(&LineEdit::Quantity(dec!(3))).unwrap();
        apply(&mut line, &[FieldChange::Quantity], &moved, &services).unwrap();
        assert_eq!(line.price_unit(), dec!(42));
        assert!(!line.is_overridden(DerivedField::PriceUnit));
        assert_eq!(line.subtotal(), dec!(126));
    }

    #[test]
    fn lines_priced_elsewhere_ignore_vendor_offers() {
        let w = world_with_offer();
        let services = Services::from_catalog(&w.catalog, &w.rates, &StandardTaxComputer);
        let currency = usd();
        let sale = LineContext {
            vendor_priced: false,
            ..ctx(&currency, at(2024, 3, 1))
        };

        let mut line = Line::product(w.product.id, dec!(2));
        apply(&mut line, &[FieldChange::Product], &sale, &services).unwrap();
        assert_eq!(line.price_unit(), dec!(0));
        assert_eq!(line.date_planned(), None);

        line.write(&LineEdit::Quantity(dec!(5))).unwrap();
        apply(&mut line, &[FieldChange::Quantity, FieldChange::OrderDate], &sale, &services).unwrap();
        assert_eq!(line.price_unit(), dec!(0));
        assert_eq!(line.date_planned(), None);
    }

    #[test]
    fn failed_recompute_leaves_line_untouched() {
        let w = world_with_offer();
        let empty = InMemoryCatalog::new();
        let services = Services::from_catalog(&empty, &w.rates, &StandardTaxComputer);
        let currency = usd();

        let mut line = Line::product(w.product.id, dec!(2)).with_price_unit(dec!(7));
        let before = line.clone();
        let err = apply(&mut line, &[FieldChange::Product], &ctx(&currency, at(2024, 3, 1)), &services);
        assert!(err.is_err());
        assert_eq!(line, before);
    }
}
