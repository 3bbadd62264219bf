//! Line derivation rules: description, unit, packaging, price and planned date.
//!
//! Each rule reads the line and its collaborators and writes the fields it
//! owns, skipping fields the user has overridden. Rules never run on their
//! own; [`crate::recompute`] decides which ones a change triggers and in what
//! order. [`derive_line`] runs all of them.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use procura_catalog::{
    CurrencyConversion, PackagingCatalog, Product, ProductCatalog, SellerPricing, UnitConversion,
};
use procura_core::{
    CompanyId, Currency, DomainError, DomainResult, checked, round_digits, round_to_increment,
};
use procura_tax::{RoundingPolicy, TaxComputer, TaxLine, fix_tax_included_price};

use crate::document::Document;
use crate::line::{DerivedField, Line};
use crate::recompute::{self, Computation};

/// Collaborators the rules consult.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub products: &'a dyn ProductCatalog,
    pub units: &'a dyn UnitConversion,
    pub packagings: &'a dyn PackagingCatalog,
    pub sellers: &'a dyn SellerPricing,
    pub currencies: &'a dyn CurrencyConversion,
    pub taxes: &'a dyn TaxComputer,
}

impl<'a> Services<'a> {
    /// Wire every catalog concern to one backing store.
    pub fn from_catalog<C>(
        catalog: &'a C,
        currencies: &'a dyn CurrencyConversion,
        taxes: &'a dyn TaxComputer,
    ) -> Self
    where
        C: ProductCatalog + UnitConversion + PackagingCatalog + SellerPricing,
    {
        Self {
            products: catalog,
            units: catalog,
            packagings: catalog,
            sellers: catalog,
            currencies,
            taxes,
        }
    }
}

/// Document-level inputs of the line rules.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    pub order_date: Option<DateTime<Utc>>,
    pub currency: Option<&'a Currency>,
    pub company: CompanyId,
    pub product_price_digits: u32,
    /// False for documents whose prices come from elsewhere (sale orders).
    pub vendor_priced: bool,
    /// Stands in for the order date when there is none.
    pub now: DateTime<Utc>,
}

impl<'a> LineContext<'a> {
    pub fn for_document(doc: &'a Document, product_price_digits: u32, now: DateTime<Utc>) -> Self {
        Self {
            order_date: doc.order_date(),
            currency: doc.currency(),
            company: doc.header().company,
            product_price_digits,
            vendor_priced: doc.kind().is_vendor_priced(),
            now,
        }
    }

    fn reference_time(&self) -> DateTime<Utc> {
        self.order_date.unwrap_or(self.now)
    }

    fn reference_day(&self) -> NaiveDate {
        self.reference_time().date_naive()
    }
}

/// Run every rule on `line` as if its product had just been set.
///
/// Fields the partial line already marks as overridden are kept.
pub fn derive_line(line: Line, ctx: &LineContext<'_>, services: &Services<'_>) -> DomainResult<Line> {
    let mut line = line;
    recompute::run(&mut line, Computation::ALL, false, ctx, services)?;
    Ok(line)
}

fn write_if_free<T>(line: &mut Line, field: DerivedField, slot: impl FnOnce(&mut Line) -> &mut T, value: T) {
    if !line.is_overridden(field) {
        *slot(line) = value;
    }
}

fn product_of(line: &Line, services: &Services<'_>) -> DomainResult<Option<Product>> {
    match line.product {
        Some(id) => Ok(Some(services.products.product(id)?)),
        None => Ok(None),
    }
}

/// The line's unit must belong to the category of the product's unit.
pub(crate) fn ensure_uom_matches_product(line: &Line, services: &Services<'_>) -> DomainResult<()> {
    let (Some(product), Some(uom)) = (product_of(line, services)?, line.uom) else {
        return Ok(());
    };
    let line_uom = services.units.uom(uom)?;
    let product_uom = services.units.uom(product.uom_id)?;
    if line_uom.category != product_uom.category {
        return Err(DomainError::validation(format!(
            "unit {} does not belong to the category of {} ({})",
            line_uom.name, product.name, product_uom.category
        )));
    }
    Ok(())
}

/// Description from the product name, unit from the product's purchase unit.
pub(crate) fn description_and_uom(line: &mut Line, services: &Services<'_>) -> DomainResult<()> {
    match product_of(line, services)? {
        Some(product) => {
            write_if_free(line, DerivedField::Description, |l| &mut l.description, product.name);
            write_if_free(line, DerivedField::Uom, |l| &mut l.uom, Some(product.purchase_uom_id));
        }
        None => write_if_free(line, DerivedField::Description, |l| &mut l.description, String::new()),
    }
    Ok(())
}

/// Drop a packaging of another product, then suggest the biggest one that fits.
pub(crate) fn packaging(line: &mut Line, services: &Services<'_>) -> DomainResult<()> {
    if line.is_overridden(DerivedField::Packaging) {
        return Ok(());
    }

    let mut current = line.packaging;
    if let Some(id) = current {
        let packaging = services.packagings.packaging(id)?;
        if Some(packaging.product_id) != line.product {
            current = None;
        }
    }

    if let (Some(product), Some(uom)) = (line.product, line.uom) {
        if !line.quantity.is_zero() {
            if let Some(suggested) = services
                .packagings
                .find_suitable_packaging(product, line.quantity, uom)?
            {
                current = Some(suggested.id);
            }
        }
    }

    line.packaging = current;
    Ok(())
}

/// A packaging kept on the line must belong to the line's product.
pub(crate) fn ensure_packaging_matches_product(line: &Line, services: &Services<'_>) -> DomainResult<()> {
    let Some(id) = line.packaging else {
        return Ok(());
    };
    let packaging = services.packagings.packaging(id)?;
    if Some(packaging.product_id) != line.product {
        return Err(DomainError::validation(format!(
            "packaging {} belongs to another product",
            packaging.name
        )));
    }
    Ok(())
}

/// Quantity expressed in packages, rounded to the packaging unit's increment.
pub(crate) fn packaging_qty(line: &mut Line, services: &Services<'_>) -> DomainResult<()> {
    if line.is_overridden(DerivedField::PackagingQty) {
        return Ok(());
    }

    let (Some(id), Some(uom)) = (line.packaging, line.uom) else {
        line.packaging_qty = Decimal::ZERO;
        return Ok(());
    };

    let packaging = services.packagings.packaging(id)?;
    if packaging.qty.is_zero() {
        line.packaging_qty = Decimal::ZERO;
        return Ok(());
    }
    let packaging_uom = services.units.uom(packaging.uom_id)?;
    let in_packaging_uom = services
        .units
        .convert_quantity(line.quantity, uom, packaging.uom_id)?;
    let packages = checked(in_packaging_uom.checked_div(packaging.qty), "packaging quantity")?;
    line.packaging_qty = round_to_increment(packages, packaging_uom.rounding)?;
    Ok(())
}

fn planned_after(ctx: &LineContext<'_>, lead_days: u32) -> DomainResult<DateTime<Utc>> {
    ctx.reference_time()
        .checked_add_signed(Duration::days(i64::from(lead_days)))
        .ok_or_else(|| DomainError::validation(format!("lead time of {lead_days} days is out of range")))
}

/// Unit price and planned date from the best vendor offer, else from the
/// product's standard price.
pub(crate) fn price_and_date(
    line: &mut Line,
    ctx: &LineContext<'_>,
    services: &Services<'_>,
) -> DomainResult<()> {
    let Some(product) = product_of(line, services)? else {
        return Ok(());
    };
    let uom = line.uom.unwrap_or(product.purchase_uom_id);
    let seller = services.sellers.select_seller(
        product.id,
        line.quantity,
        ctx.order_date.map(|d| d.date_naive()),
        uom,
    )?;

    if seller.is_some() || line.date_planned.is_none() {
        let lead = seller.as_ref().map_or(0, |s| s.lead_time_days);
        let planned = planned_after(ctx, lead)?;
        write_if_free(line, DerivedField::DatePlanned, |l| &mut l.date_planned, Some(planned));
    }

    if line.is_overridden(DerivedField::PriceUnit) {
        return Ok(());
    }

    let day = ctx.reference_day();
    let price = match &seller {
        Some(offer) => {
            let target = ctx.currency.unwrap_or(&offer.currency);
            let fixed = fix_tax_included_price(
                offer.price,
                &product.supplier_taxes,
                &line.taxes,
                &offer.currency,
                services.taxes,
            )?;
            let converted =
                services
                    .currencies
                    .convert(fixed, &offer.currency, target, ctx.company, day)?;
            let per_line_uom = services.units.convert_price(converted, offer.uom_id, uom)?;
            round_price(per_line_uom, target, ctx)
        }
        None => {
            let target = ctx.currency.unwrap_or(&product.currency);
            let per_line_uom = services
                .units
                .convert_price(product.standard_price, product.uom_id, uom)?;
            let fixed = fix_tax_included_price(
                per_line_uom,
                &product.supplier_taxes,
                &line.taxes,
                &product.currency,
                services.taxes,
            )?;
            let converted =
                services
                    .currencies
                    .convert(fixed, &product.currency, target, ctx.company, day)?;
            round_price(converted, target, ctx)
        }
    };
    line.price_unit = price;
    Ok(())
}

fn round_price(price: Decimal, currency: &Currency, ctx: &LineContext<'_>) -> Decimal {
    round_digits(price, currency.decimal_places.max(ctx.product_price_digits))
}

/// Subtotal, tax and total of the line, rounded to the document currency.
pub(crate) fn amounts(line: &mut Line, ctx: &LineContext<'_>, services: &Services<'_>) -> DomainResult<()> {
    let Some(currency) = ctx.currency else {
        line.clear_amounts();
        return Ok(());
    };
    if line.is_pseudo() {
        line.clear_amounts();
        return Ok(());
    }

    let input = [TaxLine {
        quantity: line.quantity,
        price_unit: line.price_unit,
        taxes: &line.taxes,
        currency,
    }];
    let summary = procura_tax::compute(&input, RoundingPolicy::RoundPerLine, services.taxes)?;
    let totals = summary.per_line.first().copied().unwrap_or_default();
    line.set_amounts(totals);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use procura_catalog::{InMemoryCatalog, RateTable, SellerOffer, Uom};
    use procura_core::{CurrencyCode, PartyId};
    use procura_tax::{StandardTaxComputer, TaxDefinition};
    use rust_decimal_macros::dec;

    fn code(c: &str) -> CurrencyCode {
        CurrencyCode::new(c).unwrap()
    }

    fn usd() -> Currency {
        Currency::new(code("USD"), 2)
    }

    fn aed() -> Currency {
        Currency::new(code("AED"), 2)
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    struct World {
        catalog: InMemoryCatalog,
        rates: RateTable,
        units: Uom,
        dozens: Uom,
        kg: Uom,
        product: Product,
    }

    fn world() -> World {
        let units = Uom::new("Units", "Unit", dec!(1), dec!(0.01));
        let dozens = Uom::new("Dozens", "Unit", dec!(12), dec!(0.01));
        let kg = Uom::new("kg", "Weight", dec!(1), dec!(0.001));
        let product = Product::new("Ballpoint pen", units.id, dec!(0.50), usd())
            .with_packaging("Box of 12", dec!(12));
        let catalog = InMemoryCatalog::new()
            .with_uom(units.clone())
            .with_uom(dozens.clone())
            .with_uom(kg.clone())
            .with_product(product.clone());
        let rates = RateTable::new(code("USD")).with_rate(
            code("AED"),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            dec!(3.6725),
        );
        World {
            catalog,
            rates,
            units,
            dozens,
            kg,
            product,
        }
    }

    fn ctx<'a>(currency: &'a Currency, order_date: Option<DateTime<Utc>>) -> LineContext<'a> {
        LineContext {
            order_date,
            currency: Some(currency),
            company: CompanyId::new(),
            product_price_digits: 2,
            vendor_priced: true,
            now: at(2024, 2, 1),
        }
    }

    #[test]
    fn derives_every_field_from_the_product() {
        let w = world();
        let services = Services::from_catalog(&w.catalog, &w.rates, &StandardTaxComputer);
        let currency = usd();

        let line = derive_line(
            Line::product(w.product.id, dec!(30)),
            &ctx(&currency, Some(at(2024, 2, 10))),
            &services,
        )
        .unwrap();

        assert_eq!(line.description(), "Ballpoint pen");
        assert_eq!(line.uom(), Some(w.units.id));
        assert_eq!(line.packaging(), Some(w.product.packagings[0].id));
        assert_eq!(line.packaging_qty(), dec!(2.5));
        assert_eq!(line.price_unit(), dec!(0.50));
        assert_eq!(line.date_planned(), Some(at(2024, 2, 10)));
        assert_eq!(line.subtotal(), dec!(15.00));
    }

    #[test]
    fn vendor_offer_sets_price_and_lead_time() {
        let w = world();
        let catalog = w.catalog.clone().with_offer(SellerOffer {
            partner_id: PartyId::new(),
            product_id: w.product.id,
            price: dec!(5.40),
            currency: usd(),
            uom_id: w.dozens.id,
            lead_time_days: 7,
            min_qty: dec!(0),
            date_start: None,
            date_end: None,
            sequence: 1,
        });
        let services = Services::from_catalog(&catalog, &w.rates, &StandardTaxComputer);
        let currency = usd();

        let line = derive_line(
            Line::product(w.product.id, dec!(24)),
            &ctx(&currency, Some(at(2024, 2, 10))),
            &services,
        )
        .unwrap();

        assert_eq!(line.price_unit(), dec!(0.45));
        assert_eq!(line.date_planned(), Some(at(2024, 2, 17)));
    }

    #[test]
    fn standard_price_is_converted_to_the_line_currency() {
        let w = world();
        let services = Services::from_catalog(&w.catalog, &w.rates, &StandardTaxComputer);
        let currency = aed();

        let line = derive_line(
            Line::product(w.product.id, dec!(1)).with_uom(w.dozens.id),
            &ctx(&currency, Some(at(2024, 2, 10))),
            &services,
        )
        .unwrap();

        // 0.50 per unit, 6.00 per dozen, 22.035 AED
        assert_eq!(line.price_unit(), dec!(22.04));
    }

    #[test]
    fn included_supplier_tax_is_stripped_when_line_has_none() {
        let w = world();
        let vat = TaxDefinition::percent("VAT 5% incl.", dec!(5)).included();
        let product = Product::new("Stapler", w.units.id, dec!(10.50), usd())
            .with_supplier_taxes(vec![vat]);
        let catalog = w.catalog.clone().with_product(product.clone());
        let services = Services::from_catalog(&catalog, &w.rates, &StandardTaxComputer);
        let currency = usd();

        let line = derive_line(
            Line::product(product.id, dec!(1)),
            &ctx(&currency, None),
            &services,
        )
        .unwrap();

        assert_eq!(line.price_unit(), dec!(10.00));
        assert_eq!(line.date_planned(), Some(at(2024, 2, 1)));
    }

    #[test]
    fn overridden_fields_survive_derivation() {
        let w = world();
        let services = Services::from_catalog(&w.catalog, &w.rates, &StandardTaxComputer);
        let currency = usd();

        let line = derive_line(
            Line::product(w.product.id, dec!(2))
                .with_description("Blue pens")
                .with_price_unit(dec!(0.40)),
            &ctx(&currency, None),
            &services,
        )
        .unwrap();

        assert_eq!(line.description(), "Blue pens");
        assert_eq!(line.price_unit(), dec!(0.40));
        assert_eq!(line.subtotal(), dec!(0.80));
    }

    #[test]
    fn unit_of_another_category_is_rejected() {
        let w = world();
        let services = Services::from_catalog(&w.catalog, &w.rates, &StandardTaxComputer);
        let currency = usd();

        let err = derive_line(
            Line::product(w.product.id, dec!(2)).with_uom(w.kg.id),
            &ctx(&currency, None),
            &services,
        )
        .unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("category") => {}
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_rate_propagates() {
        let w = world();
        let rates = RateTable::new(code("USD"));
        let services = Services::from_catalog(&w.catalog, &rates, &StandardTaxComputer);
        let currency = aed();

        let err = derive_line(
            Line::product(w.product.id, dec!(2)),
            &ctx(&currency, None),
            &services,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::External { ref service, .. } if service == "currency"));
    }
}
