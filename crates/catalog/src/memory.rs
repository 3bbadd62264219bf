//! In-memory catalog for tests and fixtures.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{PackagingId, ProductId, UomId};

use crate::error::{ServiceError, ServiceResult};
use crate::pricing::{SellerOffer, SellerPricing};
use crate::product::{Packaging, PackagingCatalog, Product, ProductCatalog};
use crate::uom::{UnitConversion, Uom};

/// Units, products (with their packagings) and vendor offers held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryCatalog {
    #[serde(default)]
    pub uoms: Vec<Uom>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub offers: Vec<SellerOffer>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uom(mut self, uom: Uom) -> Self {
        self.uoms.push(uom);
        self
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.products.push(product);
        self
    }

    pub fn with_offer(mut self, offer: SellerOffer) -> Self {
        self.offers.push(offer);
        self
    }

    fn find_product(&self, id: ProductId) -> ServiceResult<&Product> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ServiceError::not_found("product", id))
    }
}

impl UnitConversion for InMemoryCatalog {
    fn uom(&self, id: UomId) -> ServiceResult<Uom> {
        self.uoms
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("unit of measure", id))
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn product(&self, id: ProductId) -> ServiceResult<Product> {
        self.find_product(id).cloned()
    }
}

impl PackagingCatalog for InMemoryCatalog {
    fn packaging(&self, id: PackagingId) -> ServiceResult<Packaging> {
        self.products
            .iter()
            .flat_map(|p| p.packagings.iter())
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("packaging", id))
    }

    fn find_suitable_packaging(
        &self,
        product: ProductId,
        qty: Decimal,
        uom: UomId,
    ) -> ServiceResult<Option<Packaging>> {
        let product = self.find_product(product)?;

        let mut best: Option<&Packaging> = None;
        for packaging in product.packagings.iter().filter(|p| p.purchase) {
            if packaging.qty <= Decimal::ZERO {
                continue;
            }
            let requested = self.convert_quantity(qty, uom, packaging.uom_id)?;
            if packaging.qty > requested {
                continue;
            }
            if best.is_none_or(|b| packaging.qty > b.qty) {
                best = Some(packaging);
            }
        }
        Ok(best.cloned())
    }
}

impl SellerPricing for InMemoryCatalog {
    fn select_seller(
        &self,
        product: ProductId,
        quantity: Decimal,
        date: Option<NaiveDate>,
        uom: UomId,
    ) -> ServiceResult<Option<SellerOffer>> {
        let mut candidates = Vec::new();
        for offer in self.offers.iter().filter(|o| o.product_id == product) {
            if !offer.is_valid_on(date) {
                continue;
            }
            let in_offer_uom = self.convert_quantity(quantity, uom, offer.uom_id)?;
            if in_offer_uom < offer.min_qty {
                continue;
            }
            candidates.push(offer);
        }

        candidates.sort_by(|a, b| {
            a.sequence
                .cmp(&b.sequence)
                .then(b.min_qty.cmp(&a.min_qty))
                .then(a.price.cmp(&b.price))
        });
        Ok(candidates.first().map(|o| (*o).clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_core::{Currency, CurrencyCode, PartyId};
    use rust_decimal_macros::dec;

    fn usd() -> Currency {
        Currency::new(CurrencyCode::new("USD").unwrap(), 2)
    }

    struct Fixture {
        catalog: InMemoryCatalog,
        units: Uom,
        dozens: Uom,
        product: Product,
    }

    fn fixture() -> Fixture {
        let units = Uom::new("Units", "Unit", dec!(1), dec!(0.01));
        let dozens = Uom::new("Dozens", "Unit", dec!(12), dec!(0.01));
        let product = Product::new("Copy paper", units.id, dec!(4), usd())
            .with_packaging("Box of 6", dec!(6))
            .with_packaging("Carton of 12", dec!(12))
            .with_packaging("Pallet of 240", dec!(240));
        let catalog = InMemoryCatalog::new()
            .with_uom(units.clone())
            .with_uom(dozens.clone())
            .with_product(product.clone());
        Fixture {
            catalog,
            units,
            dozens,
            product,
        }
    }

    fn offer(f: &Fixture, price: Decimal, min_qty: Decimal, sequence: i32) -> SellerOffer {
        SellerOffer {
            partner_id: PartyId::new(),
            product_id: f.product.id,
            price,
            currency: usd(),
            uom_id: f.units.id,
            lead_time_days: 3,
            min_qty,
            date_start: None,
            date_end: None,
            sequence,
        }
    }

    #[test]
    fn suggests_biggest_packaging_not_exceeding_quantity() {
        let f = fixture();
        let found = f
            .catalog
            .find_suitable_packaging(f.product.id, dec!(30), f.units.id)
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "Carton of 12");
    }

    #[test]
    fn packaging_suggestion_converts_the_requested_unit() {
        let f = fixture();
        let found = f
            .catalog
            .find_suitable_packaging(f.product.id, dec!(25), f.dozens.id)
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "Pallet of 240");
    }

    #[test]
    fn no_packaging_fits_small_quantities() {
        let f = fixture();
        let found = f
            .catalog
            .find_suitable_packaging(f.product.id, dec!(2), f.units.id)
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn seller_selection_honours_min_qty_and_sequence() {
        let f = fixture();
        let catalog = f
            .catalog
            .clone()
            .with_offer(offer(&f, dec!(3.50), dec!(0), 2))
            .with_offer(offer(&f, dec!(3.00), dec!(100), 1))
            .with_offer(offer(&f, dec!(3.20), dec!(10), 1));

        let small = catalog
            .select_seller(f.product.id, dec!(5), None, f.units.id)
            .unwrap()
            .unwrap();
        assert_eq!(small.price, dec!(3.50));

        let medium = catalog
            .select_seller(f.product.id, dec!(20), None, f.units.id)
            .unwrap()
            .unwrap();
        assert_eq!(medium.price, dec!(3.20));

        let bulk = catalog
            .select_seller(f.product.id, dec!(10), None, f.dozens.id)
            .unwrap()
            .unwrap();
        assert_eq!(bulk.price, dec!(3.00));
    }

    #[test]
    fn expired_offers_are_ignored() {
        let f = fixture();
        let mut expired = offer(&f, dec!(1), dec!(0), 1);
        expired.date_end = NaiveDate::from_ymd_opt(2024, 1, 31);
        let catalog = f.catalog.clone().with_offer(expired);

        let date = NaiveDate::from_ymd_opt(2024, 2, 1);
        assert!(
            catalog
                .select_seller(f.product.id, dec!(1), date, f.units.id)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn unknown_product_is_a_lookup_failure() {
        let f = fixture();
        let err = f.catalog.product(ProductId::new()).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { kind: "product", .. }));
    }

    #[test]
    fn catalog_deserialises_from_json() {
        let f = fixture();
        let json = serde_json::to_string(&f.catalog).unwrap();
        let back: InMemoryCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f.catalog);
    }
}
