use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{Currency, PackagingId, ProductId, UomId};
use procura_tax::TaxDefinition;

use crate::error::ServiceResult;

/// A packaging of a product: `qty` units of `uom_id` per package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packaging {
    pub id: PackagingId,
    pub product_id: ProductId,
    pub name: String,
    pub qty: Decimal,
    pub uom_id: UomId,
    /// Usable on purchase documents.
    #[serde(default = "default_true")]
    pub purchase: bool,
}

fn default_true() -> bool {
    true
}

impl Packaging {
    pub fn new(product_id: ProductId, name: impl Into<String>, qty: Decimal, uom_id: UomId) -> Self {
        Self {
            id: PackagingId::new(),
            product_id,
            name: name.into(),
            qty,
            uom_id,
            purchase: true,
        }
    }
}

/// Product master data as supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Base unit; the standard price is expressed per this unit.
    pub uom_id: UomId,
    /// Default unit on purchase lines.
    pub purchase_uom_id: UomId,
    /// Standard (cost) price per base unit, in `currency`.
    pub standard_price: Decimal,
    pub currency: Currency,
    #[serde(default)]
    pub supplier_taxes: Vec<TaxDefinition>,
    #[serde(default)]
    pub customer_taxes: Vec<TaxDefinition>,
    #[serde(default)]
    pub packagings: Vec<Packaging>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        uom_id: UomId,
        standard_price: Decimal,
        currency: Currency,
    ) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            uom_id,
            purchase_uom_id: uom_id,
            standard_price,
            currency,
            supplier_taxes: Vec::new(),
            customer_taxes: Vec::new(),
            packagings: Vec::new(),
        }
    }

    pub fn with_purchase_uom(mut self, uom_id: UomId) -> Self {
        self.purchase_uom_id = uom_id;
        self
    }

    pub fn with_supplier_taxes(mut self, taxes: Vec<TaxDefinition>) -> Self {
        self.supplier_taxes = taxes;
        self
    }

    pub fn with_customer_taxes(mut self, taxes: Vec<TaxDefinition>) -> Self {
        self.customer_taxes = taxes;
        self
    }

    /// Add a purchase packaging of `qty` base units.
    pub fn with_packaging(mut self, name: impl Into<String>, qty: Decimal) -> Self {
        let packaging = Packaging::new(self.id, name, qty, self.uom_id);
        self.packagings.push(packaging);
        self
    }
}

/// Product lookup.
pub trait ProductCatalog {
    fn product(&self, id: ProductId) -> ServiceResult<Product>;
}

/// Packaging lookup and suggestion.
pub trait PackagingCatalog {
    fn packaging(&self, id: PackagingId) -> ServiceResult<Packaging>;

    /// The biggest purchase packaging of `product` whose multiple does not
    /// exceed `qty` expressed in `uom`, if any.
    fn find_suitable_packaging(
        &self,
        product: ProductId,
        qty: Decimal,
        uom: UomId,
    ) -> ServiceResult<Option<Packaging>>;
}
