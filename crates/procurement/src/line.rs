use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{DomainError, DomainResult, Entity, LineId, PackagingId, ProductId, UomId};
use procura_tax::{TaxDefinition, Totals};

/// Marks a line as layout only (no product, amounts or dates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayType {
    Section,
    Note,
}

/// Line fields the engine derives and the user may overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedField {
    Description,
    Uom,
    Packaging,
    PackagingQty,
    PriceUnit,
    DatePlanned,
}

/// A user write to a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum LineEdit {
    Product(Option<ProductId>),
    Quantity(Decimal),
    Uom(UomId),
    Packaging(Option<PackagingId>),
    PackagingQty(Decimal),
    PriceUnit(Decimal),
    Description(String),
    DatePlanned(Option<DateTime<Utc>>),
    Taxes(Vec<TaxDefinition>),
}

/// A document line. The same shape serves every document kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub(crate) id: LineId,
    pub(crate) sequence: u32,
    pub(crate) display_type: Option<DisplayType>,
    pub(crate) product: Option<ProductId>,
    pub(crate) description: String,
    pub(crate) quantity: Decimal,
    pub(crate) uom: Option<UomId>,
    pub(crate) price_unit: Decimal,
    pub(crate) taxes: Vec<TaxDefinition>,
    pub(crate) packaging: Option<PackagingId>,
    pub(crate) packaging_qty: Decimal,
    pub(crate) date_planned: Option<DateTime<Utc>>,
    #[serde(skip_deserializing)]
    pub(crate) subtotal: Decimal,
    #[serde(skip_deserializing)]
    pub(crate) tax: Decimal,
    #[serde(skip_deserializing)]
    pub(crate) total: Decimal,
    pub(crate) source_line: Option<LineId>,
    pub(crate) overrides: BTreeSet<DerivedField>,
}

impl Line {
    fn blank(display_type: Option<DisplayType>) -> Self {
        Self {
            id: LineId::new(),
            sequence: 10,
            display_type,
            product: None,
            description: String::new(),
            quantity: Decimal::ZERO,
            uom: None,
            price_unit: Decimal::ZERO,
            taxes: Vec::new(),
            packaging: None,
            packaging_qty: Decimal::ZERO,
            date_planned: None,
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            source_line: None,
            overrides: BTreeSet::new(),
        }
    }

    /// A product line; everything else is derived when it joins a document.
    pub fn product(product: ProductId, quantity: Decimal) -> Self {
        Self {
            product: Some(product),
            quantity,
            ..Self::blank(None)
        }
    }

    pub fn section(title: impl Into<String>) -> Self {
        Self {
            description: title.into(),
            ..Self::blank(Some(DisplayType::Section))
        }
    }

    pub fn note(text: impl Into<String>) -> Self {
        Self {
            description: text.into(),
            ..Self::blank(Some(DisplayType::Note))
        }
    }

    /// A fresh line carrying the identity fields of `source` and pointing back at it.
    pub(crate) fn product_like(source: &Line) -> Self {
        Self {
            sequence: source.sequence,
            product: source.product,
            description: source.description.clone(),
            quantity: source.quantity,
            uom: source.uom,
            source_line: Some(source.id),
            ..Self::blank(None)
        }
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_taxes(mut self, taxes: Vec<TaxDefinition>) -> Self {
        self.taxes = taxes;
        self
    }

    pub fn with_uom(mut self, uom: UomId) -> Self {
        self.uom = Some(uom);
        self.overrides.insert(DerivedField::Uom);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self.overrides.insert(DerivedField::Description);
        self
    }

    pub fn with_price_unit(mut self, price_unit: Decimal) -> Self {
        self.price_unit = price_unit;
        self.overrides.insert(DerivedField::PriceUnit);
        self
    }

    pub fn with_packaging(mut self, packaging: PackagingId) -> Self {
        self.packaging = Some(packaging);
        self.overrides.insert(DerivedField::Packaging);
        self
    }

    pub fn with_date_planned(mut self, date: DateTime<Utc>) -> Self {
        self.date_planned = Some(date);
        self.overrides.insert(DerivedField::DatePlanned);
        self
    }

    pub fn id_typed(&self) -> LineId {
        self.id
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn display_type(&self) -> Option<DisplayType> {
        self.display_type
    }

    /// Sections and notes never carry amounts, quantities or dates.
    pub fn is_pseudo(&self) -> bool {
        self.display_type.is_some()
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn uom(&self) -> Option<UomId> {
        self.uom
    }

    pub fn price_unit(&self) -> Decimal {
        self.price_unit
    }

    pub fn taxes(&self) -> &[TaxDefinition] {
        &self.taxes
    }

    pub fn packaging(&self) -> Option<PackagingId> {
        self.packaging
    }

    pub fn packaging_qty(&self) -> Decimal {
        self.packaging_qty
    }

    pub fn date_planned(&self) -> Option<DateTime<Utc>> {
        self.date_planned
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn tax(&self) -> Decimal {
        self.tax
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    /// The line this one was copied from, if any.
    pub fn source_line(&self) -> Option<LineId> {
        self.source_line
    }

    pub fn is_overridden(&self, field: DerivedField) -> bool {
        self.overrides.contains(&field)
    }

    pub fn overrides(&self) -> impl Iterator<Item = DerivedField> + '_ {
        self.overrides.iter().copied()
    }

    pub(crate) fn set_amounts(&mut self, totals: Totals) {
        self.subtotal = totals.untaxed;
        self.tax = totals.tax;
        self.total = totals.total;
    }

    pub(crate) fn clear_amounts(&mut self) {
        self.set_amounts(Totals::default());
    }

    /// Structural checks that do not need any collaborator.
    pub(crate) fn validate(&self) -> DomainResult<()> {
        if self.is_pseudo() {
            if self.product.is_some() {
                return Err(DomainError::validation(
                    "section and note lines cannot carry a product",
                ));
            }
            return Ok(());
        }
        if self.quantity.is_sign_negative() && !self.quantity.is_zero() {
            return Err(DomainError::validation("quantity must not be negative"));
        }
        Ok(())
    }

    /// Write the user-supplied value of an edit, flagging derived fields as
    /// overridden. Recomputation of dependants is the dispatcher's job.
    pub(crate) fn write(&mut self, edit: &LineEdit) -> DomainResult<()> {
        if self.is_pseudo() {
            return match edit {
                LineEdit::Description(text) => {
                    self.description = text.clone();
                    Ok(())
                }
                _ => Err(DomainError::validation(
                    "only the text of a section or note line can be edited",
                )),
            };
        }

        match edit {
            LineEdit::Product(product) => self.product = *product,
            LineEdit::Quantity(qty) => self.quantity = *qty,
            LineEdit::Uom(uom) => {
                self.uom = Some(*uom);
                self.overrides.insert(DerivedField::Uom);
            }
            LineEdit::Packaging(packaging) => {
                self.packaging = *packaging;
                self.overrides.insert(DerivedField::Packaging);
            }
            LineEdit::PackagingQty(qty) => {
                self.packaging_qty = *qty;
                self.overrides.insert(DerivedField::PackagingQty);
            }
            LineEdit::PriceUnit(price) => {
                self.price_unit = *price;
                self.overrides.insert(DerivedField::PriceUnit);
            }
            LineEdit::Description(text) => {
                self.description = text.clone();
                self.overrides.insert(DerivedField::Description);
            }
            LineEdit::DatePlanned(date) => {
                self.date_planned = *date;
                self.overrides.insert(DerivedField::DatePlanned);
            }
            LineEdit::Taxes(taxes) => self.taxes = taxes.clone(),
        }
        self.validate()
    }
}

impl Entity for Line {
    type Id = LineId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
