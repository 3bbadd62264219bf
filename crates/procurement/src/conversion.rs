//! Deriving one document from another (request to RFQ, RFQ to purchase
//! order, request to sale order).
//!
//! A derived document is a one-time copy: it starts as a fresh draft with its
//! own reference, points back at its source, and every product line points
//! back at the line it came from. Sections and notes are not copied.

use procura_catalog::ReferenceSequence;
use procura_core::{DocumentId, DomainError, DomainResult};
use procura_tax::TaxDefinition;

use crate::aggregation;
use crate::config::EngineConfig;
use crate::derivation::Services;
use crate::document::{Document, DocumentDraft, DocumentHeader, DocumentKind, SourceRef};
use crate::line::{DerivedField, Line};

/// Rules for turning a document of one kind into a document of another.
pub trait DerivationStrategy {
    fn source_kind(&self) -> DocumentKind;

    fn target_kind(&self) -> DocumentKind;

    fn copies_prices(&self) -> bool;

    fn copies_packaging(&self) -> bool;

    fn copies_planned_dates(&self) -> bool {
        true
    }

    /// Adjust the copied header (e.g. stamp a pricelist).
    fn adapt_header(&self, _source: &Document, _config: &EngineConfig, _header: &mut DocumentHeader) {}

    /// Request at the root of the chain the target belongs to.
    fn origin_request(&self, _source: &Document) -> Option<DocumentId> {
        None
    }

    /// Tax set of the target line.
    fn line_taxes(&self, line: &Line, _services: &Services<'_>) -> DomainResult<Vec<TaxDefinition>> {
        Ok(line.taxes().to_vec())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestToRfq;

impl DerivationStrategy for RequestToRfq {
    fn source_kind(&self) -> DocumentKind {
        DocumentKind::PurchaseRequest
    }

    fn target_kind(&self) -> DocumentKind {
        DocumentKind::Rfq
    }

    fn copies_prices(&self) -> bool {
        true
    }

    fn copies_packaging(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RfqToPurchaseOrder;

impl DerivationStrategy for RfqToPurchaseOrder {
    fn source_kind(&self) -> DocumentKind {
        DocumentKind::Rfq
    }

    fn target_kind(&self) -> DocumentKind {
        DocumentKind::PurchaseOrder
    }

    fn copies_prices(&self) -> bool {
        true
    }

    fn copies_packaging(&self) -> bool {
        true
    }

    fn origin_request(&self, source: &Document) -> Option<DocumentId> {
        source
            .source()
            .filter(|s| s.kind == DocumentKind::PurchaseRequest)
            .map(|s| s.document)
    }
}

/// Sale order prices come from the sale pricelist, not from the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestToSaleOrder;

impl DerivationStrategy for RequestToSaleOrder {
    fn source_kind(&self) -> DocumentKind {
        DocumentKind::PurchaseRequest
    }

    fn target_kind(&self) -> DocumentKind {
        DocumentKind::SaleOrder
    }

    fn copies_prices(&self) -> bool {
        false
    }

    fn copies_packaging(&self) -> bool {
        false
    }

    fn copies_planned_dates(&self) -> bool {
        false
    }

    fn adapt_header(&self, _source: &Document, config: &EngineConfig, header: &mut DocumentHeader) {
        header.sale_pricelist = config.sale_pricelist.clone();
    }

    fn line_taxes(&self, line: &Line, services: &Services<'_>) -> DomainResult<Vec<TaxDefinition>> {
        if let Some(id) = line.product_id() {
            let product = services.products.product(id)?;
            if !product.customer_taxes.is_empty() {
                return Ok(product.customer_taxes);
            }
        }
        Ok(line.taxes().to_vec())
    }
}

fn derive_header(source: &Document) -> DocumentHeader {
    let from = source.header();
    DocumentHeader {
        partner: from.partner,
        company: from.company,
        buyer: from.buyer,
        note: from.note.clone(),
        notes: from.notes.clone(),
        origin: Some(source.reference().to_string()),
        incoterm: from.incoterm.clone(),
        payment_term: from.payment_term,
        fiscal_position: from.fiscal_position,
        sale_pricelist: None,
    }
}

fn derive_target_line(
    source_line: &Line,
    strategy: &dyn DerivationStrategy,
    services: &Services<'_>,
) -> DomainResult<Line> {
    let mut line = Line::product_like(source_line);
    line.taxes = strategy.line_taxes(source_line, services)?;
    line.overrides.insert(DerivedField::Description);
    if line.uom.is_some() {
        line.overrides.insert(DerivedField::Uom);
    }

    if strategy.copies_prices() {
        line.price_unit = source_line.price_unit();
        line.overrides.insert(DerivedField::PriceUnit);
    }
    if strategy.copies_packaging() {
        line.packaging = source_line.packaging();
        line.packaging_qty = source_line.packaging_qty();
        line.overrides.insert(DerivedField::Packaging);
        line.overrides.insert(DerivedField::PackagingQty);
    }
    if strategy.copies_planned_dates() && source_line.date_planned().is_some() {
        line.date_planned = source_line.date_planned();
        line.overrides.insert(DerivedField::DatePlanned);
    }
    Ok(line)
}

/// Build a new draft of the strategy's target kind from `source`.
///
/// Fails with a validation error when the source is of the wrong kind, has
/// been deleted, or lacks a partner or a currency.
pub fn derive(
    source: &Document,
    strategy: &dyn DerivationStrategy,
    sequence: &dyn ReferenceSequence,
    services: &Services<'_>,
    config: &EngineConfig,
) -> DomainResult<Document> {
    if source.is_deleted() {
        return Err(DomainError::validation(format!(
            "{} {} has been deleted",
            source.kind(),
            source.reference()
        )));
    }
    if source.kind() != strategy.source_kind() {
        return Err(DomainError::validation(format!(
            "a {} cannot be derived from a {}",
            strategy.target_kind(),
            source.kind()
        )));
    }
    if source.header().partner.is_none() {
        return Err(DomainError::validation(format!(
            "{} {} has no partner",
            source.kind(),
            source.reference()
        )));
    }
    let Some(currency) = source.currency().cloned() else {
        return Err(DomainError::validation(format!(
            "{} {} has no currency",
            source.kind(),
            source.reference()
        )));
    };

    let mut header = derive_header(source);
    strategy.adapt_header(source, config, &mut header);

    let lines = source
        .lines()
        .iter()
        .filter(|l| !l.is_pseudo())
        .map(|l| derive_target_line(l, strategy, services))
        .collect::<DomainResult<Vec<_>>>()?;

    let target_kind = strategy.target_kind();
    let reference = sequence.next_reference(target_kind.sequence_code())?;
    let mut target = Document::new(
        target_kind,
        reference,
        DocumentDraft {
            reference: None,
            header,
            currency: Some(currency),
            order_date: source.order_date(),
        },
    );
    target.source = Some(SourceRef {
        document: source.id_typed(),
        kind: source.kind(),
    });
    target.origin_request = strategy.origin_request(source);
    target.lines = lines;

    aggregation::recompute_totals(&mut target, config.rounding, services.taxes)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_catalog::{InMemoryCatalog, InMemorySequence, Product, RateTable, Uom};
    use procura_core::{Currency, CurrencyCode, PartyId};
    use procura_tax::StandardTaxComputer;
    use rust_decimal_macros::dec;

    fn usd() -> Currency {
        Currency::new(CurrencyCode::new("USD").unwrap(), 2)
    }

    struct World {
        catalog: InMemoryCatalog,
        rates: RateTable,
        plain: Product,
        taxed: Product,
    }

    fn world() -> World {
        let units = Uom::new("Units", "Unit", dec!(1), dec!(0.01));
        let plain = Product::new("Desk", units.id, dec!(120), usd());
        let taxed = Product::new("Chair", units.id, dec!(80), usd())
            .with_customer_taxes(vec![TaxDefinition::percent("Sales VAT 5%", dec!(5))]);
        let catalog = InMemoryCatalog::new()
            .with_uom(units)
            .with_product(plain.clone())
            .with_product(taxed.clone());
        World {
            catalog,
            rates: RateTable::new(CurrencyCode::new("USD").unwrap()),
            plain,
            taxed,
        }
    }

    fn request(w: &World) -> Document {
        let draft = DocumentDraft {
            header: DocumentHeader {
                partner: Some(PartyId::new()),
                ..DocumentHeader::default()
            },
            currency: Some(usd()),
            ..DocumentDraft::default()
        };
        let mut doc = Document::new(DocumentKind::PurchaseRequest, "PR/00001", draft);
        let purchase_vat = TaxDefinition::percent("Purchase VAT 15%", dec!(15));
        doc.lines = vec![
            Line::section("Furniture"),
            Line::product(w.plain.id, dec!(2))
                .with_price_unit(dec!(120))
                .with_taxes(vec![purchase_vat.clone()]),
            Line::product(w.taxed.id, dec!(4))
                .with_price_unit(dec!(80))
                .with_taxes(vec![purchase_vat]),
        ];
        doc
    }

    #[test]
    fn rfq_copies_product_lines_with_back_references() {
        let w = world();
        let services = Services::from_catalog(&w.catalog, &w.rates, &StandardTaxComputer);
        let source = request(&w);

        let rfq = derive(
            &source,
            &RequestToRfq,
            &InMemorySequence::new().with_prefix("purchase.rfq", "RFQ/"),
            &services,
            &EngineConfig::default(),
        )
        .unwrap();

        assert_eq!(rfq.kind(), DocumentKind::Rfq);
        assert_eq!(rfq.reference(), "RFQ/00001");
        assert_eq!(rfq.lines().len(), 2);
        assert_eq!(rfq.lines()[0].source_line(), Some(source.lines()[1].id_typed()));
        assert_eq!(rfq.lines()[0].price_unit(), dec!(120));
        assert!(rfq.lines()[0].is_overridden(DerivedField::PriceUnit));
        assert_eq!(rfq.source().map(|s| s.document), Some(source.id_typed()));
        assert_eq!(rfq.header().origin.as_deref(), Some("PR/00001"));
        assert_eq!(rfq.amount_untaxed(), dec!(560));
    }

    #[test]
    fn sale_order_prefers_customer_taxes_and_leaves_prices() {
        let w = world();
        let services = Services::from_catalog(&w.catalog, &w.rates, &StandardTaxComputer);
        let config = EngineConfig::default().with_sale_pricelist("Default AED pricelist");

        let so = derive(&request(&w), &RequestToSaleOrder, &InMemorySequence::new(), &services, &config)
            .unwrap();

        assert_eq!(so.header().sale_pricelist.as_deref(), Some("Default AED pricelist"));
        assert_eq!(so.lines()[0].taxes()[0].name, "Purchase VAT 15%");
        assert_eq!(so.lines()[1].taxes()[0].name, "Sales VAT 5%");
        assert_eq!(so.lines()[1].price_unit(), dec!(0));
        assert_eq!(so.amount_total(), dec!(0));
    }

    #[test]
    fn wrong_source_kind_is_rejected() {
        let w = world();
        let services = Services::from_catalog(&w.catalog, &w.rates, &StandardTaxComputer);

        let err = derive(
            &request(&w),
            &RfqToPurchaseOrder,
            &InMemorySequence::new(),
            &services,
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn missing_partner_or_currency_is_rejected() {
        let w = world();
        let services = Services::from_catalog(&w.catalog, &w.rates, &StandardTaxComputer);
        let sequence = InMemorySequence::new();
        let config = EngineConfig::default();

        let mut no_partner = request(&w);
        no_partner.header.partner = None;
        let err = derive(&no_partner, &RequestToRfq, &sequence, &services, &config).unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("partner") => {}
            _ => panic!("Expected Validation error"),
        }

        let mut no_currency = request(&w);
        no_currency.currency = None;
        let err = derive(&no_currency, &RequestToRfq, &sequence, &services, &config).unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("currency") => {}
            _ => panic!("Expected Validation error"),
        }
    }
}
