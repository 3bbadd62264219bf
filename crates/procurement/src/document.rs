//! Procurement documents: one header shape, four kinds.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{
    AggregateRoot, CompanyId, Currency, DocumentId, DomainError, DomainResult, FiscalPositionId,
    LineId, PartyId, PaymentTermId, UserId,
};
use procura_tax::{TaxGroupTotal, Totals};

use crate::line::Line;

/// Which document a header describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PurchaseRequest,
    Rfq,
    PurchaseOrder,
    SaleOrder,
}

impl DocumentKind {
    /// Code handed to the reference sequence.
    pub fn sequence_code(self) -> &'static str {
        match self {
            DocumentKind::PurchaseRequest => "purchase.request",
            DocumentKind::Rfq => "purchase.rfq",
            DocumentKind::PurchaseOrder => "purchase.order",
            DocumentKind::SaleOrder => "sale.order",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::PurchaseRequest => "purchase request",
            DocumentKind::Rfq => "request for quotation",
            DocumentKind::PurchaseOrder => "purchase order",
            DocumentKind::SaleOrder => "sale order",
        }
    }

    /// Whether line prices and planned dates follow vendor offers.
    ///
    /// Sale order lines are priced by the sale pricelist instead.
    pub fn is_vendor_priced(self) -> bool {
        !matches!(self, DocumentKind::SaleOrder)
    }
}

impl core::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentState {
    Draft,
    Rfq,
    #[serde(rename = "confirm")]
    Confirmed,
    Done,
}

impl core::fmt::Display for DocumentState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            DocumentState::Draft => "draft",
            DocumentState::Rfq => "rfq",
            DocumentState::Confirmed => "confirm",
            DocumentState::Done => "done",
        })
    }
}

/// The document another one was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub document: DocumentId,
    pub kind: DocumentKind,
}

/// Header fields that never feed a line computation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentHeader {
    pub partner: Option<PartyId>,
    pub company: CompanyId,
    pub buyer: Option<UserId>,
    /// Short description of the request.
    pub note: String,
    /// Terms and conditions.
    pub notes: String,
    pub origin: Option<String>,
    pub incoterm: Option<String>,
    pub payment_term: Option<PaymentTermId>,
    pub fiscal_position: Option<FiscalPositionId>,
    pub sale_pricelist: Option<String>,
}

/// Everything needed to open a new document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentDraft {
    /// Reference code; `None` or `"New"` asks the sequence for one.
    pub reference: Option<String>,
    pub header: DocumentHeader,
    pub currency: Option<Currency>,
    pub order_date: Option<DateTime<Utc>>,
}

/// A procurement document (aggregate root).
///
/// Totals, the tax breakdown and the planned date are derived from the lines
/// and have no public setter. They are serialized for readers but skipped on
/// deserialization; [`crate::DocumentService::restore`] rebuilds them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub(crate) id: DocumentId,
    pub(crate) kind: DocumentKind,
    pub(crate) reference: String,
    pub(crate) state: DocumentState,
    pub(crate) deleted: bool,
    pub(crate) header: DocumentHeader,
    pub(crate) currency: Option<Currency>,
    pub(crate) order_date: Option<DateTime<Utc>>,
    pub(crate) lines: Vec<Line>,
    #[serde(skip_deserializing)]
    pub(crate) totals: Totals,
    #[serde(skip_deserializing)]
    pub(crate) tax_groups: Vec<TaxGroupTotal>,
    #[serde(skip_deserializing)]
    pub(crate) date_planned: Option<DateTime<Utc>>,
    pub(crate) source: Option<SourceRef>,
    pub(crate) origin_request: Option<DocumentId>,
    pub(crate) version: u64,
}

impl Document {
    /// A new, empty draft.
    pub fn new(kind: DocumentKind, reference: impl Into<String>, draft: DocumentDraft) -> Self {
        Self {
            id: DocumentId::new(),
            kind,
            reference: reference.into(),
            state: DocumentState::Draft,
            deleted: false,
            header: draft.header,
            currency: draft.currency,
            order_date: draft.order_date,
            lines: Vec::new(),
            totals: Totals::default(),
            tax_groups: Vec::new(),
            date_planned: None,
            source: None,
            origin_request: None,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    pub fn currency(&self) -> Option<&Currency> {
        self.currency.as_ref()
    }

    pub fn order_date(&self) -> Option<DateTime<Utc>> {
        self.order_date
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.iter().find(|l| l.id == id)
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn amount_untaxed(&self) -> Decimal {
        self.totals.untaxed
    }

    pub fn amount_tax(&self) -> Decimal {
        self.totals.tax
    }

    pub fn amount_total(&self) -> Decimal {
        self.totals.total
    }

    pub fn tax_groups(&self) -> &[TaxGroupTotal] {
        &self.tax_groups
    }

    /// Earliest planned date over the product lines.
    pub fn date_planned(&self) -> Option<DateTime<Utc>> {
        self.date_planned
    }

    pub fn source(&self) -> Option<SourceRef> {
        self.source
    }

    /// The purchase request at the root of the derivation chain.
    pub fn origin_request(&self) -> Option<DocumentId> {
        self.origin_request
    }

    pub(crate) fn ensure_alive(&self) -> DomainResult<()> {
        if self.deleted {
            return Err(DomainError::conflict(format!(
                "{} {} has been deleted",
                self.kind, self.reference
            )));
        }
        Ok(())
    }

    /// Lines and line-affecting header fields change only in draft.
    pub(crate) fn ensure_editable(&self) -> DomainResult<()> {
        self.ensure_alive()?;
        if self.state != DocumentState::Draft {
            return Err(DomainError::validation(format!(
                "{} {} is in state {} and can no longer be edited",
                self.kind, self.reference, self.state
            )));
        }
        Ok(())
    }

    pub(crate) fn line_mut(&mut self, id: LineId) -> DomainResult<&mut Line> {
        self.lines
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(DomainError::not_found)
    }

    /// Keep lines in display order (stable for equal sequences).
    pub(crate) fn sort_lines(&mut self) {
        self.lines.sort_by_key(|l| l.sequence);
    }

    pub(crate) fn touch(&mut self) {
        self.version += 1;
    }
}

impl AggregateRoot for Document {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_documents_start_as_empty_drafts() {
        let doc = Document::new(DocumentKind::PurchaseRequest, "PR/00001", DocumentDraft::default());
        assert_eq!(doc.state(), DocumentState::Draft);
        assert!(doc.lines().is_empty());
        assert_eq!(doc.amount_total(), Decimal::ZERO);
        assert_eq!(doc.version(), 0);
        assert!(doc.ensure_editable().is_ok());
    }

    #[test]
    fn state_serialises_with_short_names() {
        let json = serde_json::to_string(&DocumentState::Confirmed).unwrap();
        assert_eq!(json, "\"confirm\"");
        let kind = serde_json::to_string(&DocumentKind::PurchaseRequest).unwrap();
        assert_eq!(kind, "\"purchase_request\"");
    }

    #[test]
    fn confirmed_documents_are_not_editable() {
        let mut doc = Document::new(DocumentKind::Rfq, "RFQ/00001", DocumentDraft::default());
        doc.state = DocumentState::Confirmed;
        let err = doc.ensure_editable().unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("confirm") => {}
            _ => panic!("Expected Validation error"),
        }
    }
}
