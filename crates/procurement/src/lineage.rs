//! Navigation along derivation back-references.

use procura_core::DocumentId;

use crate::document::{Document, DocumentKind};

/// Live documents of `kind` derived directly from `source`.
pub fn derived_from<'a>(documents: &'a [Document], source: DocumentId, kind: DocumentKind) -> Vec<&'a Document> {
    documents
        .iter()
        .filter(|d| !d.is_deleted() && d.kind() == kind)
        .filter(|d| d.source().is_some_and(|s| s.document == source))
        .collect()
}

/// Purchase orders that trace back to `request`, through its RFQs or their
/// recorded origin request.
pub fn purchase_orders_for_request<'a>(documents: &'a [Document], request: DocumentId) -> Vec<&'a Document> {
    let rfqs: Vec<DocumentId> = derived_from(documents, request, DocumentKind::Rfq)
        .into_iter()
        .map(|d| d.id_typed())
        .collect();

    documents
        .iter()
        .filter(|d| !d.is_deleted() && d.kind() == DocumentKind::PurchaseOrder)
        .filter(|d| {
            d.origin_request() == Some(request)
                || d.source().is_some_and(|s| rfqs.contains(&s.document))
        })
        .collect()
}
