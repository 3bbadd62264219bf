//! JSON scenarios: a catalog, a purchase request and the documents to derive from it.

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_catalog::{InMemoryCatalog, InMemorySequence, RateTable};
use procura_core::{ProductId, UomId};
use procura_procurement::{
    Document, DocumentDraft, DocumentKind, DocumentService, DocumentState, EngineConfig,
    FixedClock, Line, RequestToRfq, RequestToSaleOrder, RfqToPurchaseOrder, Services,
};
use procura_tax::{StandardTaxComputer, TaxDefinition, TaxGroupTotal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Submit the request (draft to rfq).
    Submit,
    /// Derive an RFQ from the request.
    Rfq,
    /// Confirm the latest RFQ and derive a purchase order from it.
    PurchaseOrder,
    /// Derive a sale order from the request.
    SaleOrder,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum LineSpec {
    Product {
        product: ProductId,
        quantity: Decimal,
        #[serde(default)]
        uom: Option<UomId>,
        #[serde(default)]
        price_unit: Option<Decimal>,
        #[serde(default)]
        taxes: Vec<TaxDefinition>,
        #[serde(default)]
        sequence: Option<u32>,
    },
    Section {
        text: String,
        #[serde(default)]
        sequence: Option<u32>,
    },
    Note {
        text: String,
        #[serde(default)]
        sequence: Option<u32>,
    },
}

impl LineSpec {
    fn into_line(self) -> Line {
        let (line, sequence) = match self {
            LineSpec::Product {
                product,
                quantity,
                uom,
                price_unit,
                taxes,
                sequence,
            } => {
                let mut line = Line::product(product, quantity).with_taxes(taxes);
                if let Some(uom) = uom {
                    line = line.with_uom(uom);
                }
                if let Some(price) = price_unit {
                    line = line.with_price_unit(price);
                }
                (line, sequence)
            }
            LineSpec::Section { text, sequence } => (Line::section(text), sequence),
            LineSpec::Note { text, sequence } => (Line::note(text), sequence),
        };
        match sequence {
            Some(seq) => line.with_sequence(seq),
            None => line,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Engine settings; `PROCURA_*` variables apply when absent.
    #[serde(default)]
    pub config: Option<EngineConfig>,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
    pub catalog: InMemoryCatalog,
    pub rates: RateTable,
    pub request: DocumentDraft,
    pub lines: Vec<LineSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineReport {
    pub description: String,
    pub quantity: Decimal,
    pub price_unit: Decimal,
    pub packaging_qty: Decimal,
    pub date_planned: Option<DateTime<Utc>>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub reference: String,
    pub kind: DocumentKind,
    pub state: DocumentState,
    pub source: Option<String>,
    pub date_planned: Option<DateTime<Utc>>,
    pub amount_untaxed: Decimal,
    pub amount_tax: Decimal,
    pub amount_total: Decimal,
    pub tax_groups: Vec<TaxGroupTotal>,
    pub lines: Vec<LineReport>,
}

impl DocumentReport {
    fn from_document(doc: &Document) -> Self {
        Self {
            reference: doc.reference().to_string(),
            kind: doc.kind(),
            state: doc.state(),
            source: doc.header().origin.clone(),
            date_planned: doc.date_planned(),
            amount_untaxed: doc.amount_untaxed(),
            amount_tax: doc.amount_tax(),
            amount_total: doc.amount_total(),
            tax_groups: doc.tax_groups().to_vec(),
            lines: doc
                .lines()
                .iter()
                .filter(|l| !l.is_pseudo())
                .map(|l| LineReport {
                    description: l.description().to_string(),
                    quantity: l.quantity(),
                    price_unit: l.price_unit(),
                    packaging_qty: l.packaging_qty(),
                    date_planned: l.date_planned(),
                    subtotal: l.subtotal(),
                    tax: l.tax(),
                    total: l.total(),
                })
                .collect(),
        }
    }
}

impl Scenario {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("invalid scenario")
    }

    /// Build the request, run the steps and report every document touched.
    pub fn run(self, config: EngineConfig) -> anyhow::Result<Vec<DocumentReport>> {
        let config = self.config.unwrap_or(config);
        let sequence = InMemorySequence::new()
            .with_prefix("purchase.request", "PR/")
            .with_prefix("purchase.rfq", "RFQ/")
            .with_prefix("purchase.order", "PO/")
            .with_prefix("sale.order", "SO/");
        let clock = FixedClock(self.now.unwrap_or_else(Utc::now));
        let services = Services::from_catalog(&self.catalog, &self.rates, &StandardTaxComputer);
        let svc = DocumentService::new(config, services, &sequence, &clock);

        let mut request = svc.create(DocumentKind::PurchaseRequest, self.request)?;
        for spec in self.lines {
            svc.add_line(&mut request, spec.into_line())
                .with_context(|| format!("cannot add line to {}", request.reference()))?;
        }

        let mut derived: Vec<Document> = Vec::new();
        for step in self.steps {
            tracing::debug!(step = ?step, "running scenario step");
            match step {
                Step::Submit => {
                    svc.submit(&mut request)?;
                }
                Step::Rfq => derived.push(svc.derive(&request, &RequestToRfq)?),
                Step::SaleOrder => derived.push(svc.derive(&request, &RequestToSaleOrder)?),
                Step::PurchaseOrder => {
                    let Some(rfq) = derived.iter_mut().rev().find(|d| d.kind() == DocumentKind::Rfq) else {
                        bail!("purchase_order step needs an rfq step before it");
                    };
                    if rfq.state() == DocumentState::Draft {
                        svc.confirm(rfq)?;
                    }
                    let po = svc.derive(rfq, &RfqToPurchaseOrder)?;
                    derived.push(po);
                }
            }
        }

        Ok(std::iter::once(&request)
            .chain(derived.iter())
            .map(DocumentReport::from_document)
            .collect())
    }
}
