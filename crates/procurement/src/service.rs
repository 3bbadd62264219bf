//! Application-facing operations on documents.
//!
//! [`DocumentService`] is the only write path callers need: it enforces the
//! draft-only rules, drives the recompute dispatcher after every edit,
//! refreshes the document totals and runs lifecycle commands through the
//! aggregate. Every operation is all-or-nothing: on error the document is
//! left as it was.

use chrono::{DateTime, Utc};

use procura_catalog::ReferenceSequence;
use procura_core::{Currency, DomainError, DomainResult, LineId};
use procura_events::{Event, execute};

use crate::aggregation;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::conversion::{self, DerivationStrategy};
use crate::derivation::{self, LineContext, Services};
use crate::document::{Document, DocumentDraft, DocumentHeader, DocumentKind};
use crate::lifecycle::{DocumentCommand, DocumentEvent, Transition};
use crate::line::{Line, LineEdit};
use crate::recompute::{self, FieldChange};

/// Reference placeholder that asks for a generated reference.
pub const NEW_REFERENCE: &str = "New";

pub struct DocumentService<'a> {
    config: EngineConfig,
    services: Services<'a>,
    sequence: &'a dyn ReferenceSequence,
    clock: &'a dyn Clock,
}

impl<'a> DocumentService<'a> {
    pub fn new(
        config: EngineConfig,
        services: Services<'a>,
        sequence: &'a dyn ReferenceSequence,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            config,
            services,
            sequence,
            clock,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a new draft, assigning a reference and a placeholder note when missing.
    pub fn create(&self, kind: DocumentKind, draft: DocumentDraft) -> DomainResult<Document> {
        let mut draft = draft;
        let reference = match draft.reference.take().map(|r| r.trim().to_string()) {
            Some(r) if !r.is_empty() && r != NEW_REFERENCE => r,
            _ => self.sequence.next_reference(kind.sequence_code())?,
        };
        if draft.header.note.trim().is_empty() {
            draft.header.note = self.config.placeholder_note.clone();
        }

        let doc = Document::new(kind, reference, draft);
        tracing::info!(
            document_id = %doc.id_typed(),
            kind = %kind,
            reference = doc.reference(),
            "document created"
        );
        Ok(doc)
    }

    fn line_context<'d>(&self, doc: &'d Document) -> LineContext<'d> {
        LineContext::for_document(doc, self.config.product_price_digits, self.clock.now())
    }

    fn refresh_totals(&self, doc: &mut Document) -> DomainResult<()> {
        aggregation::recompute_totals(doc, self.config.rounding, self.services.taxes)
    }

    /// Rebuild line amounts, totals, tax groups and planned date of a
    /// document read back from storage, in any state.
    pub fn restore(&self, doc: &mut Document) -> DomainResult<()> {
        self.refresh_totals(doc)?;
        tracing::debug!(document_id = %doc.id_typed(), "document restored");
        Ok(())
    }

    /// Run `op` on `doc`, rolling back on error.
    fn mutate<T>(
        &self,
        doc: &mut Document,
        action: &'static str,
        op: impl FnOnce(&Self, &mut Document) -> DomainResult<T>,
    ) -> DomainResult<T> {
        if let Err(err) = doc.ensure_editable() {
            tracing::warn!(document_id = %doc.id_typed(), action, error = %err, "edit rejected");
            return Err(err);
        }

        let snapshot = doc.clone();
        match op(self, doc).and_then(|out| self.refresh_totals(doc).map(|_| out)) {
            Ok(out) => {
                doc.touch();
                Ok(out)
            }
            Err(err) => {
                *doc = snapshot;
                tracing::warn!(document_id = %doc.id_typed(), action, error = %err, "edit failed");
                Err(err)
            }
        }
    }

    /// Append a line, deriving every field the caller did not set.
    pub fn add_line(&self, doc: &mut Document, line: Line) -> DomainResult<LineId> {
        self.mutate(doc, "add_line", |svc, doc| {
            line.validate()?;
            let line = if line.is_pseudo() {
                line
            } else {
                derivation::derive_line(line, &svc.line_context(doc), &svc.services)?
            };
            let id = line.id_typed();
            if doc.line(id).is_some() {
                return Err(DomainError::conflict(format!("line {id} already exists")));
            }
            doc.lines.push(line);
            doc.sort_lines();
            tracing::debug!(document_id = %doc.id_typed(), line_id = %id, "line added");
            Ok(id)
        })
    }

    /// Apply a user edit to a line and recompute what depends on it.
    pub fn update_line(&self, doc: &mut Document, line_id: LineId, edit: LineEdit) -> DomainResult<()> {
        self.mutate(doc, "update_line", |svc, doc| {
            let changes: &[FieldChange] = match &edit {
                LineEdit::Product(_) => &[FieldChange::Product],
                LineEdit::Quantity(_) => &[FieldChange::Quantity],
                LineEdit::Uom(_) => &[FieldChange::Uom],
                LineEdit::Packaging(_) => &[FieldChange::Packaging],
                LineEdit::PriceUnit(_) => &[FieldChange::PriceUnit],
                LineEdit::Taxes(_) => &[FieldChange::Taxes],
                LineEdit::PackagingQty(_) | LineEdit::Description(_) | LineEdit::DatePlanned(_) => &[],
            };

            let mut line = doc
                .line(line_id)
                .cloned()
                .ok_or_else(DomainError::not_found)?;
            line.write(&edit)?;
            recompute::apply(&mut line, changes, &svc.line_context(doc), &svc.services)?;
            *doc.line_mut(line_id)? = line;
            Ok(())
        })
    }

    pub fn remove_line(&self, doc: &mut Document, line_id: LineId) -> DomainResult<()> {
        self.mutate(doc, "remove_line", |_, doc| {
            let before = doc.lines.len();
            doc.lines.retain(|l| l.id_typed() != line_id);
            if doc.lines.len() == before {
                return Err(DomainError::not_found());
            }
            Ok(())
        })
    }

    /// Change the order date; lines re-derive the fields the user left alone.
    pub fn set_order_date(&self, doc: &mut Document, order_date: Option<DateTime<Utc>>) -> DomainResult<()> {
        self.mutate(doc, "set_order_date", |svc, doc| {
            doc.order_date = order_date;
            svc.recompute_lines(doc, &[FieldChange::OrderDate])
        })
    }

    pub fn set_currency(&self, doc: &mut Document, currency: Option<Currency>) -> DomainResult<()> {
        self.mutate(doc, "set_currency", |svc, doc| {
            doc.currency = currency;
            svc.recompute_lines(doc, &[FieldChange::Currency])
        })
    }

    /// Edit header fields that feed no computation (partner, notes, terms).
    pub fn edit_header(&self, doc: &mut Document, edit: impl FnOnce(&mut DocumentHeader)) -> DomainResult<()> {
        self.mutate(doc, "edit_header", |_, doc| {
            edit(&mut doc.header);
            Ok(())
        })
    }

    fn recompute_lines(&self, doc: &mut Document, changes: &[FieldChange]) -> DomainResult<()> {
        let mut lines = doc.lines.clone();
        {
            let ctx = self.line_context(doc);
            for line in &mut lines {
                recompute::apply(line, changes, &ctx, &self.services)?;
            }
        }
        doc.lines = lines;
        Ok(())
    }

    /// Derive a new draft from `source`.
    pub fn derive(&self, source: &Document, strategy: &dyn DerivationStrategy) -> DomainResult<Document> {
        match conversion::derive(source, strategy, self.sequence, &self.services, &self.config) {
            Ok(target) => {
                tracing::info!(
                    source_id = %source.id_typed(),
                    source = source.reference(),
                    target_id = %target.id_typed(),
                    target = target.reference(),
                    kind = %target.kind(),
                    lines = target.lines().len(),
                    "document derived"
                );
                Ok(target)
            }
            Err(err) => {
                tracing::warn!(source_id = %source.id_typed(), error = %err, "derivation rejected");
                Err(err)
            }
        }
    }

    pub fn submit(&self, doc: &mut Document) -> DomainResult<Vec<DocumentEvent>> {
        self.transition(doc, Transition::Submit)
    }

    pub fn confirm(&self, doc: &mut Document) -> DomainResult<Vec<DocumentEvent>> {
        self.transition(doc, Transition::Confirm)
    }

    pub fn complete(&self, doc: &mut Document) -> DomainResult<Vec<DocumentEvent>> {
        self.transition(doc, Transition::Complete)
    }

    pub fn delete(&self, doc: &mut Document) -> DomainResult<Vec<DocumentEvent>> {
        let command = DocumentCommand::Delete {
            occurred_at: self.clock.now(),
        };
        self.run_command(doc, &command)
    }

    fn transition(&self, doc: &mut Document, transition: Transition) -> DomainResult<Vec<DocumentEvent>> {
        let command = DocumentCommand::Transition {
            transition,
            occurred_at: self.clock.now(),
        };
        self.run_command(doc, &command)
    }

    fn run_command(&self, doc: &mut Document, command: &DocumentCommand) -> DomainResult<Vec<DocumentEvent>> {
        match execute(doc, command) {
            Ok(events) => {
                for event in &events {
                    tracing::info!(
                        document_id = %doc.id_typed(),
                        reference = doc.reference(),
                        event_type = event.event_type(),
                        state = %doc.state(),
                        terminal = event.is_terminal(),
                        "lifecycle transition"
                    );
                }
                Ok(events)
            }
            Err(err) => {
                tracing::warn!(
                    document_id = %doc.id_typed(),
                    state = %doc.state(),
                    error = %err,
                    "lifecycle command rejected"
                );
                Err(err)
            }
        }
    }
}
