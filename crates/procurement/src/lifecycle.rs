//! Document lifecycle: explicit, forward-only transitions and draft-only deletion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use procura_core::{Aggregate, DocumentId, DomainError};
use procura_events::Event;

use crate::document::{Document, DocumentKind, DocumentState};

/// Explicit state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Submit,
    Confirm,
    Complete,
}

impl Transition {
    /// Target state of `self` from `from` for a document of `kind`, if allowed.
    pub fn target(self, kind: DocumentKind, from: DocumentState) -> Option<DocumentState> {
        use DocumentState::*;
        match (kind, self, from) {
            (DocumentKind::PurchaseRequest, Transition::Submit, Draft) => Some(Rfq),
            (DocumentKind::PurchaseRequest, Transition::Confirm, Rfq) => Some(Confirmed),
            (DocumentKind::PurchaseRequest, _, _) => None,
            (_, Transition::Confirm, Draft) => Some(Confirmed),
            (_, Transition::Complete, Confirmed) => Some(Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentCommand {
    Transition {
        transition: Transition,
        occurred_at: DateTime<Utc>,
    },
    Delete {
        occurred_at: DateTime<Utc>,
    },
}

/// Event: the document moved to another state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChanged {
    pub document_id: DocumentId,
    pub kind: DocumentKind,
    pub transition: Transition,
    pub from: DocumentState,
    pub to: DocumentState,
    pub occurred_at: DateTime<Utc>,
}

/// Event: the draft was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDeleted {
    pub document_id: DocumentId,
    pub kind: DocumentKind,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentEvent {
    StateChanged(StateChanged),
    Deleted(DocumentDeleted),
}

impl Event for DocumentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DocumentEvent::StateChanged(e) => match e.transition {
                Transition::Submit => "procurement.document.submitted",
                Transition::Confirm => "procurement.document.confirmed",
                Transition::Complete => "procurement.document.completed",
            },
            DocumentEvent::Deleted(_) => "procurement.document.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DocumentEvent::StateChanged(e) => e.occurred_at,
            DocumentEvent::Deleted(e) => e.occurred_at,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, DocumentEvent::Deleted(_))
    }
}

impl Aggregate for Document {
    type Command = DocumentCommand;
    type Event = DocumentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DocumentEvent::StateChanged(e) => self.state = e.to,
            DocumentEvent::Deleted(_) => self.deleted = true,
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        self.ensure_alive()?;
        match command {
            DocumentCommand::Transition {
                transition,
                occurred_at,
            } => self.handle_transition(*transition, *occurred_at),
            DocumentCommand::Delete { occurred_at } => self.handle_delete(*occurred_at),
        }
    }
}

impl Document {
    fn handle_transition(
        &self,
        transition: Transition,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<DocumentEvent>, DomainError> {
        let to = transition.target(self.kind, self.state).ok_or_else(|| {
            DomainError::validation(format!(
                "cannot {transition:?} a {} in state {}",
                self.kind, self.state
            ))
        })?;

        Ok(vec![DocumentEvent::StateChanged(StateChanged {
            document_id: self.id,
            kind: self.kind,
            transition,
            from: self.state,
            to,
            occurred_at,
        })])
    }

    fn handle_delete(&self, occurred_at: DateTime<Utc>) -> Result<Vec<DocumentEvent>, DomainError> {
        if self.state != DocumentState::Draft {
            return Err(DomainError::validation(format!(
                "{} {} is in state {}; only drafts can be deleted",
                self.kind, self.reference, self.state
            )));
        }

        Ok(vec![DocumentEvent::Deleted(DocumentDeleted {
            document_id: self.id,
            kind: self.kind,
            occurred_at,
        })])
    }
}
