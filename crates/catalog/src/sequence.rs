use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{ServiceError, ServiceResult};

/// Reference code generator (one counter per document type code).
pub trait ReferenceSequence {
    fn next_reference(&self, code: &str) -> ServiceResult<String>;
}

/// In-memory sequence: `{prefix}{counter:05}`, thread-safe.
#[derive(Debug, Default)]
pub struct InMemorySequence {
    prefixes: HashMap<String, String>,
    counters: Mutex<HashMap<String, u64>>,
}

impl InMemorySequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `prefix` for `code` instead of the upper-cased code.
    pub fn with_prefix(mut self, code: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.prefixes.insert(code.into(), prefix.into());
        self
    }
}

impl ReferenceSequence for InMemorySequence {
    fn next_reference(&self, code: &str) -> ServiceResult<String> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| ServiceError::unavailable("sequence", "counter lock poisoned"))?;
        let counter = counters.entry(code.to_string()).or_insert(0);
        *counter += 1;

        let prefix = self
            .prefixes
            .get(code)
            .cloned()
            .unwrap_or_else(|| format!("{}/", code.to_ascii_uppercase()));
        Ok(format!("{prefix}{:05}", *counter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent_per_code() {
        let seq = InMemorySequence::new().with_prefix("purchase.rfq", "RFQ/");
        assert_eq!(seq.next_reference("purchase.rfq").unwrap(), "RFQ/00001");
        assert_eq!(seq.next_reference("purchase.rfq").unwrap(), "RFQ/00002");
        assert_eq!(seq.next_reference("po").unwrap(), "PO/00001");
    }

    #[test]
    fn references_are_unique_across_threads() {
        let seq = std::sync::Arc::new(InMemorySequence::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = seq.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| seq.next_reference("pr").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 200);
    }
}
