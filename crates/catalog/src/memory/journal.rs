use std::sync::{Arc, Mutex, PoisonError};

/// Ordered log of mutating calls, shared between in-memory collaborators so a
/// test can assert on the order things happened in.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Position of the first entry starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.entries().iter().position(|entry| entry.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_between_clones() {
        let journal = Journal::new();
        let clone = journal.clone();
        journal.record("styles");
        clone.record("insert:Dune");
        assert_eq!(journal.entries(), vec!["styles", "insert:Dune"]);
        assert_eq!(journal.position("insert"), Some(1));
        assert_eq!(journal.position("update"), None);
    }
}
