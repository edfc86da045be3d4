use super::Journal;
use crate::SettingsStore;
use crate::error::Result;
use shelf_record::models::{Bundle, Style};
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;

#[derive(Default)]
struct State {
    styles: Vec<Style>,
    preferences: Bundle,
    last_full_backup: Option<OffsetDateTime>,
}

/// In-memory styles and preferences.
///
/// Imported styles replace existing ones with the same UUID; imported
/// preferences are merged key by key.
#[derive(Default)]
pub struct MemorySettings {
    state: Mutex<State>,
    journal: Option<Journal>,
}

impl MemorySettings {
    pub fn new(styles: Vec<Style>, preferences: Bundle) -> Self {
        Self { state: Mutex::new(State { styles, preferences, last_full_backup: None }), journal: None }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, entry: String) {
        if let Some(journal) = &self.journal {
            journal.record(entry);
        }
    }
}

impl SettingsStore for MemorySettings {
    fn styles(&self) -> Result<Vec<Style>> {
        Ok(self.lock().styles.clone())
    }

    fn apply_styles(&self, styles: Vec<Style>) -> Result<usize> {
        let count = styles.len();
        let mut state = self.lock();
        for style in styles {
            match state.styles.iter_mut().find(|existing| existing.uuid == style.uuid) {
                Some(existing) => *existing = style,
                None => state.styles.push(style),
            }
        }
        drop(state);
        self.record(format!("styles:{count}"));
        Ok(count)
    }

    fn has_style(&self, uuid: &str) -> Result<bool> {
        Ok(self.lock().styles.iter().any(|style| style.uuid == uuid))
    }

    fn preferences(&self) -> Result<Bundle> {
        Ok(self.lock().preferences.clone())
    }

    fn apply_preferences(&self, preferences: Bundle) -> Result<usize> {
        let count = preferences.len();
        self.lock().preferences.extend(preferences);
        self.record(format!("preferences:{count}"));
        Ok(count)
    }

    fn last_full_backup(&self) -> Result<Option<OffsetDateTime>> {
        Ok(self.lock().last_full_backup)
    }

    fn set_last_full_backup(&self, at: OffsetDateTime) -> Result<()> {
        self.lock().last_full_backup = Some(at);
        Ok(())
    }
}
