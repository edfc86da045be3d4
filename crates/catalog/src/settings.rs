use crate::error::Result;
use shelf_record::models::{Bundle, Style};
use time::OffsetDateTime;

/// Book-list styles and application preferences, as seen by archives.
pub trait SettingsStore: Send + Sync {
    /// User-defined styles, for export.
    fn styles(&self) -> Result<Vec<Style>>;

    /// Apply imported styles, returning how many were applied.
    fn apply_styles(&self, styles: Vec<Style>) -> Result<usize>;

    /// Whether a style with this UUID is known locally.
    fn has_style(&self, uuid: &str) -> Result<bool>;

    /// All preferences as one flat bundle, for export.
    fn preferences(&self) -> Result<Bundle>;

    /// Apply imported preferences, returning how many were applied.
    fn apply_preferences(&self, preferences: Bundle) -> Result<usize>;

    /// When the last full (non-incremental) backup completed.
    fn last_full_backup(&self) -> Result<Option<OffsetDateTime>>;

    fn set_last_full_backup(&self, at: OffsetDateTime) -> Result<()>;
}
