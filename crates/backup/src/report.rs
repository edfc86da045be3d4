//! Human-readable summaries of finished imports and exports.
//!
//! Rendered with [upon] templates. Both defaults can be replaced; the values
//! available to each are:
//!
//! | Variable                           | Import | Export | Description                          |
//! |------------------------------------|--------|--------|--------------------------------------|
//! | `books.{created,updated,skipped}`  | yes    |        | Book tallies                         |
//! | `covers.{created,updated,skipped}` | yes    |        | Cover tallies                        |
//! | `books`, `covers`                  |        | yes    | Number of books and covers written   |
//! | `skipped_covers`                   |        | yes    | Listed covers that were left out     |
//! | `styles`, `preferences`            | yes    | yes    | Totals                               |
//! | `has_styles`, `has_preferences`    | yes    | yes    | Whether either total is non-zero     |
//! | `failed_lines`                     | yes    |        | First N failed rows (`line`, `message`) |
//! | `has_more`, `more`                 | yes    |        | Whether and how many rows were elided |
//! | `database`                         |        | yes    | Whether the database file was copied |
//! | `cancelled`                        | yes    | yes    | Whether the operation was cut short  |

use crate::error::{ErrorKind, Result};
use crate::results::{Counts, ExportOutcome, ImportOutcome};
use exn::ResultExt;
use shelf_config::BackupConfig;
use upon::{Engine, Template, Value};

pub const DEFAULT_TEMPLATE_IMPORT: &str = "\
Books: {{ books.created }} created, {{ books.updated }} updated, {{ books.skipped }} skipped
Covers: {{ covers.created }} created, {{ covers.updated }} updated, {{ covers.skipped }} skipped
{% if has_styles -%}
Styles: {{ styles }}
{% endif -%}
{% if has_preferences -%}
Preferences: {{ preferences }}
{% endif -%}
{% for failed in failed_lines -%}
Line {{ failed.line }}: {{ failed.message }}
{% endfor -%}
{% if has_more -%}
... and {{ more }} more
{% endif -%}
{% if cancelled -%}
Cancelled before completion.
{% endif -%}
";

pub const DEFAULT_TEMPLATE_EXPORT: &str = "\
Books: {{ books }}
Covers: {{ covers }}
{% if has_skipped_covers -%}
Covers left out: {{ skipped_covers }}
{% endif -%}
{% if has_styles -%}
Styles: {{ styles }}
{% endif -%}
{% if has_preferences -%}
Preferences: {{ preferences }}
{% endif -%}
{% if database -%}
Database file included.
{% endif -%}
{% if cancelled -%}
Cancelled before completion.
{% endif -%}
";

pub struct ReportRenderer {
    engine: Engine<'static>,
    import: Template<'static>,
    export: Template<'static>,
    failed_lines: usize,
}

impl ReportRenderer {
    /// Default templates, listing at most `failed_lines` failed rows.
    pub fn new(failed_lines: usize) -> Result<Self> {
        Self::with_templates(DEFAULT_TEMPLATE_IMPORT, DEFAULT_TEMPLATE_EXPORT, failed_lines)
    }

    pub fn from_config(config: &BackupConfig) -> Result<Self> {
        Self::new(config.report_failed_lines)
    }

    /// Compiles both templates up front, so syntax errors surface here.
    pub fn with_templates(import: &str, export: &str, failed_lines: usize) -> Result<Self> {
        let engine = Engine::new();
        let import = engine.compile(import.to_string()).or_raise(|| ErrorKind::Report)?;
        let export = engine.compile(export.to_string()).or_raise(|| ErrorKind::Report)?;
        Ok(Self { engine, import, export, failed_lines })
    }

    pub fn import(&self, outcome: &ImportOutcome) -> Result<String> {
        let results = &outcome.results;
        let shown = results.failed_lines.iter().take(self.failed_lines);
        let failed_lines = shown
            .map(|failed| upon::value! { line: failed.line, message: failed.message.as_str() })
            .collect::<Vec<_>>();
        let more = results.failed_lines.len().saturating_sub(failed_lines.len()) as u64;
        let value = upon::value! {
            books: counts(&results.books),
            covers: counts(&results.covers),
            styles: results.styles,
            has_styles: results.styles > 0,
            preferences: results.preferences,
            has_preferences: results.preferences > 0,
            failed_lines: Value::List(failed_lines),
            has_more: more > 0,
            more: more,
            cancelled: outcome.cancelled,
        };
        self.render(&self.import, value)
    }

    pub fn export(&self, outcome: &ExportOutcome) -> Result<String> {
        let results = &outcome.results;
        let value = upon::value! {
            books: results.book_count(),
            covers: results.cover_count(),
            skipped_covers: results.skipped_covers.len() as u64,
            has_skipped_covers: !results.skipped_covers.is_empty(),
            styles: results.styles,
            has_styles: results.styles > 0,
            preferences: results.preferences,
            has_preferences: results.preferences > 0,
            database: results.database,
            cancelled: outcome.cancelled,
        };
        self.render(&self.export, value)
    }

    fn render(&self, template: &Template<'static>, value: Value) -> Result<String> {
        template.render(&self.engine, value).to_string().or_raise(|| ErrorKind::Report)
    }
}

fn counts(counts: &Counts) -> Value {
    upon::value! {
        processed: counts.processed,
        created: counts.created,
        updated: counts.updated,
        skipped: counts.skipped,
    }
}
