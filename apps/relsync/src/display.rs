//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use relsync_ops::OperationResult;
use relsync_types::{ColorChoice, SyncDecision, SyncOutcome, SyncPlan};
use std::io;

use crate::error::CliError;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Whether styled output should be produced
    pub fn colors_enabled(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }

    /// Render operation result
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            self.render_json(result)
        } else {
            self.render_table(result)
        }
    }

    /// Render a final error in JSON mode
    ///
    /// Plain mode prints errors on stderr from `main`.
    pub fn render_error(&self, error: &CliError) -> io::Result<()> {
        if !self.json_output {
            return Ok(());
        }
        let value = serde_json::json!({
            "error": error.to_string(),
            "code": error.code(),
            "hint": error.hint(),
            "retryable": error.is_retryable(),
        });
        let json = serde_json::to_string_pretty(&value).map_err(io::Error::other)?;
        self.term.write_line(&json)
    }

    /// Render as JSON
    fn render_json(&self, result: &OperationResult) -> io::Result<()> {
        let json = result.to_json().map_err(io::Error::other)?;
        self.term.write_line(&json)
    }

    /// Render as formatted table
    fn render_table(&self, result: &OperationResult) -> io::Result<()> {
        match result {
            OperationResult::Sync(outcome) => self.render_outcome(outcome),
            OperationResult::Status(plan) => self.render_plan(plan),
        }
    }

    fn render_outcome(&self, outcome: &SyncOutcome) -> io::Result<()> {
        match outcome {
            SyncOutcome::UpToDate { target, asset } => {
                let line = format!("{target} is up to date ({})", asset.name);
                self.term.write_line(&self.style(&line, &Style::new().green()))
            }
            SyncOutcome::Updated {
                target,
                asset,
                previous_tag,
                bytes,
                duration_ms,
            } => {
                let line = format!("Updated {target} to {}", asset.name);
                self.term
                    .write_line(&self.style(&line, &Style::new().green().bold()))?;

                let mut table = self.table();
                table.add_row(vec![
                    Cell::new("Previous").add_attribute(Attribute::Bold),
                    Cell::new(previous_tag.as_deref().unwrap_or("-")),
                ]);
                table.add_row(vec![
                    Cell::new("Bytes").add_attribute(Attribute::Bold),
                    Cell::new(bytes),
                ]);
                table.add_row(vec![
                    Cell::new("Duration").add_attribute(Attribute::Bold),
                    Cell::new(format_duration(*duration_ms)),
                ]);
                self.term.write_line(&table.to_string())
            }
        }
    }

    fn render_plan(&self, plan: &SyncPlan) -> io::Result<()> {
        let mut table = self.table();
        table.set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        let asset = plan.asset.as_ref().map_or("-", |a| a.name.as_str());
        table.add_row(vec![Cell::new("Target"), Cell::new(&plan.target)]);
        table.add_row(vec![Cell::new("Platform"), Cell::new(&plan.platform)]);
        table.add_row(vec![Cell::new("Latest asset"), Cell::new(asset)]);
        table.add_row(vec![
            Cell::new("Cached tag"),
            Cell::new(plan.cached_tag.as_deref().unwrap_or("-")),
        ]);
        table.add_row(vec![Cell::new("Cache lookup"), Cell::new(&plan.cache_lookup)]);
        table.add_row(vec![Cell::new("Decision"), self.decision_cell(&plan.decision)]);
        if let Some(reason) = &plan.resolve_error {
            table.add_row(vec![Cell::new("Resolve error"), Cell::new(reason)]);
        }

        self.term.write_line(&table.to_string())
    }

    fn decision_cell(&self, decision: &SyncDecision) -> Cell {
        let (text, color) = match decision {
            SyncDecision::UpToDate => ("up to date", Color::Green),
            SyncDecision::Stale(_) => ("stale", Color::Yellow),
            SyncDecision::UnknownAsset => ("unknown asset", Color::Red),
        };
        let cell = Cell::new(text);
        if self.colors_enabled() {
            cell.fg(color)
        } else {
            cell
        }
    }

    fn table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if !self.colors_enabled() {
            table.force_no_tty();
        }
        table
    }

    fn style(&self, text: &str, style: &Style) -> String {
        if self.colors_enabled() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}

fn format_duration(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else {
        format!("{}.{:01}s", ms / 1_000, (ms % 1_000) / 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(250), "250ms");
        assert_eq!(format_duration(12_340), "12.3s");
    }
}
