//! Output formatters for match reports

use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::report::{MatchReport, PostingEntry};
use crate::pipeline::PostingState;
use colored::{Color, Colorize};
use std::path::Path;

/// Trait for rendering match reports
pub trait OutputFormatter {
    fn format_report(&self, report: &MatchReport) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Console formatter with colors
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

/// JSON formatter for scripting
pub struct JsonFormatter {
    pretty: bool,
}

pub struct MarkdownFormatter {
    include_metadata: bool,
}

/// Picks a formatter for the requested output format
pub struct ReportGenerator {
    console_formatter: ConsoleFormatter,
    json_formatter: JsonFormatter,
    markdown_formatter: MarkdownFormatter,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self { use_colors, detailed }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let prefix = match level {
            1 => "█",
            2 => "▓",
            _ => "▒",
        };

        let color = match level {
            1 => Color::Blue,
            2 => Color::Green,
            _ => Color::Yellow,
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn format_state_badge(&self, state: PostingState) -> String {
        let (badge, color) = match state {
            PostingState::LlmAccepted => ("ACCEPTED", Color::Green),
            PostingState::LlmRejected => ("MODEL REJECTED", Color::Yellow),
            PostingState::RuleRejected => ("RULE REJECTED", Color::Red),
            PostingState::RuleAccepted | PostingState::Pending => ("PENDING", Color::White),
        };

        if self.use_colors {
            format!("[{}]", badge.color(color).bold())
        } else {
            format!("[{}]", badge)
        }
    }

    fn format_reasons(&self, entry: &PostingEntry) -> String {
        let mut lines = String::new();
        if !entry.failed_rules.is_empty() {
            lines.push_str(&format!("      rules failed: {}\n", entry.failed_rules.join(", ")));
        }
        if !entry.rejected_attributes.is_empty() {
            lines.push_str(&format!("      model said no: {}\n", entry.rejected_attributes.join(", ")));
        }
        if !entry.unknown_attributes.is_empty() {
            lines.push_str(&format!("      model unsure: {}\n", entry.unknown_attributes.join(", ")));
        }
        if let Some(failure) = &entry.failure {
            lines.push_str(&format!("      {}\n", self.colorize(failure, Color::Red)));
        }
        lines
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &MatchReport) -> Result<String> {
        let mut output = String::new();
        let summary = &report.summary;

        output.push_str(&self.format_header("JOB MATCH RESULTS", 1));
        output.push_str(&format!(
            "Generated: {} | Processing time: {}ms | Model: {}\n",
            report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            report.metadata.processing_time_ms,
            report.metadata.model_used
        ));
        output.push_str(&format!(
            "Query: {}\n",
            self.colorize(&report.metadata.query, Color::Cyan)
        ));

        output.push_str(&self.format_header("Summary", 2));
        output.push_str(&format!(
            "Postings: {} loaded, {} ranked\n",
            summary.total_postings, summary.ranked
        ));
        output.push_str(&format!(
            "Rejected: {} by rules, {} of {} by the model\n",
            summary.rule_rejected, summary.llm_rejected, summary.judged
        ));
        if summary.degraded > 0 {
            output.push_str(&format!(
                "{}\n",
                self.colorize(
                    &format!("{} model verdicts could not be read", summary.degraded),
                    Color::Yellow
                )
            ));
        }
        output.push_str(&format!(
            "Accepted: {}\n",
            self.colorize(&summary.accepted.to_string(), Color::Green)
        ));
        if summary.stopped_early {
            output.push_str("Stopped before every ranked posting was evaluated\n");
        }

        output.push_str(&self.format_header("Accepted Postings", 2));
        let mut any = false;
        for entry in report.accepted_entries() {
            any = true;
            output.push_str(&format!("  {:>3}. {}\n", entry.rank, entry.label));
        }
        if !any {
            output.push_str("  No postings matched the profile\n");
        }

        if self.detailed {
            output.push_str(&self.format_header("All Evaluated Postings", 3));
            for entry in &report.entries {
                output.push_str(&format!(
                    "  {:>3}. {} {}\n",
                    entry.rank,
                    self.format_state_badge(entry.state),
                    entry.label
                ));
                output.push_str(&self.format_reasons(entry));
            }
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &MatchReport) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(report)?)
        } else {
            Ok(serde_json::to_string(report)?)
        }
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl MarkdownFormatter {
    pub fn new(include_metadata: bool) -> Self {
        Self { include_metadata }
    }

    fn state_label(state: PostingState) -> &'static str {
        match state {
            PostingState::LlmAccepted => "✅ accepted",
            PostingState::LlmRejected => "🤖 model rejected",
            PostingState::RuleRejected => "❌ rule rejected",
            PostingState::RuleAccepted | PostingState::Pending => "⏳ pending",
        }
    }

    fn reasons(entry: &PostingEntry) -> String {
        let mut parts = Vec::new();
        if !entry.failed_rules.is_empty() {
            parts.push(format!("rules: {}", entry.failed_rules.join(", ")));
        }
        if !entry.rejected_attributes.is_empty() {
            parts.push(format!("false: {}", entry.rejected_attributes.join(", ")));
        }
        if let Some(failure) = &entry.failure {
            parts.push(failure.clone());
        } else if !entry.unknown_attributes.is_empty() {
            parts.push(format!("unknown: {}", entry.unknown_attributes.join(", ")));
        }
        parts.join("; ")
    }
}

impl OutputFormatter for MarkdownFormatter {
    fn format_report(&self, report: &MatchReport) -> Result<String> {
        let mut output = String::new();
        let summary = &report.summary;

        output.push_str("# Job Match Results\n\n");

        if self.include_metadata {
            output.push_str(&format!(
                "**Generated:** {} | **Processing Time:** {}ms | **Model:** `{}`\n",
                report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
                report.metadata.processing_time_ms,
                report.metadata.model_used
            ));
            output.push_str(&format!(
                "**Profile:** `{}` | **Postings:** `{}`\n\n",
                file_name(&report.metadata.profile_file),
                file_name(&report.metadata.postings_file)
            ));
        }

        output.push_str(&format!("**Query:** {}\n\n", report.metadata.query));

        output.push_str("## Summary\n\n");
        output.push_str("| Stage | Count |\n");
        output.push_str("|-------|-------|\n");
        output.push_str(&format!("| Loaded | {} |\n", summary.total_postings));
        output.push_str(&format!("| Ranked | {} |\n", summary.ranked));
        output.push_str(&format!("| Rule rejected | {} |\n", summary.rule_rejected));
        output.push_str(&format!("| Judged by model | {} |\n", summary.judged));
        output.push_str(&format!("| Model rejected | {} |\n", summary.llm_rejected));
        output.push_str(&format!("| Accepted | {} |\n\n", summary.accepted));

        output.push_str("## Postings\n\n");
        if report.entries.is_empty() {
            output.push_str("_No postings were evaluated._\n");
        } else {
            output.push_str("| Rank | Posting | Outcome | Reasons |\n");
            output.push_str("|------|---------|---------|---------|\n");
            for entry in &report.entries {
                output.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    entry.rank,
                    entry.label.replace('|', "\\|"),
                    Self::state_label(entry.state),
                    Self::reasons(entry).replace('|', "\\|")
                ));
            }
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(true, false),
            json_formatter: JsonFormatter::new(true),
            markdown_formatter: MarkdownFormatter::new(true),
        }
    }

    pub fn with_options(use_colors: bool, detailed: bool, pretty_json: bool, include_metadata: bool) -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(use_colors, detailed),
            json_formatter: JsonFormatter::new(pretty_json),
            markdown_formatter: MarkdownFormatter::new(include_metadata),
        }
    }

    pub fn generate_report(&self, report: &MatchReport, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Console => self.console_formatter.format_report(report),
            OutputFormat::Json => self.json_formatter.format_report(report),
            OutputFormat::Markdown => self.markdown_formatter.format_report(report),
        }
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    use std::fs;
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(file_path, content)?;
    Ok(())
}

pub fn suggest_filename(format: &OutputFormat, profile_name: &str, timestamp: bool) -> String {
    let base_name = Path::new(profile_name)
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();

    let timestamp_suffix = if timestamp {
        format!("_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
    } else {
        String::new()
    };

    match format {
        OutputFormat::Console => format!("{}_matches{}.txt", base_name, timestamp_suffix),
        OutputFormat::Json => format!("{}_matches{}.json", base_name, timestamp_suffix),
        OutputFormat::Markdown => format!("{}_matches{}.md", base_name, timestamp_suffix),
    }
}
