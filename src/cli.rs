//! CLI interface for the job filter

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "job-filter")]
#[command(about = "Shortlist scraped job postings that fit a CV")]
#[command(long_about = "Rank job postings against a CV with BM25, drop the ones failing keyword rules, and let a local LLM confirm the rest")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match a CV against a set of postings
    Match {
        /// Path to CV file (PDF, TXT, MD)
        #[arg(short, long)]
        resume: PathBuf,

        /// Path to scraped postings (JSON, CSV)
        #[arg(short, long)]
        postings: PathBuf,

        /// LLM model to use
        #[arg(short, long)]
        llm: Option<String>,

        /// Number of top-ranked postings to evaluate
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Stop after this many accepted postings
        #[arg(long)]
        max_accepted: Option<usize>,

        /// Model calls in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Use this search query instead of deriving one from the CV
        #[arg(short, long)]
        query: Option<String>,

        /// Look up missing company sizes with the LLM before matching
        #[arg(long)]
        enrich_sizes: bool,

        /// Show every evaluated posting, not just accepted ones
        #[arg(short, long)]
        detailed: bool,

        /// Output format: console, json, markdown
        #[arg(short, long, default_value = "console")]
        output: String,

        /// Save the report to a file, or into a directory under a generated name
        #[arg(short, long)]
        save: Option<PathBuf>,

        /// Directory receiving the accepted postings
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Print the search query derived from a CV
    Query {
        /// Path to CV file (PDF, TXT, MD)
        #[arg(short, long)]
        resume: PathBuf,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file location
    Path,
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<crate::config::OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(crate::config::OutputFormat::Console),
        "json" => Ok(crate::config::OutputFormat::Json),
        "markdown" | "md" => Ok(crate::config::OutputFormat::Markdown),
        _ => Err(format!(
            "Invalid output format: {}. Supported: console, json, markdown",
            format
        )),
    }
}

/// Validate file extension
pub fn validate_file_extension(path: &Path, allowed_extensions: &[&str]) -> Result<(), String> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            if allowed_extensions.contains(&ext.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(format!(
                    "Unsupported file extension: .{}. Allowed: {}",
                    ext,
                    allowed_extensions.join(", ")
                ))
            }
        }
        None => Err("File has no extension".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    #[test]
    fn test_parse_output_format() {
        assert_eq!(parse_output_format("JSON"), Ok(OutputFormat::Json));
        assert_eq!(parse_output_format("md"), Ok(OutputFormat::Markdown));
        assert!(parse_output_format("html").is_err());
    }

    #[test]
    fn test_validate_file_extension() {
        assert!(validate_file_extension(Path::new("jobs.CSV"), &["json", "csv"]).is_ok());
        assert!(validate_file_extension(Path::new("jobs.xlsx"), &["json", "csv"]).is_err());
        assert!(validate_file_extension(Path::new("jobs"), &["json"]).is_err());
    }

    #[test]
    fn test_match_arguments() {
        let cli = Cli::parse_from([
            "job-filter",
            "match",
            "-r",
            "cv.pdf",
            "-p",
            "jobs.csv",
            "-k",
            "5",
            "--concurrency",
            "4",
            "--enrich-sizes",
        ]);

        match cli.command {
            Commands::Match {
                top_k,
                concurrency,
                enrich_sizes,
                output,
                ..
            } => {
                assert_eq!(top_k, Some(5));
                assert_eq!(concurrency, Some(4));
                assert!(enrich_sizes);
                assert_eq!(output, "console");
            }
            _ => panic!("expected match command"),
        }
    }
}
