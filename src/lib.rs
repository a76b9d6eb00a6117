//! Job filter library
//!
//! Ranks scraped job postings against a candidate profile, applies
//! keyword rules and asks a language model to confirm the rest.

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod processing;

pub use config::Config;
pub use error::{JobFilterError, Result};
pub use pipeline::{MatchPipeline, MatchRun, PipelineConfig};
pub use processing::posting::{Posting, Profile};
