//! Input manager for profile documents and posting exports

use crate::error::{JobFilterError, Result};
use crate::input::file_detector::FileType;
use crate::input::postings::load_postings;
use crate::input::text_extractor::{MarkdownExtractor, PdfExtractor, PlainTextExtractor, TextExtractor};
use crate::processing::posting::{Posting, Profile};
use log::info;
use std::collections::HashMap;
use std::path::Path;

/// Loads inputs, caching extracted profile text by path.
pub struct InputManager {
    cache: HashMap<String, String>,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Read a candidate profile from a PDF, text or markdown file.
    pub async fn load_profile(&mut self, path: &Path) -> Result<Profile> {
        let text = self.extract_text(path).await?;
        if text.trim().is_empty() {
            return Err(JobFilterError::InvalidInput(format!(
                "Profile is empty: {}",
                path.display()
            )));
        }
        Ok(Profile::new(text))
    }

    /// Read postings from a JSON or CSV export.
    pub async fn load_postings(&self, path: &Path) -> Result<Vec<Posting>> {
        Self::ensure_exists(path)?;
        let postings = load_postings(path).await?;
        info!("Loaded {} postings from {}", postings.len(), path.display());
        Ok(postings)
    }

    pub async fn extract_text(&mut self, path: &Path) -> Result<String> {
        let path_str = path.to_string_lossy().to_string();

        if let Some(cached_text) = self.cache.get(&path_str) {
            info!("Using cached text for: {}", path.display());
            return Ok(cached_text.clone());
        }

        Self::ensure_exists(path)?;

        let file_type = FileType::from_path(path);
        if !file_type.is_profile_format() {
            return Err(JobFilterError::UnsupportedFormat(format!(
                "{:?} is not a profile format: {}",
                file_type,
                path.display()
            )));
        }

        let text = match file_type {
            FileType::Pdf => {
                info!("Extracting text from PDF: {}", path.display());
                PdfExtractor.extract(path).await?
            }
            FileType::Markdown => {
                info!("Processing markdown file: {}", path.display());
                MarkdownExtractor.extract(path).await?
            }
            _ => {
                info!("Reading plain text file: {}", path.display());
                PlainTextExtractor.extract(path).await?
            }
        };

        self.cache.insert(path_str, text.clone());

        Ok(text)
    }

    fn ensure_exists(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(JobFilterError::InvalidInput(format!(
                "File does not exist: {}",
                path.display()
            )));
        }
        Ok(())
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}
