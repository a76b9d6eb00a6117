//! Job postings and the candidate profile

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One scraped job advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub id: u64,
    pub description: Option<String>,
    pub company: String,
    pub company_employee_count: Option<u64>,
    /// Remaining scraped columns, keyed by column name.
    #[serde(default)]
    pub raw_fields: BTreeMap<String, String>,
}

impl Posting {
    pub fn new(id: u64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: Some(description.into()),
            company: String::new(),
            company_employee_count: None,
            raw_fields: BTreeMap::new(),
        }
    }

    pub fn without_description(id: u64) -> Self {
        Self {
            id,
            description: None,
            company: String::new(),
            company_employee_count: None,
            raw_fields: BTreeMap::new(),
        }
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    pub fn with_employee_count(mut self, count: u64) -> Self {
        self.company_employee_count = Some(count);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.raw_fields.insert(name.into(), value.into());
        self
    }

    /// Description if present and not blank.
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.raw_fields.get("title").map(|t| t.as_str())
    }

    /// Render the posting as one document: an upper-cased field name line
    /// followed by its value, blocks separated by a blank line.
    pub fn text(&self) -> String {
        let mut blocks = Vec::new();

        if let Some(description) = &self.description {
            blocks.push(format!("DESCRIPTION\n{}", description));
        }
        if !self.company.is_empty() {
            blocks.push(format!("COMPANY\n{}", self.company));
        }
        if let Some(count) = self.company_employee_count {
            blocks.push(format!("COMPANY_NUM_EMPLOYEES\n{}", count));
        }
        for (name, value) in &self.raw_fields {
            blocks.push(format!("{}\n{}", name.to_uppercase(), value));
        }

        blocks.join("\n\n")
    }
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.title(), self.company.is_empty()) {
            (Some(title), false) => write!(f, "#{} {} at {}", self.id, title, self.company),
            (Some(title), true) => write!(f, "#{} {}", self.id, title),
            (None, false) => write!(f, "#{} ({})", self.id, self.company),
            (None, true) => write!(f, "#{}", self.id),
        }
    }
}

/// The candidate document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub raw_text: String,
}

impl Profile {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_rendering_order() {
        let posting = Posting::new(1, "Build pipelines")
            .with_company("Acme")
            .with_employee_count(250)
            .with_field("title", "Data Engineer");

        let text = posting.text();
        assert_eq!(
            text,
            "DESCRIPTION\nBuild pipelines\n\nCOMPANY\nAcme\n\nCOMPANY_NUM_EMPLOYEES\n250\n\nTITLE\nData Engineer"
        );
    }

    #[test]
    fn test_blank_description_is_absent() {
        let posting = Posting::new(2, "   \n");
        assert!(posting.description_text().is_none());
        assert!(Posting::without_description(3).description_text().is_none());
    }

    #[test]
    fn test_display() {
        let posting = Posting::new(7, "x")
            .with_company("Acme")
            .with_field("title", "ML Engineer");
        assert_eq!(posting.to_string(), "#7 ML Engineer at Acme");
    }
}
