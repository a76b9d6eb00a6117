//! Prompt templates for posting judgments, query extraction and company size

use crate::processing::verdict::Check;

pub const SYSTEM_PROMPT: &str = "You are a helpful, respectful and honest assistant.";

#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub posting_match: String,
    pub search_query: String,
    pub company_size: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            posting_match: POSTING_MATCH_TEMPLATE.to_string(),
            search_query: SEARCH_QUERY_TEMPLATE.to_string(),
            company_size: COMPANY_SIZE_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Structured-extraction request for one posting. Both documents are
    /// embedded verbatim.
    pub fn render_posting_match(&self, cv: &str, posting_text: &str) -> String {
        self.posting_match
            .replace("{schema}", &schema_example())
            .replace("{cv}", cv)
            .replace("{job}", posting_text)
    }

    pub fn render_search_query(&self, cv: &str, max_terms: usize) -> String {
        self.search_query
            .replace("{max_terms}", &max_terms.to_string())
            .replace("{cv}", cv)
    }

    pub fn render_company_size(&self, company: &str) -> String {
        self.company_size.replace("{company}", company)
    }
}

/// JSON object listing every attribute check with a null value.
fn schema_example() -> String {
    let fields: Vec<String> = Check::ATTRIBUTES
        .iter()
        .map(|check| format!("    \"{}\": null", check.name()))
        .collect();
    format!("{{\n{}\n}}", fields.join(",\n"))
}

const POSTING_MATCH_TEMPLATE: &str = r#"Curriculum vitae:

<text-begin>
{cv}
<text-end>

Job Offer:

<text-begin>
{job}
<text-end>

The following list are job offer conditions, check each condition if it is True or False. If a condition is unclear or not specified consider it as None.
Job offer conditions:
- "junior_mid": check if the job offer's role is a junior or mid-level role and not an advanced senior role.
- "english_text": check if the description is written in english.
- "company_established": check if the job offer's company is an established company (not a startup).
- "full_time": check if the job is a full-time job or has the option to work full-time.
- "remote": check if the job is truly fully remote without specifications regarding office returns.
- "company_size": check if the job offer's company has more than 100 employees.
- "permanent_position": check if the job is a normal job and not an internship.
Moreover, check if the curriculum vitae role ambitions match with the job offer role and report it as "match". Answer true or false or null.

Don't explain details, write output as a json file.
Output example:

{schema}"#;

const SEARCH_QUERY_TEMPLATE: &str = "Extract a search query from the CV to find the best suited job, use few keywords ({max_terms} maximum). Just write the query without comments. The CV:\n{cv}";

const COMPANY_SIZE_TEMPLATE: &str = "How many employees does the company \"{company}\" have?\nExtract the number of employees (only one) and if it is known write it in the standard numeric format otherwise write None. Do not add comments.";
