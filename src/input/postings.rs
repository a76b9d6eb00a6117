//! Posting exports from the scraper, as a JSON array or CSV table

use crate::error::{JobFilterError, Result};
use crate::input::file_detector::FileType;
use crate::processing::posting::Posting;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

const ID_COLUMNS: [&str; 2] = ["id", "job_id"];
const EMPLOYEE_COLUMNS: [&str; 2] = ["company_num_employees", "company_employee_count"];

pub async fn load_postings(path: &Path) -> Result<Vec<Posting>> {
    let file_type = FileType::from_path(path);
    if !file_type.is_postings_format() {
        return Err(JobFilterError::UnsupportedFormat(format!(
            "{:?} is not a postings format: {}",
            file_type,
            path.display()
        )));
    }

    if file_type == FileType::Json {
        let content = tokio::fs::read_to_string(path).await?;
        parse_json(&content)
    } else {
        let bytes = tokio::fs::read(path).await?;
        parse_csv(bytes.as_slice())
    }
}

/// Parse a JSON array of flat objects.
pub fn parse_json(content: &str) -> Result<Vec<Posting>> {
    let rows: Vec<serde_json::Map<String, Value>> = serde_json::from_str(content)?;

    rows.into_iter()
        .enumerate()
        .map(|(position, row)| {
            let fields = row
                .into_iter()
                .filter_map(|(name, value)| {
                    let text = match value {
                        Value::Null => return None,
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    Some((name, text))
                })
                .collect();
            posting_from_fields(position, fields)
        })
        .collect()
}

/// Parse a CSV table with a header row.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Posting>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut postings = Vec::new();

    for (position, record) in csv_reader.records().enumerate() {
        let record = record?;
        let fields = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        postings.push(posting_from_fields(position, fields)?);
    }

    Ok(postings)
}

/// Build a posting from named columns. Rows without an id are numbered by
/// position starting at 1.
fn posting_from_fields(position: usize, mut fields: BTreeMap<String, String>) -> Result<Posting> {
    let id = match take_first(&mut fields, &ID_COLUMNS) {
        Some(raw) => parse_id(&raw)?,
        None => position as u64 + 1,
    };

    let description = fields
        .remove("description")
        .filter(|d| !d.trim().is_empty());
    let company = fields.remove("company").unwrap_or_default();
    let company_employee_count =
        take_first(&mut fields, &EMPLOYEE_COLUMNS).and_then(|raw| parse_count(&raw));

    Ok(Posting {
        id,
        description,
        company,
        company_employee_count,
        raw_fields: fields,
    })
}

fn take_first(fields: &mut BTreeMap<String, String>, names: &[&str]) -> Option<String> {
    let mut found = None;
    for name in names {
        if let Some(value) = fields.remove(*name) {
            found.get_or_insert(value);
        }
    }
    found
}

fn parse_id(raw: &str) -> Result<u64> {
    let trimmed = raw.trim();
    // pandas exports integer ids as floats
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    trimmed
        .parse()
        .map_err(|_| JobFilterError::InvalidInput(format!("Invalid posting id: {}", raw)))
}

fn parse_count(raw: &str) -> Option<u64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.strip_suffix(".0").unwrap_or(&cleaned);
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let content = r#"[
            {"id": 7, "title": "Data Scientist", "description": "Python", "company": "Acme", "company_num_employees": 5000},
            {"description": "", "company": "Beta", "location": "Berlin", "company_num_employees": null}
        ]"#;

        let postings = parse_json(content).unwrap();

        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].id, 7);
        assert_eq!(postings[0].company_employee_count, Some(5000));
        assert_eq!(postings[0].title(), Some("Data Scientist"));
        assert_eq!(postings[1].id, 2);
        assert_eq!(postings[1].description, None);
        assert_eq!(postings[1].company_employee_count, None);
        assert_eq!(postings[1].raw_fields.get("location").map(String::as_str), Some("Berlin"));
    }

    #[test]
    fn test_parse_csv() {
        let content = "job_id,title,company,description,company_num_employees\n\
                       11, ML Engineer ,Acme,\"Remote, full-time role\",\"1,200\"\n\
                       12,Analyst,Beta,,\n";

        let postings = parse_csv(content.as_bytes()).unwrap();

        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].id, 11);
        assert_eq!(postings[0].title(), Some("ML Engineer"));
        assert_eq!(postings[0].description.as_deref(), Some("Remote, full-time role"));
        assert_eq!(postings[0].company_employee_count, Some(1200));
        assert_eq!(postings[1].description, None);
        assert_eq!(postings[1].company_employee_count, None);
    }

    #[test]
    fn test_float_ids_and_counts() {
        let postings = parse_csv("id,description,company_num_employees\n3.0,x,250.0\n".as_bytes()).unwrap();
        assert_eq!(postings[0].id, 3);
        assert_eq!(postings[0].company_employee_count, Some(250));
    }

    #[test]
    fn test_invalid_id_is_rejected() {
        let result = parse_json(r#"[{"id": "abc", "description": "x"}]"#);
        assert!(matches!(result, Err(JobFilterError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_load_rejects_other_formats() {
        let result = load_postings(Path::new("jobs.xlsx")).await;
        assert!(matches!(result, Err(JobFilterError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_not_an_array() {
        assert!(parse_json(r#"{"id": 1}"#).is_err());
    }
}
