//! Destinations for accepted postings

use crate::error::Result;
use crate::processing::posting::Posting;
use log::{debug, info};
use std::fs;
use std::path::PathBuf;

pub trait ResultSink {
    /// Persist accepted postings in rank order; returns how many were written.
    fn write_all(&mut self, postings: &[Posting]) -> Result<usize>;
}

const FILE_PREFIX: &str = "job_offer_";

/// Writes one `job_offer_{i}.txt` per posting, `i` counting from 0.
/// Offers left over from a previous run are removed first.
pub struct DirectorySink {
    directory: PathBuf,
}

impl DirectorySink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn file_path(&self, index: usize) -> PathBuf {
        self.directory.join(format!("{}{}.txt", FILE_PREFIX, index))
    }

    /// Remove postings written by an earlier run. Other files are left alone.
    fn clear_previous(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            let is_offer = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(FILE_PREFIX) && name.ends_with(".txt"));
            if is_offer && path.is_file() {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl ResultSink for DirectorySink {
    fn write_all(&mut self, postings: &[Posting]) -> Result<usize> {
        fs::create_dir_all(&self.directory)?;
        let removed = self.clear_previous()?;
        if removed > 0 {
            debug!("Removed {} postings from a previous run", removed);
        }
        for (index, posting) in postings.iter().enumerate() {
            fs::write(self.file_path(index), posting.text())?;
        }
        info!(
            "Wrote {} postings to {}",
            postings.len(),
            self.directory.display()
        );
        Ok(postings.len())
    }
}

/// Writes all postings as one JSON array.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for JsonFileSink {
    fn write_all(&mut self, postings: &[Posting]) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(postings)?)?;
        Ok(postings.len())
    }
}

/// Keeps postings in memory.
#[derive(Default)]
pub struct MemorySink {
    pub postings: Vec<Posting>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn write_all(&mut self, postings: &[Posting]) -> Result<usize> {
        self.postings.extend_from_slice(postings);
        Ok(postings.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn accepted() -> Vec<Posting> {
        vec![
            Posting::new(9, "First match").with_company("Acme"),
            Posting::new(3, "Second match"),
        ]
    }

    #[test]
    fn test_directory_sink_names_files_in_order() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("filtered_jobs");
        let mut sink = DirectorySink::new(&target);

        let written = sink.write_all(&accepted()).unwrap();

        assert_eq!(written, 2);
        let first = fs::read_to_string(target.join("job_offer_0.txt")).unwrap();
        let second = fs::read_to_string(target.join("job_offer_1.txt")).unwrap();
        assert_eq!(first, "DESCRIPTION\nFirst match\n\nCOMPANY\nAcme");
        assert_eq!(second, "DESCRIPTION\nSecond match");
        assert!(!target.join("job_offer_2.txt").exists());
    }

    #[test]
    fn test_directory_sink_replaces_previous_run() {
        let dir = TempDir::new().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        fs::write(dir.path().join("notes.md"), "keep me").unwrap();

        let three = vec![
            Posting::new(1, "one"),
            Posting::new(2, "two"),
            Posting::new(3, "three"),
        ];
        assert_eq!(sink.write_all(&three).unwrap(), 3);
        assert_eq!(sink.write_all(&[Posting::new(4, "four")]).unwrap(), 1);

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["job_offer_0.txt", "notes.md"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("job_offer_0.txt")).unwrap(),
            "DESCRIPTION\nfour"
        );
    }

    #[test]
    fn test_directory_sink_empty() {
        let dir = TempDir::new().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out"));

        assert_eq!(sink.write_all(&[]).unwrap(), 0);
        assert!(dir.path().join("out").is_dir());
    }

    #[test]
    fn test_json_sink() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accepted.json");
        let mut sink = JsonFileSink::new(&path);

        sink.write_all(&accepted()).unwrap();

        let parsed: Vec<Posting> = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, accepted());
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.write_all(&accepted()).unwrap();
        assert_eq!(sink.postings.len(), 2);
        assert_eq!(sink.postings[0].id, 9);
    }
}
