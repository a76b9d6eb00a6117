//! Input processing module
//! Reads the candidate profile and the scraped postings

pub mod file_detector;
pub mod manager;
pub mod postings;
pub mod text_extractor;

pub use manager::InputManager;
