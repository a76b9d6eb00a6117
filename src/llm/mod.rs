//! LLM integration module

pub mod client;
pub mod company_size;
pub mod judge;
pub mod mock;
pub mod prompts;
