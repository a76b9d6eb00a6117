//! Reports, formatters and result sinks

pub mod formatter;
pub mod report;
pub mod sink;
