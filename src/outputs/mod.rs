//! File outputs.
//!
//! - [`json`]: crawl run reports and article exports

pub mod json;
