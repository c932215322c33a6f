//! Pipeline driver.
//!
//! For each project key: fetch from the source, explode results into one row
//! per link, classify, filter, aggregate, and hand the result to the sink.
//! Keys are processed sequentially and share no state.

mod driver;
mod report;


pub use driver::{DependencyPipeline, ProjectTables};
pub use report::{BatchReport, ProjectReport, ProjectStatus};
