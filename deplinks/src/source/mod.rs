//! Search sources and authentication.
//!
//! This module provides:
//! - The `SearchSource` and `Authenticator` protocol traits
//! - An in-memory source for tests and embedding
//! - A source reading exported JSON results
//! - A Bitbucket Server code search source (feature `bitbucket`)

#[cfg(feature = "bitbucket")]
mod bitbucket;
mod json_file;
mod memory;
mod protocols;

#[cfg(feature = "bitbucket")]
pub use bitbucket::{
    clean_hit_text, format_commit_time, split_file_path, BitbucketSource, COMMIT_TIME_FORMAT,
};
pub use json_file::JsonFileSource;
pub use memory::InMemorySource;
pub use protocols::{
    AnonymousAuthenticator, Authenticator, BasicAuthenticator, SearchSource, Session,
};
