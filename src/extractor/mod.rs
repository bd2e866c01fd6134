//! Source-element indexing and selective extraction.
//!
//! Both operations are pure functions of the file text: no I/O, no shared
//! state, safe to call from any number of workers at once.

pub mod indexer;
pub mod layout;
pub mod members;
pub mod registry;

use crate::error::ExtractError;
use serde::Serialize;

/// Qualified names found in one file
///
/// A class with methods contributes only its `package.Class#method` entries;
/// a class without methods contributes `package.Class`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexedNames {
    pub class_names_without_methods: Vec<String>,
    pub method_names: Vec<String>,
}

/// Builds qualified class and method names for a file
pub trait NameIndexer: Send + Sync {
    fn index_names(&self, source: &str) -> Result<IndexedNames, ExtractError>;
}

/// Rebuilds a file keeping only the requested methods and what they call
pub trait MemberExtractor: Send + Sync {
    fn extract_members(&self, source: &str, targets: &[&str]) -> Result<String, ExtractError>;
}
