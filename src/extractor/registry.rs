use super::indexer::JavaNameIndexer;
use super::members::JavaMemberExtractor;
use super::{MemberExtractor, NameIndexer};
use crate::error::ExtractError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Indexer and extractor registered for one language
#[derive(Clone)]
pub struct LanguageSupport {
    pub id: &'static str,
    pub extensions: &'static [&'static str],
    pub indexer: Arc<dyn NameIndexer>,
    pub extractor: Arc<dyn MemberExtractor>,
}

impl std::fmt::Debug for LanguageSupport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageSupport")
            .field("id", &self.id)
            .field("extensions", &self.extensions)
            .finish()
    }
}

/// Maps language identifiers and file extensions to their extractors
#[derive(Debug, Clone)]
pub struct ExtractorRegistry {
    languages: HashMap<String, LanguageSupport>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            languages: HashMap::new(),
        };

        registry.register(LanguageSupport {
            id: "java",
            extensions: &["java"],
            indexer: Arc::new(JavaNameIndexer::new()),
            extractor: Arc::new(JavaMemberExtractor::new()),
        });

        registry
    }

    pub fn register(&mut self, support: LanguageSupport) {
        self.languages.insert(support.id.to_string(), support);
    }

    /// Look up a language by identifier (case-insensitive)
    pub fn for_language(&self, id: &str) -> Result<&LanguageSupport, ExtractError> {
        self.languages
            .get(&id.to_ascii_lowercase())
            .ok_or_else(|| ExtractError::UnsupportedLanguage(id.to_string()))
    }

    /// Look up a language by file extension
    pub fn for_path(&self, path: &Path) -> Option<&LanguageSupport> {
        let extension = path.extension().and_then(|e| e.to_str())?;
        self.languages
            .values()
            .find(|support| support.extensions.iter().any(|e| *e == extension))
    }

    pub fn language_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
