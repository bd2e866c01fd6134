/// Errors raised by the indexer, the extractor and the language registry.
///
/// A requested member that does not exist in the file is not an error: it is
/// dropped silently, since requested names routinely come from model output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Parse failure at line {line}: {message}")]
    ParseFailure { line: usize, message: String },
}

impl ExtractError {
    pub fn parse_failure(line: usize, message: impl Into<String>) -> Self {
        Self::ParseFailure {
            line,
            message: message.into(),
        }
    }
}
