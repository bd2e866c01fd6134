use std::path::PathBuf;

const DEFAULT_PROJECTS_DIR: &str = "./data/projects";
const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;
const DEFAULT_LANGUAGE: &str = "java";

/// Server configuration read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory project names are resolved under
    pub projects_dir: PathBuf,
    /// Files above this size are skipped while walking a project
    pub max_file_bytes: u64,
    /// Language used when a tool call does not name one
    pub default_language: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let projects_dir = lookup("PROJECTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECTS_DIR));

        let max_file_bytes = match lookup("MAX_FILE_BYTES") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "Invalid MAX_FILE_BYTES {:?}, using {}",
                    raw,
                    DEFAULT_MAX_FILE_BYTES
                );
                DEFAULT_MAX_FILE_BYTES
            }),
            None => DEFAULT_MAX_FILE_BYTES,
        };

        let default_language = lookup("DEFAULT_LANGUAGE")
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        Self {
            projects_dir,
            max_file_bytes,
            default_language,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
