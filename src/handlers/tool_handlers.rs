use crate::config::Config;
use crate::extractor::registry::{ExtractorRegistry, LanguageSupport};
use crate::mcp::types::Content;
use crate::project::{self, ProjectIndex};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;

/// Tool handlers for MCP server
pub struct ToolHandlers {
    registry: ExtractorRegistry,
    config: Config,
}

impl ToolHandlers {
    pub fn new(registry: ExtractorRegistry, config: Config) -> Self {
        Self { registry, config }
    }

    /// Handle index_names tool
    pub async fn handle_index_names(&self, args: &Value) -> Result<Vec<Content>> {
        let source = required_str(args, "source")?;
        let support = self.language(args)?;

        let names = support.indexer.index_names(source)?;

        Ok(vec![Content::Text {
            text: serde_json::to_string_pretty(&names)?,
        }])
    }

    /// Handle extract_members tool
    pub async fn handle_extract_members(&self, args: &Value) -> Result<Vec<Content>> {
        let source = required_str(args, "source")?;
        let methods = string_list(args, "methods")?;
        let support = self.language(args)?;

        let targets: Vec<&str> = methods.iter().map(String::as_str).collect();
        let code = support.extractor.extract_members(source, &targets)?;

        Ok(vec![Content::Text { text: code }])
    }

    /// Handle index_project tool
    pub async fn handle_index_project(&self, args: &Value) -> Result<Vec<Content>> {
        let root = self.project_dir(args)?;
        let index = self.index(&root).await?;

        Ok(vec![Content::Text {
            text: serde_json::to_string_pretty(&index)?,
        }])
    }

    /// Handle read_project tool
    pub async fn handle_read_project(&self, args: &Value) -> Result<Vec<Content>> {
        let root = self.project_dir(args)?;
        let files = project::read_directory(&root, self.config.max_file_bytes).await?;

        if files.is_empty() {
            return Ok(vec![Content::Text {
                text: "No files found.".to_string(),
            }]);
        }

        Ok(vec![Content::Text {
            text: project::code_set_to_markdown(&files),
        }])
    }

    /// Handle build_snippets tool
    pub async fn handle_build_snippets(&self, args: &Value) -> Result<Vec<Content>> {
        let root = self.project_dir(args)?;
        let classes = string_list(args, "classes")?;
        let methods = string_list(args, "methods")?;

        let index = self.index(&root).await?;
        let selection = index.group_by_file(&classes, &methods);
        let snippets = project::build_snippets(&selection, &self.registry).await;

        if snippets.is_empty() {
            return Ok(vec![Content::Text {
                text: "No matching classes or methods found.".to_string(),
            }]);
        }

        Ok(vec![Content::Text {
            text: project::code_set_to_markdown(&snippets),
        }])
    }

    async fn index(&self, root: &std::path::Path) -> Result<ProjectIndex> {
        project::index_project(root, &self.registry, self.config.max_file_bytes).await
    }

    fn language(&self, args: &Value) -> Result<&LanguageSupport> {
        let id = args
            .get("language")
            .and_then(|v| v.as_str())
            .unwrap_or(self.config.default_language.as_str());
        Ok(self.registry.for_language(id)?)
    }

    fn project_dir(&self, args: &Value) -> Result<PathBuf> {
        let name = required_str(args, "project")?;
        Ok(project::resolve_project_dir(&self.config.projects_dir, name))
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .with_context(|| format!("Missing '{}' argument", key))
}

/// Optional list of strings; absent means empty
fn string_list(args: &Value, key: &str) -> Result<Vec<String>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .with_context(|| format!("'{}' must be an array of strings", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const SOURCE: &str = "package a;\n\nclass B {\n  void keep() {}\n\n  void drop() {}\n}\n";

    fn handlers(projects_dir: PathBuf) -> ToolHandlers {
        let config = Config {
            projects_dir,
            ..Config::default()
        };
        ToolHandlers::new(ExtractorRegistry::new(), config)
    }

    fn text(content: &[Content]) -> &str {
        match &content[0] {
            Content::Text { text } => text,
        }
    }

    #[tokio::test]
    async fn test_index_names_tool() {
        let handlers = handlers(PathBuf::from("."));
        let content = handlers
            .handle_index_names(&json!({ "source": SOURCE }))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(text(&content)).unwrap();
        assert_eq!(value["method_names"], json!(["a.B#keep", "a.B#drop"]));
        assert_eq!(value["class_names_without_methods"], json!([]));
    }

    #[tokio::test]
    async fn test_extract_members_tool() {
        let handlers = handlers(PathBuf::from("."));
        let content = handlers
            .handle_extract_members(&json!({ "source": SOURCE, "methods": ["keep"], "language": "java" }))
            .await
            .unwrap();
        assert_eq!(text(&content), "package a;\n\nclass B {\n  void keep() {}\n}\n");
    }

    #[tokio::test]
    async fn test_unsupported_language_is_an_error() {
        let handlers = handlers(PathBuf::from("."));
        let err = handlers
            .handle_extract_members(&json!({ "source": SOURCE, "language": "python" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported language"), "{}", err);
    }

    #[tokio::test]
    async fn test_missing_argument_is_an_error() {
        let handlers = handlers(PathBuf::from("."));
        let err = handlers.handle_index_names(&json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing 'source' argument");
    }

    #[tokio::test]
    async fn test_build_snippets_tool() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("demo-app");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("B.java"), SOURCE).unwrap();

        let handlers = handlers(dir.path().to_path_buf());
        let content = handlers
            .handle_build_snippets(&json!({ "project": "Demo App", "methods": ["a.B#drop", "a.B#ghost"] }))
            .await
            .unwrap();

        let expected = format!(
            "### {}:\n\n```\npackage a;\n\nclass B {{\n\n  void drop() {{}}\n}}\n\n```\n\n---\n\n",
            root.join("B.java").display()
        );
        assert_eq!(text(&content), expected);
    }

    #[tokio::test]
    async fn test_index_project_tool() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("demo");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("B.java"), SOURCE).unwrap();

        let handlers = handlers(dir.path().to_path_buf());
        let content = handlers
            .handle_index_project(&json!({ "project": "demo" }))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(text(&content)).unwrap();
        assert_eq!(
            value["methods"]["a.B#keep"],
            json!(root.join("B.java").to_string_lossy())
        );
    }
}
