use crate::extractor::registry::ExtractorRegistry;
use crate::extractor::IndexedNames;
use anyhow::Result;
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A file of a project together with its text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub code: String,
}

/// Qualified names of a whole project mapped to the file declaring them
///
/// When two files declare the same name, the one walked last wins. Walk order
/// follows the filesystem, so collisions are counted rather than resolved.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectIndex {
    pub classes: BTreeMap<String, PathBuf>,
    pub methods: BTreeMap<String, PathBuf>,
    #[serde(skip)]
    pub collisions: usize,
    #[serde(skip)]
    pub failed_files: usize,
}

/// Names picked from a [`ProjectIndex`], grouped by file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub classes: BTreeMap<PathBuf, Vec<String>>,
    pub methods: BTreeMap<PathBuf, Vec<String>>,
}

impl ProjectIndex {
    pub fn insert_file(&mut self, path: &Path, names: IndexedNames) {
        for name in names.class_names_without_methods {
            if insert_name(&mut self.classes, name, path) {
                self.collisions += 1;
            }
        }
        for name in names.method_names {
            if insert_name(&mut self.methods, name, path) {
                self.collisions += 1;
            }
        }
    }

    /// Group selected names by the file declaring them
    ///
    /// Names missing from the index are dropped.
    pub fn group_by_file(&self, class_names: &[String], method_names: &[String]) -> Selection {
        Selection {
            classes: group(&self.classes, class_names),
            methods: group(&self.methods, method_names),
        }
    }
}

fn insert_name(map: &mut BTreeMap<String, PathBuf>, name: String, path: &Path) -> bool {
    match map.insert(name.clone(), path.to_path_buf()) {
        Some(previous) if previous != path => {
            tracing::debug!(
                "{} declared in both {} and {}, keeping the latter",
                name,
                previous.display(),
                path.display()
            );
            true
        }
        _ => false,
    }
}

fn group(index: &BTreeMap<String, PathBuf>, names: &[String]) -> BTreeMap<PathBuf, Vec<String>> {
    let mut grouped: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
    for name in names {
        match index.get(name) {
            Some(path) => grouped.entry(path.clone()).or_default().push(name.clone()),
            None => tracing::warn!("Unknown name {}, skipping", name),
        }
    }
    grouped
}

/// Directory of a project: lower-cased, spaces replaced by dashes
pub fn resolve_project_dir(projects_dir: &Path, project_name: &str) -> PathBuf {
    projects_dir.join(project_name.to_lowercase().replace(' ', "-"))
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }
    if !path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", path.display());
    }
    Ok(())
}

fn walk_files(root: &Path, max_file_bytes: u64) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(root)
        .standard_filters(true)
        .hidden(true) // Skip hidden files
        .build();

    let mut files = Vec::new();
    for entry in walker.flatten() {
        if entry.file_type().map_or(true, |ft| !ft.is_file()) {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            if metadata.len() > max_file_bytes {
                tracing::warn!(
                    "Skipping {:?}: {} bytes exceeds limit of {}",
                    entry.path(),
                    metadata.len(),
                    max_file_bytes
                );
                continue;
            }
        }
        files.push(entry.into_path());
    }
    files
}

/// Read every text file of a project
pub async fn read_directory(root: &Path, max_file_bytes: u64) -> Result<Vec<SourceFile>> {
    ensure_dir(root)?;

    let mut files = Vec::new();
    for path in walk_files(root, max_file_bytes) {
        let code = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(_) => continue, // Skip binary files
        };
        files.push(SourceFile { path, code });
    }
    Ok(files)
}

/// Render files as markdown sections, one fenced block per file
pub fn code_set_to_markdown(files: &[SourceFile]) -> String {
    let mut markdown = String::new();
    for file in files {
        markdown.push_str(&format!("### {}:\n\n", file.path.display()));
        markdown.push_str(&format!("```\n{}\n```\n\n", file.code));
        markdown.push_str("---\n\n");
    }
    markdown
}

/// Index every file of a project that a registered language handles
///
/// Files that fail to read or parse are logged and skipped.
pub async fn index_project(
    root: &Path,
    registry: &ExtractorRegistry,
    max_file_bytes: u64,
) -> Result<ProjectIndex> {
    ensure_dir(root)?;
    tracing::info!("Indexing project at: {}", root.display());

    let mut index = ProjectIndex::default();
    for path in walk_files(root, max_file_bytes) {
        let support = match registry.for_path(&path) {
            Some(s) => s,
            None => continue,
        };

        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                continue;
            }
        };

        match support.indexer.index_names(&content) {
            Ok(names) => index.insert_file(&path, names),
            Err(e) => {
                tracing::warn!("Failed to index {:?}: {}", path, e);
                index.failed_files += 1;
            }
        }
    }

    tracing::info!(
        "Indexed {} classes and {} methods ({} collisions, {} failed files)",
        index.classes.len(),
        index.methods.len(),
        index.collisions,
        index.failed_files
    );
    Ok(index)
}

/// Build one reduced snippet per selected file
///
/// Files with selected methods are pruned to those methods; files selected
/// only through a class name are returned whole.
pub async fn build_snippets(selection: &Selection, registry: &ExtractorRegistry) -> Vec<SourceFile> {
    let mut snippets: BTreeMap<PathBuf, SourceFile> = BTreeMap::new();

    for (path, names) in &selection.methods {
        let support = match registry.for_path(path) {
            Some(s) => s,
            None => {
                tracing::warn!("No extractor for {:?}, skipping", path);
                continue;
            }
        };
        let content = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                continue;
            }
        };

        let targets: Vec<&str> = names.iter().map(|n| simple_method_name(n)).collect();
        match support.extractor.extract_members(&content, &targets) {
            Ok(code) => {
                snippets.insert(path.clone(), SourceFile { path: path.clone(), code });
            }
            Err(e) => tracing::warn!("Failed to extract from {:?}: {}", path, e),
        }
    }

    for path in selection.classes.keys() {
        if snippets.contains_key(path) {
            continue;
        }
        match fs::read_to_string(path).await {
            Ok(code) => {
                snippets.insert(path.clone(), SourceFile { path: path.clone(), code });
            }
            Err(e) => tracing::warn!("Failed to read {:?}: {}", path, e),
        }
    }

    snippets.into_values().collect()
}

/// `pkg.Class#method` -> `method`
fn simple_method_name(qualified: &str) -> &str {
    qualified
        .rsplit_once('#')
        .map_or(qualified, |(_, method)| method)
}
