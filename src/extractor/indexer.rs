use super::{IndexedNames, NameIndexer};
use crate::error::ExtractError;
use crate::parser::code_parser::JavaDeclarationParser;
use crate::parser::{DeclKind, SourceTree};

/// Qualified name indexer for Java sources
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaNameIndexer {
    parser: JavaDeclarationParser,
}

impl JavaNameIndexer {
    pub fn new() -> Self {
        Self {
            parser: JavaDeclarationParser::new(),
        }
    }
}

impl NameIndexer for JavaNameIndexer {
    fn index_names(&self, source: &str) -> Result<IndexedNames, ExtractError> {
        let tree = self.parser.parse(source)?;
        Ok(index_tree(&tree))
    }
}

/// Walk the declarations once and build qualified names
pub fn index_tree(tree: &SourceTree<'_>) -> IndexedNames {
    let mut builder = NameIndexBuilder::default();

    for decl in &tree.declarations {
        match decl.kind {
            DeclKind::Package => builder.enter_package(decl.name()),
            DeclKind::Class => {
                builder.enter_class(decl.name(), decl.span.start_line);
                for method in decl.method_names() {
                    builder.enter_method(method);
                }
            }
            DeclKind::Import | DeclKind::Method | DeclKind::Field | DeclKind::OtherMember => {}
        }
    }

    builder.finish()
}

/// Accumulates names for the class currently being walked
///
/// Only one class is tracked: entering a second top-level class replaces the
/// first one, so files are expected to hold a single top-level class.
#[derive(Debug, Default)]
struct NameIndexBuilder {
    package: String,
    class: Option<String>,
    methods: Vec<String>,
}

impl NameIndexBuilder {
    fn enter_package(&mut self, name: &str) {
        self.package = name.to_string();
    }

    fn enter_class(&mut self, name: &str, line: usize) {
        let qualified = format!("{}.{}", self.package, name);
        if let Some(previous) = self.class.replace(qualified) {
            tracing::debug!("Class {} replaced by the class declared at line {}", previous, line + 1);
        }
        self.methods.clear();
    }

    fn enter_method(&mut self, name: &str) {
        if let Some(class) = &self.class {
            self.methods.push(format!("{}#{}", class, name));
        }
    }

    fn finish(self) -> IndexedNames {
        match self.class {
            Some(class) if self.methods.is_empty() => IndexedNames {
                class_names_without_methods: vec![class],
                method_names: Vec::new(),
            },
            Some(_) => IndexedNames {
                class_names_without_methods: Vec::new(),
                method_names: self.methods,
            },
            None => IndexedNames::default(),
        }
    }
}
