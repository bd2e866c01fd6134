use super::{ClassBody, DeclKind, Declaration, Invocation, SourceTree, Span};
use crate::error::ExtractError;
use tree_sitter::{Node, Parser};

/// Declaration parser for Java sources using tree-sitter
///
/// Produces the package, import and top-level class declarations of a file.
/// Nested types are kept as opaque class-body members.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaDeclarationParser;

impl JavaDeclarationParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse source text into declaration nodes
    ///
    /// Any syntax error in the file is reported as a parse failure carrying
    /// the 1-based line of the first error.
    pub fn parse<'s>(&self, source: &'s str) -> Result<SourceTree<'s>, ExtractError> {
        let mut parser = Parser::new();
        parser
            .set_language(tree_sitter_java::language())
            .map_err(|e| ExtractError::parse_failure(0, format!("Failed to set language: {}", e)))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ExtractError::parse_failure(0, "Failed to parse code"))?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_line(root);
            return Err(ExtractError::parse_failure(line, "syntax error"));
        }

        let declarations = root
            .children(&mut root.walk())
            .filter_map(|node| top_level_declaration(node, source))
            .collect();

        Ok(SourceTree {
            source,
            declarations,
        })
    }
}

fn top_level_declaration(node: Node, source: &str) -> Option<Declaration> {
    match node.kind() {
        "package_declaration" => Some(statement(node, source, DeclKind::Package)),
        "import_declaration" => Some(statement(node, source, DeclKind::Import)),
        "class_declaration" | "interface_declaration" => Some(class_declaration(node, source)),
        _ => None,
    }
}

/// Package and import statements: tokens plus the dotted path as name
fn statement(node: Node, source: &str, kind: DeclKind) -> Declaration {
    let tokens: Vec<String> = node
        .children(&mut node.walk())
        .filter(|c| !is_comment(c.kind()))
        .map(|c| match c.kind() {
            "identifier" | "scoped_identifier" => compact(node_text(c, source)),
            _ => node_text(c, source).to_string(),
        })
        .collect();

    let name: String = tokens
        .iter()
        .filter(|t| !matches!(t.as_str(), "package" | "import" | "static" | ";"))
        .filter(|t| !t.starts_with('@'))
        .map(String::as_str)
        .collect();

    Declaration {
        kind,
        name: Some(name),
        span: span_of(node),
        tokens,
        invocations: Vec::new(),
        body: None,
    }
}

fn class_declaration(node: Node, source: &str) -> Declaration {
    let mut annotations = Vec::new();
    let mut modifiers = Vec::new();
    let mut tokens = Vec::new();
    let mut body_node = None;

    for child in node.children(&mut node.walk()) {
        match child.kind() {
            "modifiers" => {
                for modifier in child.children(&mut child.walk()) {
                    if is_comment(modifier.kind()) {
                        continue;
                    }
                    let text = node_text(modifier, source);
                    if text.starts_with('@') {
                        annotations.push(text.to_string());
                    } else {
                        modifiers.push(text.to_string());
                    }
                }
            }
            "class_body" | "interface_body" => body_node = Some(child),
            kind if is_comment(kind) => {}
            _ => tokens.push(normalize(node_text(child, source))),
        }
    }

    let mut class_body = ClassBody {
        annotations,
        modifiers,
        open_brace_end: node.end_byte(),
        ..ClassBody::default()
    };
    if let Some(body) = body_node {
        collect_body(body, source, &mut class_body);
    }

    Declaration {
        kind: DeclKind::Class,
        name: node
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string()),
        span: span_of(node),
        tokens,
        invocations: Vec::new(),
        body: Some(class_body),
    }
}

fn collect_body(body: Node, source: &str, class_body: &mut ClassBody) {
    class_body.open_brace_end = body.start_byte() + 1;

    for child in body.children(&mut body.walk()) {
        match child.kind() {
            "{" => class_body.open_brace_end = child.end_byte(),
            "}" | ";" => {}
            kind if is_comment(kind) => class_body.comments.push(child.start_byte()..child.end_byte()),
            _ if child.is_named() => class_body.members.push(member_declaration(child, source)),
            _ => {}
        }
    }
}

fn member_declaration(node: Node, source: &str) -> Declaration {
    let kind = match node.kind() {
        "method_declaration" => DeclKind::Method,
        "field_declaration" | "constant_declaration" => DeclKind::Field,
        _ => DeclKind::OtherMember,
    };

    let name_node = match kind {
        DeclKind::Field => node
            .child_by_field_name("declarator")
            .and_then(|d| d.child_by_field_name("name")),
        _ => node.child_by_field_name("name"),
    };

    let mut invocations = Vec::new();
    if kind == DeclKind::Method {
        if let Some(body) = node.child_by_field_name("body") {
            collect_invocations(body, source, &mut invocations);
        }
    }

    Declaration {
        kind,
        name: name_node.map(|n| node_text(n, source).to_string()),
        span: span_of(node),
        tokens: Vec::new(),
        invocations,
        body: None,
    }
}

/// Calls on the enclosing instance, skipping anonymous and local class bodies
fn collect_invocations(node: Node, source: &str, invocations: &mut Vec<Invocation>) {
    if node.kind() == "method_invocation" {
        let on_self = node
            .child_by_field_name("object")
            .map_or(true, |object| object.kind() == "this");
        if on_self {
            if let Some(name) = node.child_by_field_name("name") {
                invocations.push(Invocation {
                    name: node_text(name, source).to_string(),
                    line: node.start_position().row,
                });
            }
        }
    }

    for child in node.children(&mut node.walk()) {
        if child.kind() == "class_body" {
            continue;
        }
        collect_invocations(child, source, invocations);
    }
}

fn first_error_line(node: Node) -> usize {
    if node.is_error() || node.is_missing() {
        return node.start_position().row + 1;
    }
    for child in node.children(&mut node.walk()) {
        if child.has_error() || child.is_missing() {
            return first_error_line(child);
        }
    }
    node.start_position().row + 1
}

fn span_of(node: Node) -> Span {
    Span {
        start_line: node.start_position().row,
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
    }
}

fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    &source[node.start_byte()..node.end_byte()]
}

fn is_comment(kind: &str) -> bool {
    kind.ends_with("comment")
}

/// Drop all whitespace, the way a token stream renders a qualified name
fn compact(text: &str) -> String {
    text.split_whitespace().collect()
}

/// Collapse whitespace runs to single spaces
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE: &str = r#"package com.example.sample;

import java.util.List;
import static java.util.stream.Collectors.*;

@Service
public final class SampleService<T> extends Base implements Runnable,   Closeable {
  private SampleRepository repo;

  public SampleService(SampleRepository repo) {
    this.repo = repo;
  }

  public boolean existAll(List<Long> ids) {
    Runnable r = new Runnable() {
      public void run() { this.hidden(); }
    };
    return ids.stream().allMatch(id -> this.exists(id)) && check() && repo.save();
  }
}
"#;

    #[test]
    fn test_parse_top_level_declarations() {
        let tree = JavaDeclarationParser::new().parse(SERVICE).unwrap();
        let kinds: Vec<DeclKind> = tree.declarations.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![DeclKind::Package, DeclKind::Import, DeclKind::Import, DeclKind::Class]
        );

        assert_eq!(tree.declarations[0].name(), "com.example.sample");
        assert_eq!(tree.declarations[2].name(), "java.util.stream.Collectors.*");
        assert_eq!(tree.declarations[0].span.start_line, 0);
    }

    #[test]
    fn test_parse_class_parts() {
        let tree = JavaDeclarationParser::new().parse(SERVICE).unwrap();
        let class = tree.last_class().unwrap();
        let body = class.body.as_ref().unwrap();

        assert_eq!(class.name(), "SampleService");
        assert_eq!(body.annotations, vec!["@Service".to_string()]);
        assert_eq!(body.modifiers, vec!["public".to_string(), "final".to_string()]);
        assert_eq!(class.tokens[0], "class");
        assert_eq!(class.tokens[1], "SampleService");
        assert!(class.tokens.contains(&"implements Runnable, Closeable".to_string()));
        assert_eq!(&SERVICE[body.open_brace_end - 1..body.open_brace_end], "{");

        let kinds: Vec<DeclKind> = body.members.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![DeclKind::Field, DeclKind::OtherMember, DeclKind::Method]
        );
        assert_eq!(body.members[0].name(), "repo");
        assert_eq!(body.members[0].text(SERVICE), "private SampleRepository repo;");
        assert_eq!(class.method_names().collect::<Vec<_>>(), vec!["existAll"]);
    }

    #[test]
    fn test_self_invocations() {
        let tree = JavaDeclarationParser::new().parse(SERVICE).unwrap();
        let method = &tree.last_class().unwrap().members()[2];
        let names: Vec<&str> = method.invocations.iter().map(|i| i.name.as_str()).collect();

        // `hidden` lives in an anonymous class, `save` and `stream` have other receivers
        assert_eq!(names, vec!["exists", "check"]);
    }

    #[test]
    fn test_parse_failure_reports_line() {
        let source = "package a;\n\npublic class Broken {\n  void f( {\n}\n";
        let err = JavaDeclarationParser::new().parse(source).unwrap_err();
        match err {
            ExtractError::ParseFailure { line, .. } => assert!(line >= 3, "line: {}", line),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_package_annotation_kept_verbatim() {
        let source = "@Generated(\"a  b\")\npackage com . example;\n\nclass A {}\n";
        let tree = JavaDeclarationParser::new().parse(source).unwrap();
        let package = &tree.declarations[0];
        assert_eq!(package.name(), "com.example");
        assert_eq!(
            package.tokens,
            vec!["@Generated(\"a  b\")", "package", "com.example", ";"]
        );
    }

    #[test]
    fn test_body_comments_are_recorded() {
        let source = "class A {\n  // one\n  int x; /* two\n  */\n}\n";
        let tree = JavaDeclarationParser::new().parse(source).unwrap();
        let body = tree.last_class().unwrap().body.as_ref().unwrap();
        let comments: Vec<&str> = body.comments.iter().map(|c| &source[c.clone()]).collect();
        assert_eq!(comments, vec!["// one", "/* two\n  */"]);
    }

    #[test]
    fn test_parse_interface() {
        let source = "interface Repo {\n  int LIMIT = 10;\n  void save(Object o);\n}\n";
        let tree = JavaDeclarationParser::new().parse(source).unwrap();
        let class = tree.last_class().unwrap();
        let kinds: Vec<DeclKind> = class.members().iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![DeclKind::Field, DeclKind::Method]);
        assert_eq!(class.members()[1].name(), "save");
    }
}
