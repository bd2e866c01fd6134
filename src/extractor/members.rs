use super::layout::{join_tokens, member_regions, MemberTable};
use super::MemberExtractor;
use crate::error::ExtractError;
use crate::parser::code_parser::JavaDeclarationParser;
use crate::parser::{DeclKind, Declaration, SourceTree};
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

/// Selective member extractor for Java sources
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaMemberExtractor {
    parser: JavaDeclarationParser,
}

impl JavaMemberExtractor {
    pub fn new() -> Self {
        Self {
            parser: JavaDeclarationParser::new(),
        }
    }
}

impl MemberExtractor for JavaMemberExtractor {
    fn extract_members(&self, source: &str, targets: &[&str]) -> Result<String, ExtractError> {
        let tree = self.parser.parse(source)?;
        Ok(extract_tree(&tree, targets))
    }
}

/// Rebuild the file: package, imports, then the class with retained members
///
/// Methods are retained when requested or when a requested method calls them
/// on `this`. Callees of callees are not followed. Fields, constructors and
/// nested types are kept whenever at least one method is requested.
pub fn extract_tree(tree: &SourceTree<'_>, targets: &[&str]) -> String {
    let mut package_block = String::new();
    let mut import_block = String::new();

    for decl in &tree.declarations {
        match decl.kind {
            DeclKind::Package => {
                package_block = join_tokens(&decl.tokens);
                package_block.push_str("\n\n");
            }
            DeclKind::Import => {
                import_block.push_str(&join_tokens(&decl.tokens));
                import_block.push('\n');
            }
            DeclKind::Class | DeclKind::Method | DeclKind::Field | DeclKind::OtherMember => {}
        }
    }
    if !import_block.is_empty() {
        import_block.push('\n');
    }

    let class_block = tree
        .last_class()
        .map(|class| render_class(tree.source, class, targets))
        .unwrap_or_default();

    format!("{}{}{}", package_block, import_block, class_block)
}

fn render_class(source: &str, class: &Declaration, targets: &[&str]) -> String {
    let mut header = String::new();
    if let Some(body) = &class.body {
        for annotation in &body.annotations {
            header.push_str(annotation);
            header.push('\n');
        }
        if !body.modifiers.is_empty() {
            header.push_str(&body.modifiers.join(" "));
            header.push(' ');
        }
    }
    header.push_str(&join_tokens(&class.tokens));
    header.push(' ');

    let table = if targets.is_empty() {
        MemberTable::new()
    } else {
        retained_members(source, class, targets)
    };

    format!("{}{{\n{}}}\n", header, table.render())
}

type Overloads<'d> = Vec<(&'d Declaration, Range<usize>)>;

fn retained_members<'s>(source: &'s str, class: &Declaration, targets: &[&str]) -> MemberTable<'s> {
    let mut table = MemberTable::new();
    let body = match &class.body {
        Some(body) => body,
        None => return table,
    };

    let regions = member_regions(source, body);
    let mut methods: HashMap<&str, Overloads<'_>> = HashMap::new();

    for (member, region) in body.members.iter().zip(regions) {
        match member.kind {
            DeclKind::Method => methods.entry(member.name()).or_default().push((member, region)),
            DeclKind::Field | DeclKind::OtherMember => {
                table.insert(member.span.start_byte, &source[region]);
            }
            DeclKind::Package | DeclKind::Import | DeclKind::Class => {}
        }
    }

    for name in retention_set(&methods, targets) {
        for (member, region) in &methods[name] {
            table.insert(member.span.start_byte, &source[region.clone()]);
        }
    }

    tracing::debug!(
        "Kept {} of {} members of {}",
        table.len(),
        body.members.len(),
        class.name()
    );
    table
}

/// Requested methods plus the methods they call directly
fn retention_set<'d>(methods: &HashMap<&'d str, Overloads<'d>>, targets: &[&str]) -> BTreeSet<&'d str> {
    let mut retained = BTreeSet::new();

    for target in targets {
        let (name, overloads) = match methods.get_key_value(*target) {
            Some(entry) => entry,
            None => {
                tracing::debug!("Requested method {} not found, skipping", target);
                continue;
            }
        };
        retained.insert(*name);

        for (method, _) in overloads {
            for invocation in &method.invocations {
                if let Some((callee, _)) = methods.get_key_value(invocation.name.as_str()) {
                    if retained.insert(*callee) {
                        tracing::trace!("{} pulls in {} (line {})", name, callee, invocation.line + 1);
                    }
                }
            }
        }
    }

    retained
}
