pub mod code_parser;

use std::ops::Range;

/// Kind of a declaration node produced by the declaration parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Package,
    Import,
    Class,
    Method,
    Field,
    /// Constructors, initializer blocks, nested types and anything else
    /// that can sit in a class body.
    OtherMember,
}

/// Source position of a declaration. Lines are 0-based rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

/// A call on the enclosing instance (`this.name(..)` or a bare `name(..)`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub line: usize,
}

/// Class-only parts of a declaration
#[derive(Debug, Clone, Default)]
pub struct ClassBody {
    /// Annotations in front of the class, verbatim.
    pub annotations: Vec<String>,
    /// Modifier keywords (`public`, `final`, ...).
    pub modifiers: Vec<String>,
    /// Byte offset right after the opening brace.
    pub open_brace_end: usize,
    /// Body members in source order.
    pub members: Vec<Declaration>,
    /// Byte ranges of comments sitting directly in the body, in source order.
    pub comments: Vec<Range<usize>>,
}

/// A typed declaration node
#[derive(Debug, Clone)]
pub struct Declaration {
    pub kind: DeclKind,
    /// Simple name for classes and methods, dotted path for packages and imports.
    pub name: Option<String>,
    pub span: Span,
    /// Child tokens in source order. For classes this is the header only
    /// (no modifiers, no body).
    pub tokens: Vec<String>,
    pub invocations: Vec<Invocation>,
    pub body: Option<ClassBody>,
}

impl Declaration {
    /// Verbatim source text of this declaration
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.start_byte..self.span.end_byte]
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn members(&self) -> &[Declaration] {
        self.body.as_ref().map(|b| b.members.as_slice()).unwrap_or(&[])
    }

    /// Simple names of the methods declared directly in this class
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.members()
            .iter()
            .filter(|m| m.kind == DeclKind::Method)
            .map(|m| m.name())
    }
}

/// Top-level declarations of one parsed file
#[derive(Debug, Clone)]
pub struct SourceTree<'s> {
    pub source: &'s str,
    pub declarations: Vec<Declaration>,
}

impl<'s> SourceTree<'s> {
    /// Last top-level class declaration of the file, if any
    pub fn last_class(&self) -> Option<&Declaration> {
        self.declarations
            .iter()
            .rev()
            .find(|d| d.kind == DeclKind::Class)
    }
}
