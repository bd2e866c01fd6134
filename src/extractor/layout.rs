//! Text reassembly helpers shared by the extractors.
//!
//! Kept members are copied byte-for-byte from the source. Each member owns
//! the blank and comment lines between the previous member and itself, so
//! dropping a member also drops its documentation.

use crate::parser::ClassBody;
use std::collections::BTreeMap;
use std::ops::Range;

/// Join statement tokens with single spaces, gluing punctuation to its neighbours
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    let mut previous = "";
    for token in tokens {
        let token = token.as_ref();
        let glued = matches!(token, "." | ";" | ",") || token.starts_with('<') || previous == ".";
        if !out.is_empty() && !glued {
            out.push(' ');
        }
        out.push_str(token);
        previous = token;
    }
    out
}

/// Byte range each member occupies once its leading trivia is attached
///
/// Regions never overlap. A body comment belongs wholly to one region or to
/// none: a comment starting on a member's last line is attached to that
/// member, any other comment goes with the member that follows it.
pub fn member_regions(source: &str, body: &ClassBody) -> Vec<Range<usize>> {
    let mut cursor = body.open_brace_end;
    let members = &body.members;

    members
        .iter()
        .enumerate()
        .map(|(i, member)| {
            let limit = members
                .get(i + 1)
                .map_or(source.len(), |next| next.span.start_byte);
            let start = leading_start(source, cursor, member.span.start_byte, &body.comments);
            let end = trailing_end(source, member.span.end_byte, limit, &body.comments);
            cursor = end;
            start..end
        })
        .collect()
}

/// Start at the first line break after `cursor` that is not inside a
/// comment, or at the member itself when there is none.
fn leading_start(source: &str, cursor: usize, member_start: usize, comments: &[Range<usize>]) -> usize {
    let gap = match source.get(cursor..member_start) {
        Some(gap) => gap,
        None => return member_start,
    };
    gap.match_indices('\n')
        .map(|(offset, _)| cursor + offset)
        .find(|newline| !comments.iter().any(|c| c.contains(newline)))
        .map_or(member_start, |newline| newline + 1)
}

/// Extend over comments that start on the member's last line, then to the
/// end of that line when nothing else follows. Never reaches past `limit`.
fn trailing_end(source: &str, member_end: usize, limit: usize, comments: &[Range<usize>]) -> usize {
    let mut end = member_end;
    let mut cursor = member_end;

    loop {
        let rest = source.get(cursor..limit).unwrap_or("");
        cursor += rest.len() - rest.trim_start_matches(|c: char| c == ' ' || c == '\t' || c == '\r').len();

        if cursor >= source.len() || source[cursor..].starts_with('\n') {
            return cursor.min(limit);
        }
        match comments.iter().find(|c| c.start == cursor && c.end <= limit) {
            Some(comment) => {
                end = comment.end;
                cursor = comment.end;
            }
            None => return end,
        }
    }
}

/// Retained members ordered by source position
#[derive(Debug, Default)]
pub struct MemberTable<'s> {
    entries: BTreeMap<usize, &'s str>,
}

impl<'s> MemberTable<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a member's text keyed by its start offset
    pub fn insert(&mut self, start_byte: usize, text: &'s str) {
        self.entries.insert(start_byte, text);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Member texts in source order, one per line, with a trailing newline
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut block = self.entries.values().copied().collect::<Vec<_>>().join("\n");
        block.push('\n');
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::code_parser::JavaDeclarationParser;

    #[test]
    fn test_join_tokens() {
        assert_eq!(join_tokens(&["package", "com.example", ";"]), "package com.example;");
        assert_eq!(
            join_tokens(&["import", "static", "a.b.C", ".", "*", ";"]),
            "import static a.b.C.*;"
        );
        assert_eq!(
            join_tokens(&["class", "Box", "<T>", "extends Base"]),
            "class Box<T> extends Base"
        );
    }

    #[test]
    fn test_member_regions_attach_leading_trivia() {
        let source = "class A {\n  int x; // count\n\n  /** doc */\n  void f() {}\n  int y; int z;\n}\n";
        let tree = JavaDeclarationParser::new().parse(source).unwrap();
        let class = tree.last_class().unwrap();
        let body = class.body.as_ref().unwrap();
        let regions = member_regions(source, body);
        let texts: Vec<&str> = regions.iter().map(|r| &source[r.clone()]).collect();

        assert_eq!(
            texts,
            vec![
                "  int x; // count",
                "\n  /** doc */\n  void f() {}",
                "  int y;",
                "int z;",
            ]
        );
    }

    fn region_texts(source: &str) -> Vec<String> {
        let tree = JavaDeclarationParser::new().parse(source).unwrap();
        let body = tree.last_class().unwrap().body.clone().unwrap();
        member_regions(source, &body)
            .into_iter()
            .map(|r| source[r].to_string())
            .collect()
    }

    #[test]
    fn test_block_comments_between_members_on_one_line() {
        let source = "class A {\n  int x; /* a */ int y; /* b */\n  void f() {}\n}\n";
        assert_eq!(
            region_texts(source),
            vec!["  int x; /* a */", "int y; /* b */", "  void f() {}"]
        );
    }

    #[test]
    fn test_multi_line_comment_stays_with_its_member() {
        let source = "class A {\n  int x; /* start\n     end */\n  void f() {}\n\n  void g() {}\n}\n";
        assert_eq!(
            region_texts(source),
            vec!["  int x; /* start\n     end */", "  void f() {}", "\n  void g() {}"]
        );
    }

    #[test]
    fn test_comment_after_unattached_text_is_not_split() {
        let source = "class A {\n  int x;; /* one\n  two */\n  void f() {}\n}\n";
        let texts = region_texts(source);
        assert_eq!(texts[0], "  int x;");
        assert_eq!(texts[1], "  void f() {}");
    }

    #[test]
    fn test_member_table_orders_by_position() {
        let mut table = MemberTable::new();
        table.insert(40, "  void b() {}");
        table.insert(10, "  int a;");
        assert_eq!(table.len(), 2);
        assert_eq!(table.render(), "  int a;\n  void b() {}\n");
        assert_eq!(MemberTable::new().render(), "");
    }
}
