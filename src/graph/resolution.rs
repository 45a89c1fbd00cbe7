//! Name resolution for body references.
//!
//! Callee expressions are normalized into [`CallIdentifier`]s at extraction
//! time; the builder resolves them against a [`SymbolTable`] of every
//! signature in the batch.

use std::collections::BTreeMap;
use std::path::Path;

use crate::graph::pdg::{NodeId, NodeKind};

/// Parsed callee with namespace segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallIdentifier {
    segments: Vec<String>,
}

impl CallIdentifier {
    /// Parse a raw callee expression.
    ///
    /// Member access (`.`, `::`, `->`, `\`) separates segments; receivers
    /// (`self`, `this`, `cls`, `super`) are dropped; call parentheses end
    /// the identifier and generic arguments are skipped.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut segments = Vec::with_capacity(4);
        let mut buffer = String::new();
        let mut chars = trimmed.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch.is_alphanumeric() || ch == '_' || ch == '#' {
                buffer.push(ch);
                continue;
            }
            if !buffer.is_empty() {
                segments.push(std::mem::take(&mut buffer));
            }
            match ch {
                '(' | '[' | '!' => break,
                '<' => {
                    // generic arguments
                    let mut depth = 1;
                    for next in chars.by_ref() {
                        match next {
                            '<' => depth += 1,
                            '>' => depth -= 1,
                            _ => {}
                        }
                        if depth == 0 {
                            break;
                        }
                    }
                }
                ':' => {
                    while matches!(chars.peek(), Some(':')) {
                        chars.next();
                    }
                }
                '-' if matches!(chars.peek(), Some('>')) => {
                    chars.next();
                }
                _ => {}
            }
        }
        if !buffer.is_empty() {
            segments.push(buffer);
        }

        while matches!(segments.first(), Some(segment) if matches!(segment.as_str(), "self" | "this" | "cls" | "super" | "Self"))
        {
            segments.remove(0);
        }

        if segments.is_empty() {
            return None;
        }
        Some(Self { segments })
    }

    /// The final segment: the called name.
    pub fn base(&self) -> &str {
        self.segments.last().map(|s| s.as_str()).unwrap_or("")
    }

    /// All but the final segment.
    pub fn namespace(&self) -> &[String] {
        if self.segments.len() <= 1 {
            &self.segments[..0]
        } else {
            &self.segments[..self.segments.len() - 1]
        }
    }

    /// `a::b::c` form stored on analyzed signatures.
    pub fn qualified(&self) -> String {
        self.segments.join("::")
    }
}

/// A resolvable symbol.
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub id: NodeId,
    pub kind: NodeKind,
    pub file: String,
    pub scope: Vec<String>,
}

/// Why a reference produced no edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    NoMatch,
    Ambiguous(usize),
}

/// Every named symbol of a batch, indexed by bare name.
#[derive(Debug, Default)]
pub struct SymbolTable {
    by_name: BTreeMap<String, Vec<SymbolEntry>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, entry: SymbolEntry) {
        self.by_name.entry(name.to_string()).or_default().push(entry);
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Resolve `reference` made from `from_file` to one symbol whose kind is
    /// accepted by `accept`.
    ///
    /// Order: namespace-qualified narrowing, a unique match in the batch,
    /// then same file, then same directory. Anything else is unresolved.
    pub fn resolve(
        &self,
        reference: &CallIdentifier,
        from_file: &str,
        accept: impl Fn(NodeKind) -> bool,
    ) -> Result<&SymbolEntry, Unresolved> {
        let candidates: Vec<&SymbolEntry> = self
            .by_name
            .get(reference.base())
            .map(|entries| entries.iter().filter(|e| accept(e.kind)).collect())
            .unwrap_or_default();

        if candidates.is_empty() {
            return Err(Unresolved::NoMatch);
        }

        let namespace = reference.namespace();
        let candidates = if namespace.is_empty() {
            candidates
        } else {
            let narrowed: Vec<&SymbolEntry> = candidates
                .iter()
                .copied()
                .filter(|entry| entry.scope.ends_with(namespace))
                .collect();
            if narrowed.is_empty() {
                candidates
            } else {
                narrowed
            }
        };

        if let [only] = candidates.as_slice() {
            return Ok(*only);
        }

        let same_file: Vec<&SymbolEntry> = candidates
            .iter()
            .copied()
            .filter(|entry| entry.file == from_file)
            .collect();
        if let [only] = same_file.as_slice() {
            return Ok(*only);
        }
        if same_file.len() > 1 {
            return Err(Unresolved::Ambiguous(same_file.len()));
        }

        let directory = parent_dir(from_file);
        let same_dir: Vec<&SymbolEntry> = candidates
            .iter()
            .copied()
            .filter(|entry| parent_dir(&entry.file) == directory)
            .collect();
        match same_dir.as_slice() {
            [only] => Ok(*only),
            _ => Err(Unresolved::Ambiguous(candidates.len())),
        }
    }
}

fn parent_dir(path: &str) -> &Path {
    Path::new(path).parent().unwrap_or_else(|| Path::new(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, file: &str, scope: &[&str], kind: NodeKind) -> SymbolEntry {
        SymbolEntry {
            id: NodeId::from(id),
            kind,
            file: file.to_string(),
            scope: scope.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_strips_receivers_and_arguments() {
        let call = CallIdentifier::parse("self.parser.parse_headers(req)").unwrap();
        assert_eq!(call.base(), "parse_headers");
        assert_eq!(call.namespace(), &["parser".to_string()]);

        let call = CallIdentifier::parse("Vec::<u8>::new").unwrap();
        assert_eq!(call.qualified(), "Vec::new");

        let call = CallIdentifier::parse("std::mem::take").unwrap();
        assert_eq!(call.qualified(), "std::mem::take");

        let call = CallIdentifier::parse("$this->render").unwrap();
        assert_eq!(call.base(), "render");

        assert!(CallIdentifier::parse("this").is_none());
        assert!(CallIdentifier::parse("  ").is_none());
    }

    #[test]
    fn test_unique_match_wins() {
        let mut table = SymbolTable::new();
        table.insert("parse", entry("b.py::parse", "b.py", &[], NodeKind::Function));
        let call = CallIdentifier::parse("parse").unwrap();
        let found = table.resolve(&call, "a.py", NodeKind::is_callable).unwrap();
        assert_eq!(found.id.as_str(), "b.py::parse");
    }

    #[test]
    fn test_kind_filter() {
        let mut table = SymbolTable::new();
        table.insert("LIMIT", entry("a.py::LIMIT", "a.py", &[], NodeKind::Variable));
        let call = CallIdentifier::parse("LIMIT").unwrap();
        assert_eq!(
            table.resolve(&call, "a.py", NodeKind::is_callable).unwrap_err(),
            Unresolved::NoMatch
        );
    }

    #[test]
    fn test_same_file_then_same_directory() {
        let mut table = SymbolTable::new();
        table.insert("run", entry("src/a.py::run", "src/a.py", &[], NodeKind::Function));
        table.insert("run", entry("src/b.py::run", "src/b.py", &[], NodeKind::Function));
        table.insert("run", entry("lib/c.py::run", "lib/c.py", &[], NodeKind::Function));
        let call = CallIdentifier::parse("run").unwrap();

        let found = table.resolve(&call, "src/a.py", NodeKind::is_callable).unwrap();
        assert_eq!(found.id.as_str(), "src/a.py::run");

        let found = table.resolve(&call, "lib/d.py", NodeKind::is_callable).unwrap();
        assert_eq!(found.id.as_str(), "lib/c.py::run");

        // two candidates share src/, none in the caller's file
        let err = table.resolve(&call, "src/e.py", NodeKind::is_callable).unwrap_err();
        assert_eq!(err, Unresolved::Ambiguous(3));
    }

    #[test]
    fn test_namespace_narrows_candidates() {
        let mut table = SymbolTable::new();
        table.insert("open", entry("a.rs::Conn::open", "a.rs", &["Conn"], NodeKind::Method));
        table.insert("open", entry("b.rs::File::open", "b.rs", &["File"], NodeKind::Method));
        let call = CallIdentifier::parse("File::open").unwrap();
        let found = table.resolve(&call, "c.rs", NodeKind::is_callable).unwrap();
        assert_eq!(found.id.as_str(), "b.rs::File::open");
    }
}
