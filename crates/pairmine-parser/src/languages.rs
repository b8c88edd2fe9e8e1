//! Grammars the locator understands and the node kinds it looks for in each.

use std::fmt;

/// A tree-sitter grammar together with its method-declaration vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    Java,
    Python,
    Go,
    Rust,
}

impl Grammar {
    pub const ALL: [Grammar; 4] = [Grammar::Java, Grammar::Python, Grammar::Go, Grammar::Rust];

    /// Canonical lowercase name, as used in config files.
    pub fn name(self) -> &'static str {
        match self {
            Grammar::Java => "java",
            Grammar::Python => "python",
            Grammar::Go => "go",
            Grammar::Rust => "rust",
        }
    }

    /// Look up a grammar by name or common alias (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "java" => Some(Grammar::Java),
            "python" | "py" => Some(Grammar::Python),
            "go" | "golang" => Some(Grammar::Go),
            "rust" | "rs" => Some(Grammar::Rust),
            _ => None,
        }
    }

    /// Look up a grammar by file extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|g| g.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Grammar::Java => &["java"],
            Grammar::Python => &["py", "pyi"],
            Grammar::Go => &["go"],
            Grammar::Rust => &["rs"],
        }
    }

    pub fn ts_language(self) -> tree_sitter::Language {
        match self {
            Grammar::Java => tree_sitter_java::LANGUAGE.into(),
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
            Grammar::Go => tree_sitter_go::LANGUAGE.into(),
            Grammar::Rust => tree_sitter_rust::LANGUAGE.into(),
        }
    }

    /// Node kinds that count as method declarations.
    ///
    /// Java constructors (`constructor_declaration`) are not methods here.
    pub fn method_kinds(self) -> &'static [&'static str] {
        match self {
            Grammar::Java => &["method_declaration"],
            Grammar::Python => &["function_definition"],
            Grammar::Go => &["function_declaration", "method_declaration"],
            Grammar::Rust => &["function_item"],
        }
    }

    /// Node kinds of the direct child that carries a declaration's name.
    pub fn name_kinds(self) -> &'static [&'static str] {
        match self {
            Grammar::Go => &["identifier", "field_identifier"],
            Grammar::Java | Grammar::Python | Grammar::Rust => &["identifier"],
        }
    }

    pub fn is_method_kind(self, kind: &str) -> bool {
        self.method_kinds().contains(&kind)
    }

    pub fn is_name_kind(self, kind: &str) -> bool {
        self.name_kinds().contains(&kind)
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
