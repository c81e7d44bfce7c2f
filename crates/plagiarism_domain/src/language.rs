use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Languages the normalizer knows how to strip and tokenize
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    Python,
    Java,
    #[strum(to_string = "javascript", serialize = "js")]
    JavaScript,
    #[strum(to_string = "typescript", serialize = "ts")]
    TypeScript,
    #[strum(to_string = "csharp", serialize = "c#", serialize = "cs")]
    CSharp,
    #[strum(to_string = "cpp", serialize = "c++")]
    Cpp,
    C,
    Go,
    Rust,
}

const C_FAMILY_BLOCK: &[(&str, &str)] = &[("/*", "*/")];

impl Language {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py"],
            Language::Java => &["java"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "tsx"],
            Language::CSharp => &["cs"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "h"],
            Language::C => &["c", "h"],
            Language::Go => &["go"],
            Language::Rust => &["rs"],
        }
    }

    /// Whether a path (by extension) belongs to this language
    pub fn matches_path(&self, path: &str) -> bool {
        path.rsplit_once('.')
            .map(|(_, ext)| {
                let ext = ext.to_ascii_lowercase();
                self.extensions().iter().any(|known| *known == ext)
            })
            .unwrap_or(false)
    }

    pub fn line_comment(&self) -> &'static str {
        match self {
            Language::Python => "#",
            _ => "//",
        }
    }

    /// Block comment delimiters; Python docstrings are treated as comments
    pub fn block_comments(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Language::Python => &[("\"\"\"", "\"\"\""), ("'''", "'''")],
            _ => C_FAMILY_BLOCK,
        }
    }

    /// Characters opening a string or character literal
    pub fn string_delimiters(&self) -> &'static [char] {
        match self {
            Language::JavaScript | Language::TypeScript => &['"', '\'', '`'],
            Language::Go => &['"', '\'', '`'],
            // lifetimes make a lone `'` ambiguous
            Language::Rust => &['"'],
            _ => &['"', '\''],
        }
    }

    /// Whether `'...'` is a full string rather than a single character
    pub fn single_quoted_strings(&self) -> bool {
        matches!(self, Language::Python | Language::JavaScript | Language::TypeScript)
    }

    /// Leading words of lines that only pull in other modules
    pub fn import_prefixes(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["import ", "from "],
            Language::Java => &["import ", "package "],
            Language::JavaScript | Language::TypeScript => &["import ", "require("],
            Language::CSharp => &["using "],
            Language::Cpp | Language::C => &["#include", "#pragma once", "using namespace "],
            Language::Go => &["import ", "package "],
            Language::Rust => &["use ", "pub use ", "extern crate "],
        }
    }

    /// Statements that share an import prefix but are code
    pub fn import_lookalikes(&self) -> &'static [&'static str] {
        match self {
            Language::CSharp => &["using (", "using var "],
            _ => &[],
        }
    }

    /// Words left intact by aggressive normalization
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &[
                "and", "as", "assert", "async", "await", "break", "class", "continue", "def",
                "del", "elif", "else", "except", "False", "finally", "for", "from", "global",
                "if", "import", "in", "is", "lambda", "None", "nonlocal", "not", "or", "pass",
                "raise", "return", "self", "True", "try", "while", "with", "yield",
            ],
            Language::Java => &[
                "abstract", "boolean", "break", "case", "catch", "char", "class", "continue",
                "default", "do", "double", "else", "extends", "false", "final", "finally",
                "float", "for", "if", "implements", "import", "instanceof", "int", "interface",
                "long", "new", "null", "private", "protected", "public", "return", "static",
                "super", "switch", "this", "throw", "throws", "true", "try", "void", "while",
            ],
            Language::JavaScript | Language::TypeScript => &[
                "async", "await", "break", "case", "catch", "class", "const", "continue",
                "default", "do", "else", "export", "extends", "false", "finally", "for",
                "function", "if", "import", "in", "instanceof", "interface", "let", "new",
                "null", "of", "return", "super", "switch", "this", "throw", "true", "try",
                "type", "typeof", "undefined", "var", "void", "while", "yield",
            ],
            Language::CSharp => &[
                "abstract", "async", "await", "bool", "break", "case", "catch", "class",
                "const", "continue", "default", "do", "double", "else", "false", "finally",
                "for", "foreach", "if", "in", "int", "interface", "new", "null", "out",
                "override", "private", "protected", "public", "return", "static", "string",
                "switch", "this", "throw", "true", "try", "var", "virtual", "void", "while",
            ],
            Language::Cpp | Language::C => &[
                "auto", "bool", "break", "case", "char", "class", "const", "continue",
                "default", "delete", "do", "double", "else", "enum", "false", "float", "for",
                "if", "int", "long", "new", "nullptr", "private", "protected", "public",
                "return", "sizeof", "static", "struct", "switch", "template", "this", "true",
                "typedef", "unsigned", "void", "while",
            ],
            Language::Go => &[
                "break", "case", "chan", "const", "continue", "default", "defer", "else",
                "false", "for", "func", "go", "if", "interface", "map", "nil", "range",
                "return", "select", "struct", "switch", "true", "type", "var",
            ],
            Language::Rust => &[
                "as", "async", "await", "break", "const", "continue", "crate", "else", "enum",
                "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
                "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct",
                "trait", "true", "type", "unsafe", "use", "where", "while",
            ],
        }
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords().contains(&word)
    }
}
