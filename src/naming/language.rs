//! Target language identifier rules
//!
//! Maps raw schema field names to identifiers for the generated code. The
//! transform is a pure function of (raw name, language).

use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages the external generator can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    #[value(name = "typescript", alias = "ts")]
    TypeScript,
    #[value(alias = "py")]
    Python,
    Rust,
    Go,
    Java,
    Kotlin,
    #[value(name = "csharp", alias = "cs")]
    CSharp,
    Swift,
}

/// Case convention applied to field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CaseConvention {
    CamelCase,
    SnakeCase,
    PascalCase,
}

/// How a reserved word is made usable as an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    Suffix(&'static str),
    Prefix(&'static str),
    Wrap(&'static str),
}

const TYPESCRIPT_RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "implements", "interface", "let", "package",
    "private", "protected", "public", "static", "yield", "constructor",
];

const PYTHON_RESERVED: &[&str] = &[
    "false", "none", "true", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

const RUST_RESERVED: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where", "while",
    "abstract", "become", "box", "do", "final", "gen", "macro", "override", "priv", "try",
    "typeof", "unsized", "virtual", "yield",
];

/// Cannot be raw identifiers
const RUST_PATH_KEYWORDS: &[&str] = &["self", "super", "crate", "_"];

const GO_RESERVED: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough", "for",
    "func", "go", "goto", "if", "import", "interface", "map", "package", "range", "return",
    "select", "struct", "switch", "type", "var",
];

const JAVA_RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null", "var", "record", "yield",
];

const KOTLIN_RESERVED: &[&str] = &[
    "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in",
    "interface", "is", "null", "object", "package", "return", "super", "this", "throw", "true",
    "try", "typealias", "typeof", "val", "var", "when", "while",
];

const CSHARP_RESERVED: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked", "class",
    "const", "continue", "decimal", "default", "delegate", "do", "double", "else", "enum", "event",
    "explicit", "extern", "false", "finally", "fixed", "float", "for", "foreach", "goto", "if",
    "implicit", "in", "int", "interface", "internal", "is", "lock", "long", "namespace", "new",
    "null", "object", "operator", "out", "override", "params", "private", "protected", "public",
    "readonly", "ref", "return", "sbyte", "sealed", "short", "sizeof", "stackalloc", "static",
    "string", "struct", "switch", "this", "throw", "true", "try", "typeof", "uint", "ulong",
    "unchecked", "unsafe", "ushort", "using", "virtual", "void", "volatile", "while",
];

const SWIFT_RESERVED: &[&str] = &[
    "associatedtype", "class", "deinit", "enum", "extension", "fileprivate", "func", "import",
    "init", "inout", "internal", "let", "open", "operator", "private", "protocol", "public",
    "rethrows", "static", "struct", "subscript", "typealias", "var", "break", "case", "continue",
    "default", "defer", "do", "else", "fallthrough", "for", "guard", "if", "in", "repeat",
    "return", "switch", "where", "while", "as", "catch", "false", "is", "nil", "self", "super",
    "throw", "throws", "true", "try",
];

impl TargetLanguage {
    pub fn case_convention(self) -> CaseConvention {
        match self {
            TargetLanguage::TypeScript
            | TargetLanguage::Java
            | TargetLanguage::Kotlin
            | TargetLanguage::Swift => CaseConvention::CamelCase,
            TargetLanguage::Python | TargetLanguage::Rust => CaseConvention::SnakeCase,
            TargetLanguage::Go | TargetLanguage::CSharp => CaseConvention::PascalCase,
        }
    }

    fn reserved_words(self) -> &'static [&'static str] {
        match self {
            TargetLanguage::TypeScript => TYPESCRIPT_RESERVED,
            TargetLanguage::Python => PYTHON_RESERVED,
            TargetLanguage::Rust => RUST_RESERVED,
            TargetLanguage::Go => GO_RESERVED,
            TargetLanguage::Java => JAVA_RESERVED,
            TargetLanguage::Kotlin => KOTLIN_RESERVED,
            TargetLanguage::CSharp => CSHARP_RESERVED,
            TargetLanguage::Swift => SWIFT_RESERVED,
        }
    }

    fn escape_for(self, identifier: &str) -> Escape {
        match self {
            TargetLanguage::Rust if RUST_PATH_KEYWORDS.contains(&identifier) => Escape::Suffix("_"),
            TargetLanguage::Rust => Escape::Prefix("r#"),
            TargetLanguage::CSharp => Escape::Prefix("@"),
            TargetLanguage::Swift => Escape::Wrap("`"),
            _ => Escape::Suffix("_"),
        }
    }

    /// Python's `False`/`None`/`True` are matched case-insensitively
    fn is_reserved(self, identifier: &str) -> bool {
        if self == TargetLanguage::Rust && RUST_PATH_KEYWORDS.contains(&identifier) {
            return true;
        }
        let words = self.reserved_words();
        match self {
            TargetLanguage::Python => words.contains(&identifier.to_lowercase().as_str()),
            _ => words.contains(&identifier),
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetLanguage::TypeScript => "typescript",
            TargetLanguage::Python => "python",
            TargetLanguage::Rust => "rust",
            TargetLanguage::Go => "go",
            TargetLanguage::Java => "java",
            TargetLanguage::Kotlin => "kotlin",
            TargetLanguage::CSharp => "csharp",
            TargetLanguage::Swift => "swift",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "typescript" | "ts" => Ok(TargetLanguage::TypeScript),
            "python" | "py" => Ok(TargetLanguage::Python),
            "rust" => Ok(TargetLanguage::Rust),
            "go" => Ok(TargetLanguage::Go),
            "java" => Ok(TargetLanguage::Java),
            "kotlin" => Ok(TargetLanguage::Kotlin),
            "csharp" | "cs" => Ok(TargetLanguage::CSharp),
            "swift" => Ok(TargetLanguage::Swift),
            other => Err(format!("unsupported target language '{}'", other)),
        }
    }
}

/// Transformation applied to one raw name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingRule {
    pub case: CaseConvention,
    pub reserved_escaped: bool,
    pub digit_prefixed: bool,
}

/// Raw field name and the identifier generated for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldNameMapping {
    pub raw: String,
    pub identifier: String,
    pub rule: NamingRule,
}

/// Resolve one raw field name
pub fn resolve_name(raw: &str, language: TargetLanguage) -> FieldNameMapping {
    let case = language.case_convention();
    let mut identifier = match case {
        CaseConvention::CamelCase => raw.to_lower_camel_case(),
        CaseConvention::SnakeCase => raw.to_snake_case(),
        CaseConvention::PascalCase => raw.to_upper_camel_case(),
    };

    if identifier.is_empty() {
        identifier = "_".to_string();
    }

    let digit_prefixed = identifier.starts_with(|c: char| c.is_ascii_digit());
    if digit_prefixed {
        identifier.insert(0, '_');
    }

    let reserved_escaped = language.is_reserved(&identifier);
    if reserved_escaped {
        identifier = match language.escape_for(&identifier) {
            Escape::Suffix(suffix) => format!("{}{}", identifier, suffix),
            Escape::Prefix(prefix) => format!("{}{}", prefix, identifier),
            Escape::Wrap(quote) => format!("{}{}{}", quote, identifier, quote),
        };
    }

    FieldNameMapping {
        raw: raw.to_string(),
        identifier,
        rule: NamingRule {
            case,
            reserved_escaped,
            digit_prefixed,
        },
    }
}

/// Field name resolver for one target language
#[derive(Debug, Clone, Copy)]
pub struct FieldNameResolver {
    language: TargetLanguage,
}

impl FieldNameResolver {
    pub fn new(language: TargetLanguage) -> Self {
        Self { language }
    }

    /// Resolve every field independently, preserving order
    pub fn resolve<S: AsRef<str>>(&self, fields: &[S]) -> Vec<FieldNameMapping> {
        fields
            .iter()
            .map(|field| resolve_name(field.as_ref(), self.language))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(raw: &str, language: TargetLanguage) -> String {
        resolve_name(raw, language).identifier
    }

    #[test]
    fn test_case_conventions() {
        assert_eq!(ident("user_name", TargetLanguage::TypeScript), "userName");
        assert_eq!(ident("userName", TargetLanguage::Python), "user_name");
        assert_eq!(ident("user-name", TargetLanguage::Go), "UserName");
        assert_eq!(ident("created_at", TargetLanguage::CSharp), "CreatedAt");
        assert_eq!(ident("CreatedAt", TargetLanguage::Rust), "created_at");
    }

    #[test]
    fn test_reserved_word_escaping() {
        assert_eq!(ident("class", TargetLanguage::TypeScript), "class_");
        assert_eq!(ident("type", TargetLanguage::Rust), "r#type");
        assert_eq!(ident("self", TargetLanguage::Rust), "self_");
        assert_eq!(ident("from", TargetLanguage::Python), "from_");
        assert_eq!(ident("None", TargetLanguage::Python), "none_");
        assert_eq!(ident("default", TargetLanguage::Swift), "`default`");
        assert_eq!(ident("event", TargetLanguage::Go), "Event");

        let mapping = resolve_name("class", TargetLanguage::Java);
        assert!(mapping.rule.reserved_escaped);
        assert!(!mapping.rule.digit_prefixed);
    }

    #[test]
    fn test_leading_digit_prefixed() {
        let mapping = resolve_name("3d_model", TargetLanguage::Python);
        assert_eq!(mapping.identifier, "_3d_model");
        assert!(mapping.rule.digit_prefixed);
    }

    #[test]
    fn test_symbol_only_name() {
        assert_eq!(ident("__", TargetLanguage::TypeScript), "_");
    }

    #[test]
    fn test_resolver_preserves_order() {
        let resolver = FieldNameResolver::new(TargetLanguage::TypeScript);
        let mappings = resolver.resolve(&["zeta_field", "alpha_field"]);
        let identifiers: Vec<_> = mappings.iter().map(|m| m.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["zetaField", "alphaField"]);
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("ts".parse::<TargetLanguage>(), Ok(TargetLanguage::TypeScript));
        assert_eq!("CSharp".parse::<TargetLanguage>(), Ok(TargetLanguage::CSharp));
        assert!("cobol".parse::<TargetLanguage>().is_err());
        assert_eq!(TargetLanguage::CSharp.to_string(), "csharp");
    }
}
