//! Code block language tags
//!
//! The language picker of a code node lists a fixed, ordered set of
//! languages. Tags found in markup are normalized onto that set; anything
//! unknown becomes [`Language::PlainText`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A `{value, label}` pair shown by the language picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageOption {
    /// Tag written after the opening fence and in `language-*` classes
    pub value: &'static str,
    /// Human readable name
    pub label: &'static str,
}

/// Languages a code block can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Java,
    Cpp,
    C,
    CSharp,
    Go,
    Rust,
    Swift,
    Kotlin,
    Php,
    Ruby,
    Sql,
    Html,
    Css,
    Json,
    Yaml,
    Markdown,
    Bash,
    /// Sentinel for untagged or unrecognized blocks
    #[default]
    PlainText,
}

/// Picker entries, in display order.
pub const LANGUAGES: &[LanguageOption] = &[
    LanguageOption { value: "javascript", label: "JavaScript" },
    LanguageOption { value: "typescript", label: "TypeScript" },
    LanguageOption { value: "python", label: "Python" },
    LanguageOption { value: "java", label: "Java" },
    LanguageOption { value: "cpp", label: "C++" },
    LanguageOption { value: "c", label: "C" },
    LanguageOption { value: "csharp", label: "C#" },
    LanguageOption { value: "go", label: "Go" },
    LanguageOption { value: "rust", label: "Rust" },
    LanguageOption { value: "swift", label: "Swift" },
    LanguageOption { value: "kotlin", label: "Kotlin" },
    LanguageOption { value: "php", label: "PHP" },
    LanguageOption { value: "ruby", label: "Ruby" },
    LanguageOption { value: "sql", label: "SQL" },
    LanguageOption { value: "html", label: "HTML" },
    LanguageOption { value: "css", label: "CSS" },
    LanguageOption { value: "json", label: "JSON" },
    LanguageOption { value: "yaml", label: "YAML" },
    LanguageOption { value: "markdown", label: "Markdown" },
    LanguageOption { value: "bash", label: "Bash" },
    LanguageOption { value: "plaintext", label: "Plain Text" },
];

const ALL: [Language; 21] = [
    Language::JavaScript,
    Language::TypeScript,
    Language::Python,
    Language::Java,
    Language::Cpp,
    Language::C,
    Language::CSharp,
    Language::Go,
    Language::Rust,
    Language::Swift,
    Language::Kotlin,
    Language::Php,
    Language::Ruby,
    Language::Sql,
    Language::Html,
    Language::Css,
    Language::Json,
    Language::Yaml,
    Language::Markdown,
    Language::Bash,
    Language::PlainText,
];

impl Language {
    /// All languages, in picker order.
    pub fn all() -> &'static [Language] {
        &ALL
    }

    /// Normalize a fence info string or class suffix to a language.
    ///
    /// Only the first whitespace-separated word is considered, and common
    /// aliases are accepted. Unknown tags fall back to plain text.
    pub fn from_tag(tag: &str) -> Self {
        let word = tag.split_whitespace().next().unwrap_or("");
        match word.to_lowercase().as_str() {
            "javascript" | "js" | "jsx" | "mjs" => Language::JavaScript,
            "typescript" | "ts" | "tsx" => Language::TypeScript,
            "python" | "py" => Language::Python,
            "java" => Language::Java,
            "cpp" | "c++" | "cxx" | "cc" => Language::Cpp,
            "c" | "h" => Language::C,
            "csharp" | "cs" | "c#" => Language::CSharp,
            "go" | "golang" => Language::Go,
            "rust" | "rs" => Language::Rust,
            "swift" => Language::Swift,
            "kotlin" | "kt" => Language::Kotlin,
            "php" => Language::Php,
            "ruby" | "rb" => Language::Ruby,
            "sql" => Language::Sql,
            "html" | "htm" | "xml" => Language::Html,
            "css" => Language::Css,
            "json" => Language::Json,
            "yaml" | "yml" => Language::Yaml,
            "markdown" | "md" => Language::Markdown,
            "bash" | "sh" | "shell" | "zsh" => Language::Bash,
            _ => Language::PlainText,
        }
    }

    /// Canonical tag, as listed in [`LANGUAGES`].
    pub fn value(&self) -> &'static str {
        self.option().value
    }

    /// Display name for the picker.
    pub fn label(&self) -> &'static str {
        self.option().label
    }

    /// Tag to write after an opening fence; empty for plain text.
    pub fn fence_tag(&self) -> &'static str {
        if self.is_plain_text() {
            ""
        } else {
            self.value()
        }
    }

    pub fn is_plain_text(&self) -> bool {
        matches!(self, Language::PlainText)
    }

    fn option(&self) -> &'static LanguageOption {
        let index = ALL.iter().position(|l| l == self).unwrap_or(ALL.len() - 1);
        &LANGUAGES[index]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
