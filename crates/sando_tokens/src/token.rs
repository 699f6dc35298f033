//! Resolved token model
//!
//! Tokens are produced fresh by a [`TokenEngine`](crate::engine::TokenEngine)
//! on every build and never mutated afterwards.

use std::path::PathBuf;

use serde_json::Value;

use crate::reference;

/// A single fully-resolved design token
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// Hierarchical path, never empty. `path[0]` is the category.
    pub path: Vec<String>,
    /// Resolved literal value
    pub value: Value,
    /// Raw source text, possibly containing `{a.b.value}` placeholders
    pub original_value: String,
    /// File the token was declared in
    pub source_file: PathBuf,
    /// Whether `source_file` was one of the layer's own sources (as opposed
    /// to an included dependency file)
    pub is_source: bool,
}

impl Token {
    /// Top-level category (`color`, `space`, `button`, ...)
    pub fn category(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or_default()
    }

    /// Dotted path as written inside placeholders
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }

    /// Whether the original value still carries placeholders, i.e. whether
    /// it differs from the resolved value.
    pub fn has_references(&self) -> bool {
        reference::contains_reference(&self.original_value)
    }

    /// Resolved value rendered as CSS text
    pub fn css_value(&self) -> String {
        value_to_css(&self.value)
    }
}

/// Render a resolved JSON value as CSS text.
///
/// Strings are emitted verbatim, numbers and booleans through their display
/// form, arrays are comma-joined (shadow stacks, font lists). Objects have no
/// CSS shape and fall back to compact JSON.
pub fn value_to_css(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(value_to_css)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// The flat list of resolved tokens an engine hands to the emitters,
/// in resolution order.
#[derive(Clone, Debug, Default)]
pub struct Dictionary {
    tokens: Vec<Token>,
}

impl Dictionary {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Every resolved token, dependencies included
    pub fn all_tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Only the tokens declared in the layer's own source files
    pub fn source_tokens(&self) -> Vec<Token> {
        self.tokens.iter().filter(|t| t.is_source).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Look a token up by its dotted path
    pub fn get(&self, dotted: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.dotted_path() == dotted)
    }
}

#[cfg(test)]
pub(crate) fn token(path: &str, value: Value, original: &str) -> Token {
    Token {
        path: path.split('.').map(str::to_string).collect(),
        value,
        original_value: original.to_string(),
        source_file: PathBuf::from("test.json"),
        is_source: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_is_first_segment() {
        let t = token("color.brand.700", json!("#123"), "#123");
        assert_eq!(t.category(), "color");
        assert_eq!(t.dotted_path(), "color.brand.700");
    }

    #[test]
    fn css_value_rendering() {
        assert_eq!(value_to_css(&json!("1rem")), "1rem");
        assert_eq!(value_to_css(&json!(400)), "400");
        assert_eq!(value_to_css(&json!(1.5)), "1.5");
        assert_eq!(value_to_css(&json!(["0 1px red", "0 2px blue"])), "0 1px red, 0 2px blue");
    }

    #[test]
    fn reference_detection_uses_original_value() {
        let plain = token("space.1", json!("4px"), "4px");
        let aliased = token("space.gap", json!("4px"), "{space.1.value}");
        assert!(!plain.has_references());
        assert!(aliased.has_references());
    }

    #[test]
    fn source_tokens_filter() {
        let mut included = token("color.a", json!("#000"), "#000");
        included.is_source = false;
        let own = token("color.b", json!("#fff"), "#fff");
        let dict = Dictionary::new(vec![included, own.clone()]);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.source_tokens(), vec![own]);
        assert!(dict.get("color.a").is_some());
    }
}
