//! Flat token list to nested key-path tree

use serde_json::{Map, Value};

use crate::naming;
use crate::token::Token;

/// How a tree leaf is derived from its token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafStrategy {
    /// The resolved value as-is; numbers stay numbers
    Literal,
    /// The token's synthesized custom-property name, always a string
    NameReference,
}

impl LeafStrategy {
    pub fn leaf(self, token: &Token, prefix: &str) -> Value {
        match self {
            Self::Literal => token.value.clone(),
            Self::NameReference => Value::String(naming::var_name(prefix, &token.path)),
        }
    }
}

/// Build a nested object from `tokens`.
///
/// With a `category` filter only tokens whose first path segment equals it
/// are kept, and that segment is dropped from their key path. `leaf` maps a
/// token to the value stored at its leaf.
pub fn build_token_tree<F>(tokens: &[Token], category: Option<&str>, leaf: F) -> Value
where
    F: Fn(&Token) -> Value,
{
    let mut root = Map::new();

    'tokens: for token in tokens {
        let segments: &[String] = match category {
            Some(category) if token.category() != category => continue,
            Some(_) => &token.path[1..],
            None => &token.path,
        };

        let Some((last, parents)) = segments.split_last() else {
            tracing::warn!(
                "Token `{}` is a bare category and has no key below it; skipping",
                token.dotted_path()
            );
            continue;
        };

        let mut node = &mut root;
        for segment in parents {
            let child = node
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                tracing::warn!(
                    "Token group `{}` collides with a token value; the group wins",
                    token.dotted_path()
                );
                *child = Value::Object(Map::new());
            }
            let Some(map) = child.as_object_mut() else {
                continue 'tokens;
            };
            node = map;
        }
        if node.get(last).is_some_and(Value::is_object) {
            tracing::warn!(
                "Token `{}` collides with a token group; the group wins",
                token.dotted_path()
            );
            continue;
        }
        node.insert(last.clone(), leaf(token));
    }

    Value::Object(root)
}

/// Distinct categories in first-seen order
pub fn categories(tokens: &[Token]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in tokens {
        if !out.iter().any(|c| c == token.category()) {
            out.push(token.category().to_string());
        }
    }
    out
}
