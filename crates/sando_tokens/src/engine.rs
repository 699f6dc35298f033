//! Token resolution engine
//!
//! The pipeline consumes an engine's output contract (a flat, resolved
//! [`Dictionary`]) through the [`TokenEngine`] trait. [`JsonEngine`] is the
//! built-in implementation for style-dictionary shaped JSON documents:
//!
//! ```json
//! { "color": { "brand": { "700": { "value": "#1d4ed8" } } },
//!   "action": { "value": "{color.brand.700.value}" } }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::error::{Result, TokenError};
use crate::reference::{self, Segment};
use crate::token::{value_to_css, Dictionary, Token};

/// Resolves a set of token source files into a flat dictionary
pub trait TokenEngine {
    /// Load `include` (dependency files) then `sources` (the layer's own
    /// files), resolve every placeholder and return all tokens in
    /// resolution order. Tokens from `sources` are flagged `is_source`.
    fn resolve(&self, include: &[PathBuf], sources: &[PathBuf]) -> Result<Dictionary>;
}

/// Built-in engine for JSON token documents
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonEngine;

impl JsonEngine {
    pub fn new() -> Self {
        Self
    }
}

/// A leaf before resolution
#[derive(Debug)]
struct RawToken {
    path: Vec<String>,
    value: Value,
    source_file: PathBuf,
    is_source: bool,
}

impl TokenEngine for JsonEngine {
    fn resolve(&self, include: &[PathBuf], sources: &[PathBuf]) -> Result<Dictionary> {
        let mut raw: IndexMap<String, RawToken> = IndexMap::new();

        let files = include
            .iter()
            .map(|f| (f, false))
            .chain(sources.iter().map(|f| (f, true)));
        for (file, is_source) in files {
            let document = read_document(file)?;
            let Value::Object(root) = document else {
                return Err(TokenError::InvalidToken {
                    path: file.clone(),
                    message: "top level must be an object".to_string(),
                });
            };
            collect_leaves(&root, &mut Vec::new(), file, is_source, &mut raw)?;
        }

        let mut resolver = Resolver {
            raw: &raw,
            resolved: FxHashMap::default(),
            stack: Vec::new(),
        };

        let mut tokens = Vec::with_capacity(raw.len());
        for (key, entry) in &raw {
            let value = resolver.resolve_path(key, key)?;
            tokens.push(Token {
                path: entry.path.clone(),
                value,
                original_value: original_text(&entry.value),
                source_file: entry.source_file.clone(),
                is_source: entry.is_source,
            });
        }

        tracing::debug!(
            "Resolved {} tokens from {} files",
            tokens.len(),
            include.len() + sources.len()
        );
        Ok(Dictionary::new(tokens))
    }
}

fn read_document(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| TokenError::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| TokenError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Walk a token document, registering every `{ "value": ... }` leaf.
///
/// Later files override earlier leaves in place, so a token keeps the
/// position it was first declared at.
fn collect_leaves(
    node: &Map<String, Value>,
    path: &mut Vec<String>,
    file: &Path,
    is_source: bool,
    out: &mut IndexMap<String, RawToken>,
) -> Result<()> {
    for (key, child) in node {
        if key.starts_with('$') {
            continue;
        }
        path.push(key.clone());
        match child {
            Value::Object(map) if map.contains_key("value") => {
                let dotted = path.join(".");
                out.insert(
                    dotted,
                    RawToken {
                        path: path.clone(),
                        value: map["value"].clone(),
                        source_file: file.to_path_buf(),
                        is_source,
                    },
                );
            }
            Value::Object(map) => collect_leaves(map, path, file, is_source, out)?,
            _ => {
                return Err(TokenError::InvalidToken {
                    path: file.to_path_buf(),
                    message: format!(
                        "`{}` is neither a token nor a group of tokens",
                        path.join(".")
                    ),
                });
            }
        }
        path.pop();
    }
    Ok(())
}

/// Source text of a raw value. Arrays mirror how the CSS emitter joins them
/// so placeholders inside list values can be rewritten in place.
fn original_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(original_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
        other => value_to_css(other),
    }
}

struct Resolver<'a> {
    raw: &'a IndexMap<String, RawToken>,
    resolved: FxHashMap<String, Value>,
    /// Dotted paths currently being resolved, for cycle reporting
    stack: Vec<String>,
}

impl Resolver<'_> {
    fn resolve_path(&mut self, owner: &str, dotted: &str) -> Result<Value> {
        if let Some(value) = self.resolved.get(dotted) {
            return Ok(value.clone());
        }

        if let Some(pos) = self.stack.iter().position(|p| p == dotted) {
            let mut chain = self.stack[pos..].to_vec();
            chain.push(dotted.to_string());
            return Err(TokenError::CircularReference {
                chain: chain.join(" -> "),
            });
        }

        let raw = self.raw;
        let entry = raw
            .get(dotted)
            .ok_or_else(|| TokenError::UnresolvedReference {
                token: owner.to_string(),
                reference: dotted.to_string(),
            })?;

        self.stack.push(dotted.to_string());
        let value = self.resolve_value(dotted, &entry.value)?;
        self.stack.pop();

        self.resolved.insert(dotted.to_string(), value.clone());
        Ok(value)
    }

    fn resolve_value(&mut self, owner: &str, value: &Value) -> Result<Value> {
        match value {
            Value::String(s) => self.resolve_string(owner, s),
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(owner, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), self.resolve_value(owner, v)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }

    fn resolve_string(&mut self, owner: &str, text: &str) -> Result<Value> {
        if !reference::contains_reference(text) {
            return Ok(Value::String(text.to_string()));
        }

        let segments = reference::scan(text);
        // A lone placeholder takes the target's value as-is, keeping numbers numeric.
        if let [Segment::Reference(path)] = segments.as_slice() {
            return self.resolve_path(owner, path);
        }

        let mut out = String::with_capacity(text.len());
        for segment in segments {
            match segment {
                Segment::Literal(t) | Segment::Malformed(t) => out.push_str(t),
                Segment::Reference(path) => {
                    let value = self.resolve_path(owner, path)?;
                    out.push_str(&value_to_css(&value));
                }
            }
        }
        Ok(Value::String(out))
    }
}
