//! Typed (TypeScript) module emission
//!
//! Each category becomes `<category>.ts` exporting one `as const` object and
//! a `typeof` alias of its shape; `index.ts` re-exports all of them.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::Result;
use crate::output::write_generated;
use crate::token::Token;
use crate::tree::{build_token_tree, categories, LeafStrategy};

const INDEX_FILE: &str = "index.ts";

/// `font-family` -> `fontFamily`
pub fn module_identifier(category: &str) -> String {
    let mut out = String::with_capacity(category.len());
    let mut upper_next = false;
    for c in category.chars() {
        if c == '-' || c == '_' || c == '.' || c == ' ' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    if out.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// `font-family` -> `FontFamilyTokens`
pub fn type_identifier(category: &str) -> String {
    let ident = module_identifier(category);
    let ident = ident.trim_start_matches('_');
    let mut chars = ident.chars();
    let mut out = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    if out.chars().next().map_or(false, |c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out.push_str("Tokens");
    out
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn quote(s: &str) -> String {
    // serde_json's escaping is a valid JS string literal.
    Value::String(s.to_string()).to_string()
}

fn write_value(value: &Value, depth: usize, out: &mut String) {
    match value {
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Object(map) => {
            out.push_str("{\n");
            let indent = "  ".repeat(depth + 1);
            for (key, child) in map {
                out.push_str(&indent);
                if is_identifier(key) {
                    out.push_str(key);
                } else {
                    out.push_str(&quote(key));
                }
                out.push_str(": ");
                write_value(child, depth + 1, out);
                out.push_str(",\n");
            }
            out.push_str(&"  ".repeat(depth));
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(item, depth, out);
            }
            out.push(']');
        }
        Value::String(s) => out.push_str(&quote(s)),
        other => out.push_str(&other.to_string()),
    }
}

/// Exported names of one category module
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleName {
    pub category: String,
    /// Name of the exported constant
    pub ident: String,
    /// Name of the exported type alias
    pub type_ident: String,
}

impl ModuleName {
    pub fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            ident: module_identifier(category),
            type_ident: type_identifier(category),
        }
    }
}

/// Names for every category, numbering identifiers that would otherwise
/// collide (`font-size` and `fontSize` both camel-case to `fontSize`).
pub fn module_names(categories: &[String]) -> Vec<ModuleName> {
    let mut taken: Vec<String> = Vec::with_capacity(categories.len());
    let mut names = Vec::with_capacity(categories.len());
    for category in categories {
        let mut name = ModuleName::new(category);
        if taken.contains(&name.ident) {
            let stem = name.type_ident.trim_end_matches("Tokens").to_string();
            let mut n = 2;
            while taken.contains(&format!("{}{n}", name.ident)) {
                n += 1;
            }
            tracing::warn!(
                "Category `{}` collides with another category on identifier `{}`; exporting it as `{}{}`",
                category,
                name.ident,
                name.ident,
                n
            );
            name.ident = format!("{}{n}", name.ident);
            name.type_ident = format!("{stem}{n}Tokens");
        }
        taken.push(name.ident.clone());
        names.push(name);
    }
    names
}

/// Module body for one category tree
pub fn render_module(name: &ModuleName, tree: &Value) -> String {
    let ident = &name.ident;
    let mut out = format!("export const {ident} = ");
    write_value(tree, 0, &mut out);
    out.push_str(" as const;\n\n");
    out.push_str(&format!(
        "export type {} = typeof {ident};\n",
        name.type_ident
    ));
    out
}

/// Barrel module re-exporting every category constant and type
pub fn render_index(names: &[ModuleName]) -> String {
    let mut out = String::new();
    for name in names {
        out.push_str(&format!(
            "export {{ {} }} from './{}';\n",
            name.ident, name.category
        ));
    }
    out.push('\n');
    for name in names {
        out.push_str(&format!(
            "export type {{ {} }} from './{}';\n",
            name.type_ident, name.category
        ));
    }
    out
}

/// Write one module per category plus the barrel into `dir`
pub fn write_typed_modules(
    dir: &Path,
    tokens: &[Token],
    strategy: LeafStrategy,
    prefix: &str,
    generated_at: &str,
) -> Result<Vec<PathBuf>> {
    let mut categories = categories(tokens);
    categories.sort();
    let names = module_names(&categories);

    let mut written = Vec::with_capacity(names.len() + 1);
    for name in &names {
        let tree = build_token_tree(tokens, Some(name.category.as_str()), |t| {
            strategy.leaf(t, prefix)
        });
        let path = dir.join(format!("{}.ts", name.category));
        written.push(write_generated(
            &path,
            generated_at,
            &render_module(name, &tree),
        )?);
    }

    if !names.is_empty() {
        written.push(write_generated(
            &dir.join(INDEX_FILE),
            generated_at,
            &render_index(&names),
        )?);
    }

    Ok(written)
}
