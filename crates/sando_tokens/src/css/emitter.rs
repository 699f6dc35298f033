//! Custom-property stylesheet emission

use std::collections::BTreeMap;

use crate::css::selector::SelectorConfig;
use crate::modes::ModeKind;
use crate::naming;
use crate::reference;
use crate::token::Token;

const INDENT: &str = "  ";

/// What a rendered block is, so callers can reason about a stylesheet
/// without re-parsing it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// Plain rule on the flavor (or root) selectors
    Rule,
    /// Rule wrapped in an `@media` query
    Media,
    /// Rule on the manual mode-attribute selectors
    Manual,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CssBlock {
    pub kind: BlockKind,
    pub text: String,
}

/// Tokens grouped by category; `BTreeMap` keeps categories alphabetical
/// while each group keeps resolution order.
pub fn group_by_category(tokens: &[Token]) -> BTreeMap<&str, Vec<&Token>> {
    let mut groups: BTreeMap<&str, Vec<&Token>> = BTreeMap::new();
    for token in tokens {
        groups.entry(token.category()).or_default().push(token);
    }
    groups
}

/// Emits custom-property rules for a fixed prefix and selector scheme
#[derive(Clone, Debug)]
pub struct CssEmitter {
    prefix: String,
    selectors: SelectorConfig,
}

impl Default for CssEmitter {
    fn default() -> Self {
        Self::new(naming::DEFAULT_PREFIX, SelectorConfig::default())
    }
}

impl CssEmitter {
    pub fn new(prefix: impl Into<String>, selectors: SelectorConfig) -> Self {
        Self {
            prefix: prefix.into(),
            selectors,
        }
    }

    pub fn selectors(&self) -> &SelectorConfig {
        &self.selectors
    }

    /// Right-hand side of a declaration. Tokens that still carry
    /// placeholders reference their targets through `var()`; everything else
    /// is the resolved literal.
    pub fn declaration_value(&self, token: &Token) -> String {
        if token.has_references() {
            reference::rewrite_css(&token.original_value, &self.prefix)
        } else {
            token.css_value()
        }
    }

    pub fn declaration(&self, token: &Token) -> String {
        format!(
            "{}: {};",
            naming::var_name(&self.prefix, &token.path),
            self.declaration_value(token)
        )
    }

    /// Declarations grouped by category, each group headed by a comment
    fn body(&self, tokens: &[Token], depth: usize) -> String {
        let indent = INDENT.repeat(depth);
        let mut out = String::new();
        for (i, (category, group)) in group_by_category(tokens).into_iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("{indent}/* {category} */\n"));
            for token in group {
                out.push_str(&indent);
                out.push_str(&self.declaration(token));
                out.push('\n');
            }
        }
        out
    }

    fn rule(&self, selectors: &[String], tokens: &[Token], depth: usize) -> String {
        let indent = INDENT.repeat(depth);
        let selector_list = selectors
            .iter()
            .map(|s| format!("{indent}{s}"))
            .collect::<Vec<_>>()
            .join(",\n");
        format!(
            "{selector_list} {{\n{}{indent}}}",
            self.body(tokens, depth + 1)
        )
    }

    fn media(&self, query: &str, selectors: &[String], tokens: &[Token]) -> String {
        format!(
            "@media ({query}) {{\n{}\n}}",
            self.rule(selectors, tokens, 1)
        )
    }

    /// Single root rule, used by the primitives and composite layers
    pub fn root_stylesheet(&self, tokens: &[Token]) -> String {
        self.rule(std::slice::from_ref(&self.selectors.root), tokens, 0)
    }

    /// Blocks for one (flavor, mode) pair.
    ///
    /// | kind             | blocks                  |
    /// |------------------|-------------------------|
    /// | `Base`           | rule                    |
    /// | `AutoOnly`       | media                   |
    /// | `AutoPlusManual` | media, manual           |
    /// | `ManualOnly`     | manual                  |
    /// | `Motion`         | media                   |
    pub fn flavor_blocks(&self, flavor: &str, mode: &ModeKind, tokens: &[Token]) -> Vec<CssBlock> {
        let flavor_selectors = self.selectors.flavor_selectors(flavor);
        let media = |query: &str| CssBlock {
            kind: BlockKind::Media,
            text: self.media(query, &flavor_selectors, tokens),
        };
        let manual = |attribute: &str| CssBlock {
            kind: BlockKind::Manual,
            text: self.rule(
                &self.selectors.manual_selectors(flavor, attribute),
                tokens,
                0,
            ),
        };

        match mode {
            ModeKind::Base => vec![CssBlock {
                kind: BlockKind::Rule,
                text: self.rule(&flavor_selectors, tokens, 0),
            }],
            ModeKind::AutoOnly { media_query } | ModeKind::Motion { media_query } => {
                vec![media(media_query.as_str())]
            }
            ModeKind::AutoPlusManual {
                media_query,
                attribute,
            } => vec![media(media_query.as_str()), manual(attribute.as_str())],
            ModeKind::ManualOnly { attribute } => vec![manual(attribute.as_str())],
        }
    }

    /// Complete stylesheet text for one (flavor, mode) pair, without header
    pub fn flavor_stylesheet(&self, flavor: &str, mode: &ModeKind, tokens: &[Token]) -> String {
        self.flavor_blocks(flavor, mode, tokens)
            .into_iter()
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
