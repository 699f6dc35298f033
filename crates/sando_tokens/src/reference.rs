//! Placeholder scanning and reference rewriting
//!
//! Token values point at other tokens with `{dotted.path.value}`
//! placeholders. The scanner here is shared by the resolution engine (to find
//! what a value depends on) and by the emitters (to turn placeholders into
//! `var(--sando-...)` references or bare variable names).
//!
//! Text outside placeholders is always preserved verbatim, which keeps
//! composite values such as `clamp({a.value}, 5vw, {b.value})` intact.
//!
//! Malformed placeholders (an unclosed `{`, or a braced segment that does not
//! end in `.value`) are never rewritten. They pass through unchanged and are
//! reported with a `warn!` so a typo in a source file is at least visible in
//! the build log.

use crate::naming;

const VALUE_SUFFIX: &str = ".value";

/// One piece of a scanned value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Plain text, copied through as-is
    Literal(&'a str),
    /// A well-formed placeholder; holds the dotted path without the
    /// `.value` suffix
    Reference(&'a str),
    /// Brace text that looks like a placeholder attempt but is not one
    Malformed(&'a str),
}

impl Segment<'_> {
    /// Length of the source text this segment covers
    fn source_len(&self) -> usize {
        match self {
            Segment::Literal(s) | Segment::Malformed(s) => s.len(),
            Segment::Reference(path) => path.len() + VALUE_SUFFIX.len() + 2,
        }
    }
}

/// What a placeholder becomes on output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceTarget {
    /// `var(--prefix-a-b-c)` for stylesheets
    Css,
    /// `--prefix-a-b-c` for typed modules
    VarName,
}

/// Split a value into literal text, placeholders and malformed brace runs.
///
/// Concatenating the source text of every segment reproduces `input`.
pub fn scan(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(rel) = input[cursor..].find('{') {
        let open = cursor + rel;
        let body_start = open + 1;

        let Some(close_rel) = input[body_start..].find('}') else {
            // Unclosed brace: everything from here on is literal.
            push_literal(&mut segments, &input[literal_start..open]);
            segments.push(Segment::Malformed(&input[open..]));
            literal_start = input.len();
            break;
        };
        let close = body_start + close_rel;
        let body = &input[body_start..close];

        if let Some(nested) = body.find('{') {
            // `{{a.value}`: the first brace is stray, retry from the inner one.
            push_literal(&mut segments, &input[literal_start..open]);
            segments.push(Segment::Malformed(&input[open..body_start + nested]));
            literal_start = body_start + nested;
            cursor = literal_start;
            continue;
        }

        push_literal(&mut segments, &input[literal_start..open]);
        match body.strip_suffix(VALUE_SUFFIX) {
            Some(path) if !path.trim().is_empty() => segments.push(Segment::Reference(path)),
            _ => segments.push(Segment::Malformed(&input[open..=close])),
        }
        literal_start = close + 1;
        cursor = literal_start;
    }

    push_literal(&mut segments, &input[literal_start..]);
    debug_assert_eq!(
        segments.iter().map(Segment::source_len).sum::<usize>(),
        input.len()
    );
    segments
}

fn push_literal<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment::Literal(text));
    }
}

/// Dotted paths of every well-formed placeholder, left to right
pub fn references(input: &str) -> Vec<&str> {
    if !input.contains('{') {
        return Vec::new();
    }
    scan(input)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Reference(path) => Some(path),
            _ => None,
        })
        .collect()
}

/// Whether `input` contains at least one well-formed placeholder
pub fn contains_reference(input: &str) -> bool {
    input.contains(VALUE_SUFFIX)
        && scan(input)
            .iter()
            .any(|segment| matches!(segment, Segment::Reference(_)))
}

/// Rewrite every placeholder in `original` for the given target.
///
/// A value without placeholders is returned unchanged.
pub fn rewrite(original: &str, prefix: &str, target: ReferenceTarget) -> String {
    if !original.contains('{') {
        return original.to_string();
    }

    let mut out = String::with_capacity(original.len() + 16);
    for segment in scan(original) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Reference(path) => {
                let name = naming::var_name_for_dotted(prefix, path);
                match target {
                    ReferenceTarget::Css => out.push_str(&naming::var_reference(&name)),
                    ReferenceTarget::VarName => out.push_str(&name),
                }
            }
            Segment::Malformed(text) => {
                tracing::warn!(
                    "Malformed token reference `{}` in `{}` left unchanged",
                    text,
                    original
                );
                out.push_str(text);
            }
        }
    }
    out
}

/// Shorthand for [`rewrite`] with [`ReferenceTarget::Css`]
pub fn rewrite_css(original: &str, prefix: &str) -> String {
    rewrite(original, prefix, ReferenceTarget::Css)
}
