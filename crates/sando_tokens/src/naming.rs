//! Token path to custom-property name mapping

/// Prefix every generated custom property carries
pub const DEFAULT_PREFIX: &str = "sando";

/// Synthesize the public variable name for a token path:
/// `--{prefix}-{path.join('-')}`.
///
/// Path segments are joined verbatim, so casing inside a segment
/// (`backgroundColor`) is preserved.
pub fn var_name<S: AsRef<str>>(prefix: &str, path: &[S]) -> String {
    let mut name = String::with_capacity(
        prefix.len() + 3 + path.iter().map(|s| s.as_ref().len() + 1).sum::<usize>(),
    );
    name.push_str("--");
    name.push_str(prefix);
    for segment in path {
        name.push('-');
        name.push_str(segment.as_ref());
    }
    name
}

/// Variable name for a dotted path as it appears inside a placeholder
/// (`color.brand.700` -> `--sando-color-brand-700`).
pub fn var_name_for_dotted(prefix: &str, dotted: &str) -> String {
    format!("--{}-{}", prefix, dotted.replace('.', "-"))
}

/// `var(...)` reference to a synthesized name
pub fn var_reference(name: &str) -> String {
    format!("var({name})")
}
