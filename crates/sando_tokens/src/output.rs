//! Generated-file header and writing

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TokenError};

/// Machine-readable banner every generated file starts with. Valid in both
/// CSS and TypeScript.
pub fn generated_header(generated_at: &str) -> String {
    format!(
        "/**\n * Do not edit directly, this file was auto-generated by sando.\n * Generated on {generated_at}\n */\n"
    )
}

/// Prepend the header and write, creating parent directories.
pub fn write_generated(path: &Path, generated_at: &str, body: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TokenError::io(parent, e))?;
    }

    let mut contents = generated_header(generated_at);
    contents.push('\n');
    contents.push_str(body);
    if !contents.ends_with('\n') {
        contents.push('\n');
    }

    fs::write(path, contents).map_err(|e| TokenError::io(path, e))?;
    tracing::debug!("Wrote {}", path.display());
    Ok(path.to_path_buf())
}
