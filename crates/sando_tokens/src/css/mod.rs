//! CSS custom-property output
//!
//! [`selector`] builds the flavor and manual-mode selectors, [`emitter`]
//! turns resolved tokens into rule blocks on those selectors.

pub mod emitter;
pub mod selector;

pub use emitter::{group_by_category, BlockKind, CssBlock, CssEmitter};
pub use selector::SelectorConfig;
