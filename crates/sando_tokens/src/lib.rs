//! Sando Token Pipeline
//!
//! Compiles a three-layer design-token model into CSS custom-property
//! stylesheets and typed TypeScript modules.
//!
//! # Overview
//!
//! - **Ingredients**: primitive values (palette, spacing, type scale)
//! - **Flavors**: semantic theme tokens referencing ingredients, one set per
//!   flavor with optional per-mode overrides (dark, high-contrast, ...)
//! - **Recipes**: component tokens referencing the default flavor
//!
//! Layers build in that order. Each build resolves its JSON sources through
//! a [`TokenEngine`], emits stylesheets through the [`CssEmitter`] and typed
//! modules through the tree builder, and is skipped when the
//! [`CacheStore`] says its sources are unchanged.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sando_tokens::{discover_layers, BuildContext, FileCacheStore, JsonEngine, Orchestrator};
//!
//! let layers = discover_layers("tokens".as_ref(), "original")?;
//! let ctx = BuildContext::new("dist", "2024-01-01T00:00:00Z");
//! let mut cache = FileCacheStore::load(".sando-cache.json");
//!
//! let report = Orchestrator::new(&JsonEngine, &mut cache, &ctx).run(&layers);
//! println!("{}", report.summary());
//! ```
//!
//! # Modes
//!
//! Mode files (`flavor-<mode>.json`) map onto a closed set of [`ModeKind`]s:
//!
//! - `Base`: plain flavor rule
//! - `AutoOnly`: `@media` block only (forced-colors)
//! - `AutoPlusManual`: `@media` block plus a `flavor-mode` attribute block (dark)
//! - `ManualOnly`: attribute block only (light)
//! - `Motion`: reduced-motion `@media` block, never manual

pub mod cache;
pub mod css;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod layer;
pub mod metrics;
pub mod modes;
pub mod naming;
pub mod orchestrator;
pub mod output;
pub mod reference;
pub mod token;
pub mod tree;
pub mod typed;

// Re-export commonly used types
pub use cache::{
    fingerprint, needs_rebuild, CacheEntry, CacheStore, FileCacheStore, MemoryCacheStore,
    RebuildDecision, RebuildReason,
};
pub use css::{BlockKind, CssBlock, CssEmitter, SelectorConfig};
pub use discovery::{discover_layers, FlavorDescriptor, DEFAULT_FLAVOR};
pub use engine::{JsonEngine, TokenEngine};
pub use error::{CacheError, Result, TokenError};
pub use layer::{
    build_layer, BuildContext, BuildLayerResult, LayerConfig, LayerKind, LayerSources, OutputFile,
};
pub use modes::{BuiltinMode, ModeConfig, ModeKind, ModeRegistry, ModeType};
pub use naming::{var_name, DEFAULT_PREFIX};
pub use orchestrator::{BuildOptions, BuildReport, Orchestrator};
pub use reference::{rewrite, rewrite_css, ReferenceTarget};
pub use token::{Dictionary, Token};
pub use tree::{build_token_tree, LeafStrategy};
