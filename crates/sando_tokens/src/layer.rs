//! Layer configuration and the per-layer build
//!
//! A layer is one token tier. Building it runs the resolution engine over
//! the layer's files, emits stylesheets and typed modules, and measures
//! what was written. Failures never propagate: they are recorded on the
//! returned [`BuildLayerResult`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::css::{CssEmitter, SelectorConfig};
use crate::discovery::FlavorDescriptor;
use crate::engine::TokenEngine;
use crate::error::{Result, TokenError};
use crate::modes::{ModeKind, ModeRegistry};
use crate::naming;
use crate::output::write_generated;
use crate::token::Token;
use crate::tree::LeafStrategy;
use crate::typed::write_typed_modules;

const CSS_DIR: &str = "css";
const TS_DIR: &str = "ts";
const LAYER_STYLESHEET: &str = "tokens.css";

/// Token tier, in dependency order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Raw values
    Primitives,
    /// Semantic references to primitives, with flavor and mode variants
    Theme,
    /// Component-level references to the theme
    Composite,
}

impl LayerKind {
    /// Leaf strategy for this tier's typed modules. Primitives expose their
    /// literal values; theme and composite values vary by flavor and mode,
    /// so they expose custom-property names instead.
    pub fn leaf_strategy(self) -> LeafStrategy {
        match self {
            Self::Primitives => LeafStrategy::Literal,
            Self::Theme | Self::Composite => LeafStrategy::NameReference,
        }
    }
}

/// Files a layer compiles
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayerSources {
    /// Compiled together into one `:root` stylesheet
    Files(Vec<PathBuf>),
    /// Compiled per (flavor, mode)
    Flavors(Vec<FlavorDescriptor>),
}

impl LayerSources {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Files(files) => files.is_empty(),
            Self::Flavors(flavors) => flavors.is_empty(),
        }
    }
}

/// Everything the engine needs to build one layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerConfig {
    pub name: String,
    pub kind: LayerKind,
    /// Directory fingerprinted by the incremental cache
    pub source_dir: PathBuf,
    /// Dependency files loaded before the layer's own sources
    pub include: Vec<PathBuf>,
    pub sources: LayerSources,
}

/// Settings shared by every layer of a build
#[derive(Clone, Debug)]
pub struct BuildContext {
    pub output_dir: PathBuf,
    pub prefix: String,
    pub selectors: SelectorConfig,
    pub modes: ModeRegistry,
    pub typed_modules: bool,
    /// Stamp written into every generated header
    pub generated_at: String,
}

impl BuildContext {
    pub fn new(output_dir: impl Into<PathBuf>, generated_at: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: naming::DEFAULT_PREFIX.to_string(),
            selectors: SelectorConfig::default(),
            modes: ModeRegistry::builtin(),
            typed_modules: true,
            generated_at: generated_at.into(),
        }
    }

    pub fn css_dir(&self, layer: &str) -> PathBuf {
        self.output_dir.join(CSS_DIR).join(layer)
    }

    pub fn ts_dir(&self, layer: &str) -> PathBuf {
        self.output_dir.join(TS_DIR).join(layer)
    }

    /// Directories a successful build of `layer` populates
    pub fn layer_output_dirs(&self, layer: &LayerConfig) -> Vec<PathBuf> {
        let mut dirs = vec![self.css_dir(&layer.name)];
        if self.typed_modules {
            dirs.push(self.ts_dir(&layer.name));
        }
        dirs
    }

    pub fn emitter(&self) -> CssEmitter {
        CssEmitter::new(self.prefix.clone(), self.selectors.clone())
    }
}

/// One generated file and its size on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputFile {
    pub file: PathBuf,
    pub size_bytes: u64,
}

/// Outcome of building a single layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildLayerResult {
    pub layer_name: String,
    pub success: bool,
    /// The layer was up to date and not rebuilt
    pub skipped: bool,
    pub file_count: usize,
    pub files: Vec<OutputFile>,
    pub total_size_bytes: u64,
    pub duration_ms: u64,
    pub error_message: Option<String>,
}

impl BuildLayerResult {
    fn succeeded(layer_name: &str, files: Vec<OutputFile>, duration_ms: u64) -> Self {
        Self {
            layer_name: layer_name.to_string(),
            success: true,
            skipped: false,
            file_count: files.len(),
            total_size_bytes: files.iter().map(|f| f.size_bytes).sum(),
            files,
            duration_ms,
            error_message: None,
        }
    }

    fn failed(layer_name: &str, error: &TokenError, duration_ms: u64) -> Self {
        Self {
            layer_name: layer_name.to_string(),
            success: false,
            skipped: false,
            file_count: 0,
            files: Vec::new(),
            total_size_bytes: 0,
            duration_ms,
            error_message: Some(error.to_string()),
        }
    }

    /// Result for a layer the cache reported as up to date
    pub fn up_to_date(layer_name: &str) -> Self {
        Self {
            layer_name: layer_name.to_string(),
            success: true,
            skipped: true,
            file_count: 0,
            files: Vec::new(),
            total_size_bytes: 0,
            duration_ms: 0,
            error_message: None,
        }
    }
}

/// Build one layer, recording (never propagating) any failure
pub fn build_layer(
    engine: &dyn TokenEngine,
    layer: &LayerConfig,
    ctx: &BuildContext,
) -> BuildLayerResult {
    let started = Instant::now();
    tracing::info!("Building layer `{}`", layer.name);

    let outcome = emit_layer(engine, layer, ctx).and_then(|paths| measure(&paths));
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match outcome {
        Ok(files) => {
            let result = BuildLayerResult::succeeded(&layer.name, files, duration_ms);
            tracing::info!(
                "Layer `{}` built: {} files, {} bytes in {} ms",
                layer.name,
                result.file_count,
                result.total_size_bytes,
                duration_ms
            );
            result
        }
        Err(e) => {
            tracing::error!("Layer `{}` failed: {}", layer.name, e);
            BuildLayerResult::failed(&layer.name, &e, duration_ms)
        }
    }
}

fn measure(paths: &[PathBuf]) -> Result<Vec<OutputFile>> {
    paths
        .iter()
        .map(|path| {
            let meta = fs::metadata(path).map_err(|e| TokenError::io(path, e))?;
            Ok(OutputFile {
                file: path.clone(),
                size_bytes: meta.len(),
            })
        })
        .collect()
}

fn emit_layer(
    engine: &dyn TokenEngine,
    layer: &LayerConfig,
    ctx: &BuildContext,
) -> Result<Vec<PathBuf>> {
    clear_outputs(layer, ctx)?;
    if layer.sources.is_empty() {
        tracing::warn!("Layer `{}` has no source files", layer.name);
        return Ok(Vec::new());
    }

    match &layer.sources {
        LayerSources::Files(files) => emit_single(engine, layer, files, ctx),
        LayerSources::Flavors(flavors) => emit_flavors(engine, layer, flavors, ctx),
    }
}

/// Remove everything a previous build wrote for `layer`, so files for
/// removed flavors, modes or categories do not linger
fn clear_outputs(layer: &LayerConfig, ctx: &BuildContext) -> Result<()> {
    for dir in [ctx.css_dir(&layer.name), ctx.ts_dir(&layer.name)] {
        if dir.exists() {
            tracing::debug!("Clearing {}", dir.display());
            fs::remove_dir_all(&dir).map_err(|e| TokenError::io(&dir, e))?;
        }
    }
    Ok(())
}

fn emit_single(
    engine: &dyn TokenEngine,
    layer: &LayerConfig,
    files: &[PathBuf],
    ctx: &BuildContext,
) -> Result<Vec<PathBuf>> {
    let dictionary = engine.resolve(&layer.include, files)?;
    let tokens = dictionary.source_tokens();

    let css = ctx.emitter().root_stylesheet(&tokens);
    let mut written = vec![write_generated(
        &ctx.css_dir(&layer.name).join(LAYER_STYLESHEET),
        &ctx.generated_at,
        &css,
    )?];

    written.extend(emit_typed(layer, &tokens, ctx)?);
    Ok(written)
}

fn emit_flavors(
    engine: &dyn TokenEngine,
    layer: &LayerConfig,
    flavors: &[FlavorDescriptor],
    ctx: &BuildContext,
) -> Result<Vec<PathBuf>> {
    let emitter = ctx.emitter();
    let mut written = Vec::new();
    let mut typed_source: Option<Vec<Token>> = None;

    for flavor in flavors {
        let flavor_dir = ctx.css_dir(&layer.name).join(&flavor.name);

        let base = engine
            .resolve(&layer.include, std::slice::from_ref(&flavor.base_file))?
            .source_tokens();
        written.push(write_flavor_file(
            &flavor_dir.join("flavor.css"),
            &emitter,
            &flavor.name,
            &ModeKind::Base,
            &base,
            ctx,
        )?);

        let mut mode_include = layer.include.clone();
        mode_include.push(flavor.base_file.clone());
        for (mode, file) in &flavor.mode_files {
            let kind = ctx.modes.resolve(Some(mode));
            let tokens = engine
                .resolve(&mode_include, std::slice::from_ref(file))?
                .source_tokens();
            written.push(write_flavor_file(
                &flavor_dir.join(format!("flavor-{mode}.css")),
                &emitter,
                &flavor.name,
                &kind,
                &tokens,
                ctx,
            )?);
        }

        if ctx.selectors.is_default_flavor(&flavor.name) {
            typed_source = Some(base);
        }
    }

    match typed_source {
        Some(tokens) => written.extend(emit_typed(layer, &tokens, ctx)?),
        None if ctx.typed_modules => tracing::warn!(
            "Default flavor `{}` not found; skipping typed modules for `{}`",
            ctx.selectors.default_flavor,
            layer.name
        ),
        None => {}
    }

    Ok(written)
}

fn write_flavor_file(
    path: &Path,
    emitter: &CssEmitter,
    flavor: &str,
    mode: &ModeKind,
    tokens: &[Token],
    ctx: &BuildContext,
) -> Result<PathBuf> {
    let css = emitter.flavor_stylesheet(flavor, mode, tokens);
    write_generated(path, &ctx.generated_at, &css)
}

fn emit_typed(layer: &LayerConfig, tokens: &[Token], ctx: &BuildContext) -> Result<Vec<PathBuf>> {
    if !ctx.typed_modules {
        return Ok(Vec::new());
    }
    write_typed_modules(
        &ctx.ts_dir(&layer.name),
        tokens,
        layer.kind.leaf_strategy(),
        &ctx.prefix,
        &ctx.generated_at,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::JsonEngine;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn write_json(path: &Path, value: serde_json::Value) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    #[test]
    fn primitives_layer_writes_stylesheet_and_modules() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("tokens/ingredients/color.json");
        write_json(
            &source,
            json!({ "color": { "white": { "value": "#fff" } }, "space": { "1": { "value": "4px" } } }),
        );

        let layer = LayerConfig {
            name: "ingredients".to_string(),
            kind: LayerKind::Primitives,
            source_dir: dir.path().join("tokens/ingredients"),
            include: Vec::new(),
            sources: LayerSources::Files(vec![source]),
        };
        let ctx = BuildContext::new(dir.path().join("dist"), "stamp");

        let result = build_layer(&JsonEngine, &layer, &ctx);
        assert!(result.success, "{:?}", result.error_message);
        assert_eq!(result.file_count, 4);
        assert_eq!(
            result.total_size_bytes,
            result.files.iter().map(|f| f.size_bytes).sum::<u64>()
        );

        let css = fs::read_to_string(ctx.css_dir("ingredients").join("tokens.css")).unwrap();
        assert!(css.contains("--sando-color-white: #fff;"));
        let ts = fs::read_to_string(ctx.ts_dir("ingredients").join("space.ts")).unwrap();
        assert!(ts.contains("\"1\": \"4px\","));
    }

    #[test]
    fn theme_layer_writes_one_file_per_mode() {
        let dir = TempDir::new().unwrap();
        let palette = dir.path().join("tokens/ingredients/palette.json");
        write_json(
            &palette,
            json!({ "palette": { "white": { "value": "#fff" }, "black": { "value": "#000" } } }),
        );
        let base = dir.path().join("tokens/flavors/original/flavor.json");
        write_json(
            &base,
            json!({ "color": { "bg": { "value": "{palette.white.value}" } } }),
        );
        let dark = dir.path().join("tokens/flavors/original/flavor-dark.json");
        write_json(
            &dark,
            json!({ "color": { "bg": { "value": "{palette.black.value}" } } }),
        );

        let layer = LayerConfig {
            name: "flavors".to_string(),
            kind: LayerKind::Theme,
            source_dir: dir.path().join("tokens/flavors"),
            include: vec![palette],
            sources: LayerSources::Flavors(vec![FlavorDescriptor {
                name: "original".to_string(),
                base_file: base,
                mode_files: BTreeMap::from([("dark".to_string(), dark)]),
            }]),
        };
        let ctx = BuildContext::new(dir.path().join("dist"), "stamp");

        let result = build_layer(&JsonEngine, &layer, &ctx);
        assert!(result.success, "{:?}", result.error_message);

        let flavor_dir = ctx.css_dir("flavors").join("original");
        let base_css = fs::read_to_string(flavor_dir.join("flavor.css")).unwrap();
        assert!(base_css.contains("--sando-color-bg: var(--sando-palette-white);"));
        assert!(!base_css.contains("--sando-palette-white:"));

        let dark_css = fs::read_to_string(flavor_dir.join("flavor-dark.css")).unwrap();
        assert!(dark_css.contains("@media (prefers-color-scheme: dark)"));
        assert!(dark_css.contains("[flavor=\"original\"][flavor-mode=\"dark\"]"));
        assert_eq!(
            dark_css
                .matches("--sando-color-bg: var(--sando-palette-black);")
                .count(),
            2
        );

        let ts = fs::read_to_string(ctx.ts_dir("flavors").join("color.ts")).unwrap();
        assert!(ts.contains("bg: \"--sando-color-bg\","));
    }

    #[test]
    fn rebuild_drops_outputs_of_removed_sources() {
        let dir = TempDir::new().unwrap();
        let color = dir.path().join("tokens/ingredients/color.json");
        let space = dir.path().join("tokens/ingredients/space.json");
        write_json(&color, json!({ "color": { "white": { "value": "#fff" } } }));
        write_json(&space, json!({ "space": { "1": { "value": "4px" } } }));

        let mut layer = LayerConfig {
            name: "ingredients".to_string(),
            kind: LayerKind::Primitives,
            source_dir: dir.path().join("tokens/ingredients"),
            include: Vec::new(),
            sources: LayerSources::Files(vec![color.clone(), space.clone()]),
        };
        let ctx = BuildContext::new(dir.path().join("dist"), "stamp");
        assert!(build_layer(&JsonEngine, &layer, &ctx).success);
        assert!(ctx.ts_dir("ingredients").join("space.ts").is_file());

        fs::remove_file(&space).unwrap();
        layer.sources = LayerSources::Files(vec![color]);
        let result = build_layer(&JsonEngine, &layer, &ctx);
        assert!(result.success, "{:?}", result.error_message);

        assert!(!ctx.ts_dir("ingredients").join("space.ts").exists());
        assert!(ctx.ts_dir("ingredients").join("color.ts").is_file());
        let index = fs::read_to_string(ctx.ts_dir("ingredients").join("index.ts")).unwrap();
        assert!(!index.contains("space"));
    }

    #[test]
    fn engine_errors_become_failed_results() {
        let dir = TempDir::new().unwrap();
        let layer = LayerConfig {
            name: "recipes".to_string(),
            kind: LayerKind::Composite,
            source_dir: dir.path().to_path_buf(),
            include: Vec::new(),
            sources: LayerSources::Files(vec![dir.path().join("missing.json")]),
        };
        let ctx = BuildContext::new(dir.path().join("dist"), "stamp");

        let result = build_layer(&JsonEngine, &layer, &ctx);
        assert!(!result.success);
        assert_eq!(result.file_count, 0);
        assert!(result.error_message.unwrap().contains("missing.json"));
    }

    #[test]
    fn output_dirs_follow_typed_module_setting() {
        let mut ctx = BuildContext::new("dist", "stamp");
        let layer = LayerConfig {
            name: "recipes".to_string(),
            kind: LayerKind::Composite,
            source_dir: PathBuf::from("tokens/recipes"),
            include: Vec::new(),
            sources: LayerSources::Files(Vec::new()),
        };
        assert_eq!(ctx.layer_output_dirs(&layer).len(), 2);
        ctx.typed_modules = false;
        assert_eq!(
            ctx.layer_output_dirs(&layer),
            vec![PathBuf::from("dist/css/recipes")]
        );
    }
}
