//! Sando configuration file handling

use anyhow::{Context, Result};
use sando_tokens::{BuildContext, ModeConfig, ModeRegistry, SelectorConfig, DEFAULT_PREFIX};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "sando.toml";

/// Top-level Sando configuration (sando.toml)
#[derive(Debug, Deserialize, Serialize)]
pub struct SandoConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    /// Overrides of, or additions to, the built-in modes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modes: Vec<ModeConfig>,
    /// Directory relative paths resolve against
    #[serde(skip)]
    pub root: PathBuf,
}

/// Project metadata
#[derive(Debug, Deserialize, Serialize)]
pub struct ProjectConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_name() -> String {
    "design-tokens".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: None,
        }
    }
}

/// Build configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Directory holding ingredients/, flavors/ and recipes/
    #[serde(default = "default_tokens_dir")]
    pub tokens_dir: String,
    /// Output directory; css/ and ts/ are created below it
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Incremental build cache
    #[serde(default = "default_cache_file")]
    pub cache_file: String,
    /// Prefix of every generated custom property
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Emit TypeScript modules next to the stylesheets
    #[serde(default = "default_true")]
    pub typed_modules: bool,
}

fn default_tokens_dir() -> String {
    "tokens".to_string()
}

fn default_output_dir() -> String {
    "dist".to_string()
}

fn default_cache_file() -> String {
    ".sando-cache.json".to_string()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tokens_dir: default_tokens_dir(),
            output_dir: default_output_dir(),
            cache_file: default_cache_file(),
            prefix: default_prefix(),
            typed_modules: true,
        }
    }
}

impl SandoConfig {
    /// Load configuration from a directory (looks for sando.toml) or a file
    pub fn load_from_dir(path: &Path) -> Result<Self> {
        let config_path = if path.is_file() {
            path.to_path_buf()
        } else {
            path.join(CONFIG_FILE)
        };

        if !config_path.exists() {
            anyhow::bail!(
                "No {} found in {}. Run `sando init` to create one.",
                CONFIG_FILE,
                path.display()
            );
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let mut config: SandoConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        config.root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        tracing::debug!("Loaded {}", config_path.display());
        Ok(config)
    }

    /// Create a new configuration with the given project name
    pub fn new(name: &str) -> Self {
        Self {
            project: ProjectConfig {
                name: name.to_string(),
                description: None,
            },
            build: BuildConfig::default(),
            selectors: SelectorConfig::default(),
            modes: Vec::new(),
            root: PathBuf::new(),
        }
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    pub fn tokens_dir(&self) -> PathBuf {
        self.resolve(&self.build.tokens_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.build.output_dir)
    }

    pub fn cache_file(&self) -> PathBuf {
        self.resolve(&self.build.cache_file)
    }

    /// The output directory, if deleting it cannot take the project with it.
    /// Refuses an output directory that is the project root, or that holds
    /// the token sources or this configuration file.
    pub fn removable_output_dir(&self) -> Result<PathBuf> {
        let output = absolute(&self.output_dir());
        let root = absolute(&self.root);
        let tokens = absolute(&self.tokens_dir());
        let config = root.join(CONFIG_FILE);

        if output == root || root.starts_with(&output) {
            anyhow::bail!(
                "Refusing to remove {}: it contains the project root",
                output.display()
            );
        }
        if tokens.starts_with(&output) || config.starts_with(&output) {
            anyhow::bail!(
                "Refusing to remove {}: it contains token sources or {}",
                output.display(),
                CONFIG_FILE
            );
        }
        Ok(self.output_dir())
    }

    /// Built-in modes with this project's overrides applied
    pub fn mode_registry(&self) -> ModeRegistry {
        ModeRegistry::builtin().with_overrides(self.modes.iter().cloned())
    }

    pub fn build_context(&self, generated_at: impl Into<String>) -> BuildContext {
        BuildContext {
            output_dir: self.output_dir(),
            prefix: self.build.prefix.clone(),
            selectors: self.selectors.clone(),
            modes: self.mode_registry(),
            typed_modules: self.build.typed_modules,
            generated_at: generated_at.into(),
        }
    }
}

/// Canonical form when `path` exists, else `path` with `.` components
/// dropped
fn absolute(path: &Path) -> PathBuf {
    let path = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };
    fs::canonicalize(path).unwrap_or_else(|_| {
        path.components()
            .filter(|c| !matches!(c, std::path::Component::CurDir))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sando_tokens::ModeKind;
    use tempfile::TempDir;

    #[test]
    fn empty_file_uses_defaults() {
        let config: SandoConfig = toml::from_str("").unwrap();
        assert_eq!(config.project.name, "design-tokens");
        assert_eq!(config.build.tokens_dir, "tokens");
        assert_eq!(config.build.output_dir, "dist");
        assert_eq!(config.build.cache_file, ".sando-cache.json");
        assert_eq!(config.build.prefix, "sando");
        assert!(config.build.typed_modules);
        assert_eq!(config.selectors, SelectorConfig::default());
        assert!(config.modes.is_empty());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: SandoConfig = toml::from_str(
            r#"
[build]
prefix = "acme"

[selectors]
default_flavor = "vanilla"
"#,
        )
        .unwrap();
        assert_eq!(config.build.prefix, "acme");
        assert_eq!(config.build.output_dir, "dist");
        assert_eq!(config.selectors.default_flavor, "vanilla");
        assert_eq!(config.selectors.mode_attribute, "flavor-mode");
    }

    #[test]
    fn mode_overrides_replace_builtins() {
        let config: SandoConfig = toml::from_str(
            r#"
[[modes]]
name = "dark"
type = "color"
media_query = "prefers-color-scheme: dark"

[[modes]]
name = "sepia"
attribute = "sepia"
allow_manual = true
manual_only = true
"#,
        )
        .unwrap();
        let registry = config.mode_registry();
        assert_eq!(
            registry.resolve(Some("dark")),
            ModeKind::AutoOnly {
                media_query: "prefers-color-scheme: dark".to_string()
            }
        );
        assert_eq!(
            registry.resolve(Some("sepia")),
            ModeKind::ManualOnly {
                attribute: "sepia".to_string()
            }
        );
        assert!(registry.get("forced-colors").is_some());
    }

    #[test]
    fn paths_resolve_against_config_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[build]\noutput_dir = \"public/tokens\"\n",
        )
        .unwrap();

        let config = SandoConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.tokens_dir(), dir.path().join("tokens"));
        assert_eq!(config.output_dir(), dir.path().join("public/tokens"));

        let by_file = SandoConfig::load_from_dir(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(by_file.cache_file(), dir.path().join(".sando-cache.json"));
    }

    #[test]
    fn missing_config_suggests_init() {
        let dir = TempDir::new().unwrap();
        let err = SandoConfig::load_from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("sando init"));
    }

    #[test]
    fn serialized_config_round_trips() {
        let config = SandoConfig::new("acme-tokens");
        let text = config.to_toml().unwrap();
        assert!(text.contains("name = \"acme-tokens\""));
        assert!(!text.contains("[[modes]]"));

        let parsed: SandoConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.project.name, "acme-tokens");
        assert_eq!(parsed.build.prefix, "sando");
    }

    #[test]
    fn output_dir_holding_the_project_is_not_removable() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("tokens")).unwrap();

        for output_dir in [".", "", "./", "..", "tokens", "tokens/.."] {
            fs::write(
                dir.path().join(CONFIG_FILE),
                format!("[build]\noutput_dir = \"{output_dir}\"\n"),
            )
            .unwrap();
            let config = SandoConfig::load_from_dir(dir.path()).unwrap();
            assert!(
                config.removable_output_dir().is_err(),
                "output_dir `{output_dir}` was accepted"
            );
        }

        fs::write(dir.path().join(CONFIG_FILE), "[build]\noutput_dir = \"dist\"\n").unwrap();
        let config = SandoConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.removable_output_dir().unwrap(), dir.path().join("dist"));
    }
}
