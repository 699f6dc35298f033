//! Project creation and scaffolding

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::{SandoConfig, CONFIG_FILE};

/// Create a new Sando token project at `path`
pub fn create_project(path: &Path, name: &str) -> Result<()> {
    let config_path = path.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    let config = SandoConfig::new(name);
    let tokens = path.join(&config.build.tokens_dir);

    // Create sando.toml
    write(&config_path, &config.to_toml()?)?;

    // Starter token tree: one file per layer, plus a dark mode
    write(&tokens.join("ingredients/color.json"), INGREDIENT_COLOR)?;
    write(&tokens.join("flavors/original/flavor.json"), FLAVOR_BASE)?;
    write(&tokens.join("flavors/original/flavor-dark.json"), FLAVOR_DARK)?;
    write(&tokens.join("recipes/button.json"), RECIPE_BUTTON)?;

    // Create .gitignore
    write(
        &path.join(".gitignore"),
        &format!(
            r#"# Sando build artifacts
/{}/
{}

# OS
.DS_Store
Thumbs.db
"#,
            config.build.output_dir, config.build.cache_file
        ),
    )?;

    // Create README
    write(
        &path.join("README.md"),
        &format!(
            r#"# {name}

Design tokens built with Sando.

## Build

```bash
sando build
```

## Project Structure

```
{name}/
├── sando.toml               # Project configuration
└── tokens/
    ├── ingredients/         # Primitive values
    ├── flavors/original/    # Theme tokens, flavor-<mode>.json per mode
    └── recipes/             # Component tokens
```
"#
        ),
    )?;

    tracing::info!("Created project `{}` in {}", name, path.display());
    Ok(())
}

fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

const INGREDIENT_COLOR: &str = r##"{
  "color": {
    "white": { "value": "#ffffff" },
    "black": { "value": "#0b0b0f" },
    "orange": {
      "500": { "value": "#f97316" },
      "700": { "value": "#c2410c" }
    }
  },
  "space": {
    "2": { "value": "0.5rem" },
    "4": { "value": "1rem" }
  }
}
"##;

const FLAVOR_BASE: &str = r##"{
  "background": {
    "base": { "value": "{color.white.value}" }
  },
  "text": {
    "body": { "value": "{color.black.value}" }
  },
  "action": {
    "solid": { "value": "{color.orange.700.value}" }
  }
}
"##;

const FLAVOR_DARK: &str = r##"{
  "background": {
    "base": { "value": "{color.black.value}" }
  },
  "text": {
    "body": { "value": "{color.white.value}" }
  },
  "action": {
    "solid": { "value": "{color.orange.500.value}" }
  }
}
"##;

const RECIPE_BUTTON: &str = r##"{
  "button": {
    "solid": {
      "backgroundColor": { "default": { "value": "{action.solid.value}" } },
      "textColor": { "default": { "value": "{background.base.value}" } },
      "padding": { "value": "{space.2.value} {space.4.value}" }
    }
  }
}
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use sando_tokens::{discover_layers, JsonEngine, MemoryCacheStore, Orchestrator};
    use tempfile::TempDir;

    #[test]
    fn scaffold_has_every_layer() {
        let dir = TempDir::new().unwrap();
        create_project(dir.path(), "acme").unwrap();

        for rel in [
            "sando.toml",
            ".gitignore",
            "README.md",
            "tokens/ingredients/color.json",
            "tokens/flavors/original/flavor.json",
            "tokens/flavors/original/flavor-dark.json",
            "tokens/recipes/button.json",
        ] {
            assert!(dir.path().join(rel).is_file(), "missing {rel}");
        }

        let config = SandoConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.project.name, "acme");
    }

    #[test]
    fn scaffold_builds_cleanly() {
        let dir = TempDir::new().unwrap();
        create_project(dir.path(), "acme").unwrap();
        let config = SandoConfig::load_from_dir(dir.path()).unwrap();

        let layers = discover_layers(&config.tokens_dir(), &config.selectors.default_flavor).unwrap();
        let ctx = config.build_context("stamp");
        let mut cache = MemoryCacheStore::new();
        let report = Orchestrator::new(&JsonEngine, &mut cache, &ctx).run(&layers);
        assert!(report.is_success(), "{}", report.summary());

        let button = fs::read_to_string(ctx.output_dir.join("css/recipes/tokens.css")).unwrap();
        assert!(button.contains("--sando-button-solid-padding: var(--sando-space-2) var(--sando-space-4);"));
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        create_project(dir.path(), "acme").unwrap();
        assert!(create_project(dir.path(), "acme").is_err());
    }
}
