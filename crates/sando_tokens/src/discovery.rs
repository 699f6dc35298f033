//! Token source discovery
//!
//! Expected layout below the tokens directory:
//!
//! ```text
//! tokens/
//! ├── ingredients/*.json              primitives
//! ├── flavors/<name>/flavor.json      theme base file per flavor
//! ├── flavors/<name>/flavor-<mode>.json
//! └── recipes/*.json                  composite component tokens
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, TokenError};
use crate::layer::{LayerConfig, LayerKind, LayerSources};

pub const INGREDIENTS_DIR: &str = "ingredients";
pub const FLAVORS_DIR: &str = "flavors";
pub const RECIPES_DIR: &str = "recipes";

/// Flavor that also applies when no flavor attribute is set
pub const DEFAULT_FLAVOR: &str = "original";

const FLAVOR_FILE_STEM: &str = "flavor";

/// A theme variant and its per-mode source files
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlavorDescriptor {
    pub name: String,
    pub base_file: PathBuf,
    /// Mode name -> source file, ordered by mode name
    pub mode_files: BTreeMap<String, PathBuf>,
}

/// Every `.json` file below `dir`, recursively, in file-name order.
///
/// A missing directory yields an empty list.
pub fn json_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry below {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .map(|e| e.into_path())
        .collect()
}

/// Classify a file inside a flavor directory.
///
/// `flavor.json` is the base file (`Some(None)`), `flavor-dark.json` the
/// `dark` mode file (`Some(Some("dark"))`). Anything else is not a flavor
/// file.
pub fn mode_from_file_name(file_name: &str) -> Option<Option<String>> {
    let stem = file_name.strip_suffix(".json")?;
    if stem == FLAVOR_FILE_STEM {
        return Some(None);
    }
    let mode = stem.strip_prefix(FLAVOR_FILE_STEM)?.strip_prefix('-')?;
    if mode.is_empty() {
        return None;
    }
    Some(Some(mode.to_string()))
}

/// Describe every flavor directory below `flavors_dir`, sorted by name
pub fn discover_flavors(flavors_dir: &Path) -> Result<Vec<FlavorDescriptor>> {
    if !flavors_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs = read_dir_sorted(flavors_dir)?;
    dirs.retain(|p| p.is_dir());

    let mut flavors = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };

        let mut base_file = None;
        let mut mode_files = BTreeMap::new();
        for file in read_dir_sorted(&dir)? {
            let Some(file_name) = file.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match mode_from_file_name(file_name) {
                Some(None) => base_file = Some(file.clone()),
                Some(Some(mode)) => {
                    mode_files.insert(mode, file.clone());
                }
                None => tracing::debug!("Ignoring {} in flavor `{}`", file.display(), name),
            }
        }

        match base_file {
            Some(base_file) => flavors.push(FlavorDescriptor {
                name,
                base_file,
                mode_files,
            }),
            None => tracing::warn!(
                "Flavor `{}` has no {}.json; skipping it",
                name,
                FLAVOR_FILE_STEM
            ),
        }
    }

    Ok(flavors)
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)
        .map_err(|e| TokenError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| TokenError::io(dir, e))?;
    paths.sort();
    Ok(paths)
}

/// Discover the three layers in dependency order:
/// ingredients, flavors, recipes.
pub fn discover_layers(tokens_dir: &Path, default_flavor: &str) -> Result<Vec<LayerConfig>> {
    if !tokens_dir.is_dir() {
        return Err(TokenError::Discovery(format!(
            "token directory {} does not exist",
            tokens_dir.display()
        )));
    }

    let ingredients_dir = tokens_dir.join(INGREDIENTS_DIR);
    let flavors_dir = tokens_dir.join(FLAVORS_DIR);
    let recipes_dir = tokens_dir.join(RECIPES_DIR);

    for dir in [&ingredients_dir, &flavors_dir, &recipes_dir] {
        if !dir.is_dir() {
            tracing::warn!("Layer directory {} not found", dir.display());
        }
    }

    let ingredients = json_files(&ingredients_dir);
    let flavors = discover_flavors(&flavors_dir)?;
    let recipes = json_files(&recipes_dir);

    let mut recipe_include = ingredients.clone();
    match flavors.iter().find(|f| f.name == default_flavor) {
        Some(flavor) => recipe_include.push(flavor.base_file.clone()),
        None if !flavors.is_empty() || !recipes.is_empty() => tracing::warn!(
            "Default flavor `{}` not found; recipes resolve against ingredients only",
            default_flavor
        ),
        None => {}
    }

    Ok(vec![
        LayerConfig {
            name: INGREDIENTS_DIR.to_string(),
            kind: LayerKind::Primitives,
            source_dir: ingredients_dir,
            include: Vec::new(),
            sources: LayerSources::Files(ingredients.clone()),
        },
        LayerConfig {
            name: FLAVORS_DIR.to_string(),
            kind: LayerKind::Theme,
            source_dir: flavors_dir,
            include: ingredients,
            sources: LayerSources::Flavors(flavors),
        },
        LayerConfig {
            name: RECIPES_DIR.to_string(),
            kind: LayerKind::Composite,
            source_dir: recipes_dir,
            include: recipe_include,
            sources: LayerSources::Files(recipes),
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn flavor_file_names() {
        assert_eq!(mode_from_file_name("flavor.json"), Some(None));
        assert_eq!(
            mode_from_file_name("flavor-dark.json"),
            Some(Some("dark".to_string()))
        );
        assert_eq!(
            mode_from_file_name("flavor-high-contrast.json"),
            Some(Some("high-contrast".to_string()))
        );
        assert_eq!(mode_from_file_name("flavor-.json"), None);
        assert_eq!(mode_from_file_name("flavors.json"), None);
        assert_eq!(mode_from_file_name("notes.md"), None);
    }

    #[test]
    fn discovers_flavors_and_modes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "flavors/strawberry/flavor.json");
        touch(root, "flavors/original/flavor.json");
        touch(root, "flavors/original/flavor-dark.json");
        touch(root, "flavors/original/flavor-motion-reduce.json");
        touch(root, "flavors/empty/README.md");

        let flavors = discover_flavors(&root.join("flavors")).unwrap();
        let names: Vec<&str> = flavors.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["original", "strawberry"]);

        let modes: Vec<&str> = flavors[0].mode_files.keys().map(String::as_str).collect();
        assert_eq!(modes, vec!["dark", "motion-reduce"]);
        assert!(flavors[1].mode_files.is_empty());
    }

    #[test]
    fn discovers_layers_in_dependency_order() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let color = touch(root, "ingredients/color.json");
        let space = touch(root, "ingredients/nested/space.json");
        let base = touch(root, "flavors/original/flavor.json");
        let button = touch(root, "recipes/button.json");

        let layers = discover_layers(root, DEFAULT_FLAVOR).unwrap();
        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["ingredients", "flavors", "recipes"]);

        assert_eq!(
            layers[0].sources,
            LayerSources::Files(vec![color.clone(), space.clone()])
        );
        assert_eq!(layers[1].include, vec![color.clone(), space.clone()]);
        assert_eq!(layers[2].include, vec![color, space, base]);
        assert_eq!(layers[2].sources, LayerSources::Files(vec![button]));
    }

    #[test]
    fn missing_tokens_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = discover_layers(&dir.path().join("nope"), DEFAULT_FLAVOR).unwrap_err();
        assert!(matches!(err, TokenError::Discovery(_)));
    }

    #[test]
    fn missing_layer_dirs_yield_empty_layers() {
        let dir = TempDir::new().unwrap();
        let layers = discover_layers(dir.path(), DEFAULT_FLAVOR).unwrap();
        assert!(layers.iter().all(|l| l.sources.is_empty()));
    }
}
