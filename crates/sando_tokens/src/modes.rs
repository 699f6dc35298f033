//! Theme modes and their activation rules
//!
//! A mode is a state variant inside a flavor. Color modes (light, dark,
//! high-contrast, forced-colors) are mutually exclusive on an element; the
//! motion mode is independent and combines with any of them.
//!
//! Mode names arrive as strings (derived from `flavor-<mode>.json`
//! filenames and from configuration). They are mapped exactly once, by
//! [`ModeRegistry::resolve`], into the closed [`ModeKind`] enum that the CSS
//! emitter matches on.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Media query used by the motion mode when none is configured
pub const REDUCED_MOTION_QUERY: &str = "prefers-reduced-motion: reduce";

/// Name reserved for the flavor base file
pub const BASE_MODE: &str = "base";

/// What a mode varies
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeType {
    #[default]
    Color,
    Motion,
}

/// Declarative description of a mode
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeConfig {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mode_type: ModeType,
    /// Media feature without the surrounding parentheses
    #[serde(default)]
    pub media_query: Option<String>,
    /// Value of the mode attribute that selects this mode manually.
    /// Defaults to the mode name.
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub allow_manual: bool,
    #[serde(default)]
    pub manual_only: bool,
    #[serde(default)]
    pub independent: bool,
}

impl ModeConfig {
    fn attribute_or_name(&self) -> String {
        self.attribute.clone().unwrap_or_else(|| self.name.clone())
    }

    /// Classify the mode. Motion modes never get a manual selector, whatever
    /// `allow_manual` says.
    pub fn kind(&self) -> ModeKind {
        if self.independent || self.mode_type == ModeType::Motion {
            return ModeKind::Motion {
                media_query: self
                    .media_query
                    .clone()
                    .unwrap_or_else(|| REDUCED_MOTION_QUERY.to_string()),
            };
        }

        if self.manual_only {
            return ModeKind::ManualOnly {
                attribute: self.attribute_or_name(),
            };
        }

        match (&self.media_query, self.allow_manual) {
            (Some(query), true) => ModeKind::AutoPlusManual {
                media_query: query.clone(),
                attribute: self.attribute_or_name(),
            },
            (Some(query), false) => ModeKind::AutoOnly {
                media_query: query.clone(),
            },
            (None, true) => ModeKind::ManualOnly {
                attribute: self.attribute_or_name(),
            },
            (None, false) => {
                tracing::warn!(
                    "Mode `{}` has neither a media query nor a manual selector; emitting it as base",
                    self.name
                );
                ModeKind::Base
            }
        }
    }
}

/// How a mode's declarations are activated in CSS
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModeKind {
    /// Flavor selector only
    Base,
    /// `@media` block only
    AutoOnly { media_query: String },
    /// `@media` block plus a manual attribute block with the same declarations
    AutoPlusManual {
        media_query: String,
        attribute: String,
    },
    /// Manual attribute block only
    ManualOnly { attribute: String },
    /// Independent `@media` block, never a manual block
    Motion { media_query: String },
}

impl ModeKind {
    pub fn media_query(&self) -> Option<&str> {
        match self {
            Self::AutoOnly { media_query }
            | Self::AutoPlusManual { media_query, .. }
            | Self::Motion { media_query } => Some(media_query),
            Self::Base | Self::ManualOnly { .. } => None,
        }
    }

    pub fn manual_attribute(&self) -> Option<&str> {
        match self {
            Self::AutoPlusManual { attribute, .. } | Self::ManualOnly { attribute } => {
                Some(attribute)
            }
            Self::Base | Self::AutoOnly { .. } | Self::Motion { .. } => None,
        }
    }
}

/// Modes every project knows about without configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinMode {
    Light,
    Dark,
    HighContrast,
    ForcedColors,
    MotionReduce,
}

impl BuiltinMode {
    /// Stable id, as used in `flavor-<id>.json`
    pub fn id(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::HighContrast => "high-contrast",
            Self::ForcedColors => "forced-colors",
            Self::MotionReduce => "motion-reduce",
        }
    }

    pub fn all() -> &'static [BuiltinMode] {
        const MODES: [BuiltinMode; 5] = [
            BuiltinMode::Light,
            BuiltinMode::Dark,
            BuiltinMode::HighContrast,
            BuiltinMode::ForcedColors,
            BuiltinMode::MotionReduce,
        ];
        &MODES
    }

    pub fn config(self) -> ModeConfig {
        let name = self.id().to_string();
        match self {
            // Lets a user on a dark system pin the light palette explicitly.
            Self::Light => ModeConfig {
                name,
                mode_type: ModeType::Color,
                media_query: None,
                attribute: Some("light".to_string()),
                allow_manual: true,
                manual_only: true,
                independent: false,
            },
            Self::Dark => ModeConfig {
                name,
                mode_type: ModeType::Color,
                media_query: Some("prefers-color-scheme: dark".to_string()),
                attribute: Some("dark".to_string()),
                allow_manual: true,
                manual_only: false,
                independent: false,
            },
            Self::HighContrast => ModeConfig {
                name,
                mode_type: ModeType::Color,
                media_query: Some("prefers-contrast: more".to_string()),
                attribute: Some("high-contrast".to_string()),
                allow_manual: true,
                manual_only: false,
                independent: false,
            },
            Self::ForcedColors => ModeConfig {
                name,
                mode_type: ModeType::Color,
                media_query: Some("forced-colors: active".to_string()),
                attribute: None,
                allow_manual: false,
                manual_only: false,
                independent: false,
            },
            Self::MotionReduce => ModeConfig {
                name,
                mode_type: ModeType::Motion,
                media_query: Some(REDUCED_MOTION_QUERY.to_string()),
                attribute: None,
                allow_manual: false,
                manual_only: false,
                independent: true,
            },
        }
    }
}

impl Display for BuiltinMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Lookup table from mode name to configuration
#[derive(Clone, Debug)]
pub struct ModeRegistry {
    modes: Vec<ModeConfig>,
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModeRegistry {
    /// Registry holding the five built-in modes
    pub fn builtin() -> Self {
        Self {
            modes: BuiltinMode::all().iter().map(|m| m.config()).collect(),
        }
    }

    pub fn empty() -> Self {
        Self { modes: Vec::new() }
    }

    /// Replace a mode of the same name, or register a new one
    pub fn insert(&mut self, mode: ModeConfig) {
        match self.modes.iter_mut().find(|m| m.name == mode.name) {
            Some(existing) => *existing = mode,
            None => self.modes.push(mode),
        }
    }

    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = ModeConfig>) -> Self {
        for mode in overrides {
            self.insert(mode);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ModeConfig> {
        self.modes.iter().find(|m| m.name == name)
    }

    pub fn modes(&self) -> &[ModeConfig] {
        &self.modes
    }

    /// Map a mode name (or `None` for the flavor base file) to its kind.
    ///
    /// Unknown names degrade to [`ModeKind::Base`] with a warning.
    pub fn resolve(&self, name: Option<&str>) -> ModeKind {
        match name {
            None => ModeKind::Base,
            Some(BASE_MODE) => ModeKind::Base,
            Some(name) => match self.get(name) {
                Some(config) => config.kind(),
                None => {
                    tracing::warn!("Unknown mode `{}`; falling back to base mode", name);
                    ModeKind::Base
                }
            },
        }
    }
}
