//! Flavor and mode selector synthesis

use serde::{Deserialize, Serialize};

use crate::discovery::DEFAULT_FLAVOR;

/// Attribute names and root selector used in generated stylesheets
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Selector for the document root
    pub root: String,
    /// Attribute that picks a flavor, e.g. `flavor="strawberry"`
    pub flavor_attribute: String,
    /// Attribute that pins a mode manually, e.g. `flavor-mode="dark"`
    pub mode_attribute: String,
    /// Flavor that also applies when no flavor attribute is present
    pub default_flavor: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            root: ":root".to_string(),
            flavor_attribute: "flavor".to_string(),
            mode_attribute: "flavor-mode".to_string(),
            default_flavor: DEFAULT_FLAVOR.to_string(),
        }
    }
}

impl SelectorConfig {
    pub fn is_default_flavor(&self, flavor: &str) -> bool {
        flavor == self.default_flavor
    }

    fn flavor_attr(&self, flavor: &str) -> String {
        format!("[{}=\"{}\"]", self.flavor_attribute, flavor)
    }

    fn mode_attr(&self, attribute: &str) -> String {
        format!("[{}=\"{}\"]", self.mode_attribute, attribute)
    }

    /// Selectors a flavor's base declarations apply to.
    ///
    /// The default flavor matches both the bare root (no flavor attribute)
    /// and an explicit `[flavor="original"]`; other flavors only match the
    /// explicit form.
    pub fn flavor_selectors(&self, flavor: &str) -> Vec<String> {
        let explicit = self.flavor_attr(flavor);
        if self.is_default_flavor(flavor) {
            vec![
                format!("{}:not([{}])", self.root, self.flavor_attribute),
                explicit,
            ]
        } else {
            vec![explicit]
        }
    }

    /// Selectors for a manually pinned mode.
    ///
    /// For the default flavor the mode attribute may sit on the element
    /// itself (with or without an explicit flavor) or on an ancestor
    /// container.
    pub fn manual_selectors(&self, flavor: &str, attribute: &str) -> Vec<String> {
        let explicit = self.flavor_attr(flavor);
        let mode = self.mode_attr(attribute);
        if self.is_default_flavor(flavor) {
            vec![
                format!("{}{}:not([{}])", self.root, mode, self.flavor_attribute),
                format!("{explicit}{mode}"),
                format!("{mode} {explicit}"),
            ]
        } else {
            vec![format!("{explicit}{mode}")]
        }
    }
}
