//! Template loading and rendering.
//!
//! Templates use `{{ name }}` placeholders. Built-in templates are compiled
//! into the binary; a file of the same name in the profile's `templates_dir`
//! takes precedence.

use std::collections::BTreeMap;
use std::fs;
use std::sync::LazyLock;

use camino::Utf8Path;
use regex::{Captures, Regex};
use tracing::debug;

use crate::error::RsdrupalError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
});

pub const VHOST: &str = "vhost.conf";
pub const DRUPAL_PERM: &str = "drupal-perm.sh";
pub const DRUPAL_RESET: &str = "drupal-reset.sh";
pub const SETTINGS_LOCAL: &str = "settings.local.php";

const BUILTIN: &[(&str, &str)] = &[
    (VHOST, include_str!("../templates/vhost.conf")),
    (DRUPAL_PERM, include_str!("../templates/drupal-perm.sh")),
    (DRUPAL_RESET, include_str!("../templates/drupal-reset.sh")),
    (SETTINGS_LOCAL, include_str!("../templates/settings.local.php")),
];

/// Variables available to a template.
pub type Vars = BTreeMap<&'static str, String>;

/// Replaces every placeholder in `template` with its value from `vars`.
///
/// `name` only labels errors. An unknown placeholder is a `Config` error.
pub fn render(name: &str, template: &str, vars: &Vars) -> Result<String, RsdrupalError> {
    let mut missing: Option<String> = None;
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let key = &caps[1];
        match vars.get(key) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| key.to_string());
                String::new()
            }
        }
    });

    if let Some(key) = missing {
        return Err(RsdrupalError::Config(format!(
            "template '{}' references unknown variable '{}'",
            name, key
        )));
    }
    Ok(rendered.into_owned())
}

/// Source of template text.
pub struct Templates<'a> {
    override_dir: Option<&'a Utf8Path>,
}

impl<'a> Templates<'a> {
    pub fn new(override_dir: Option<&'a Utf8Path>) -> Self {
        Self { override_dir }
    }

    /// Returns the text of template `name`.
    pub fn load(&self, name: &str) -> Result<String, RsdrupalError> {
        if let Some(dir) = self.override_dir {
            let path = dir.join(name);
            if path.is_file() {
                debug!("using template override {}", path);
                return fs::read_to_string(&path)
                    .map_err(|e| RsdrupalError::io(format!("failed to read template: {}", path), e));
            }
        }

        BUILTIN
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, text)| (*text).to_string())
            .ok_or_else(|| RsdrupalError::Config(format!("unknown template '{}'", name)))
    }

    /// Loads and renders template `name`.
    pub fn render(&self, name: &str, vars: &Vars) -> Result<String, RsdrupalError> {
        render(name, &self.load(name)?, vars)
    }
}
