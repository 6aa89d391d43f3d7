//! Profile configuration.
//!
//! A profile is a YAML document describing one Drupal site deployment. It is
//! loaded once, validated, and then passed by reference into every component
//! of a provisioning run; nothing mutates it afterwards.

use std::fmt;
use std::fs;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::RsdrupalError;

/// Database identifiers and user names are interpolated into SQL, so they are
/// restricted to a conservative character set.
static SQL_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("identifier regex is valid"));

static PROJECT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("project name regex is valid"));

const GIT_URL_SCHEMES: &[&str] = &["http", "https", "ssh", "git", "file"];

/// A string value that is never printed.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the underlying value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"********\"")
    }
}

/// Top-level profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    pub project: ProjectConfig,
    #[serde(default)]
    pub source: SourceConfig,
    pub database: DatabaseConfig,
    pub install: InstallConfig,
    #[serde(default)]
    pub webserver: WebServerConfig,
    #[serde(default)]
    pub drush: DrushConfig,
    /// Where the `drupal-perm` and `drupal-reset` helper scripts are installed
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: Utf8PathBuf,
    /// Directory with template overrides; built-in templates are used otherwise
    #[serde(default)]
    pub templates_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Site name, also used as the virtual host server name
    pub name: String,
    /// Deployment directory that receives the project source
    pub root: Utf8PathBuf,
    /// Drupal root (where `index.php` lives); relative to `root`
    #[serde(default)]
    pub drupal_root: Option<Utf8PathBuf>,
    /// Web server document root; relative to the Drupal root
    #[serde(default)]
    pub site_root: Option<Utf8PathBuf>,
}

/// Where the project source comes from.
///
/// An empty string means the origin is not configured.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    #[serde(default)]
    pub git_repo: String,
    #[serde(default)]
    pub git_branch: String,
    #[serde(default)]
    pub path: String,
}

impl SourceConfig {
    /// Returns the local source directory if configured.
    pub fn path(&self) -> Option<&Utf8Path> {
        (!self.path.is_empty()).then(|| Utf8Path::new(&self.path))
    }

    /// Returns the branch to check out if configured.
    pub fn branch(&self) -> Option<&str> {
        (!self.git_branch.is_empty()).then_some(self.git_branch.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    /// Password of the MySQL `root` account used for administration
    pub root_password: Secret,
    /// Application database user
    pub user: String,
    pub password: Secret,
    /// Application database name
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallConfig {
    /// SQL dump used to seed an empty database; relative to the project root
    #[serde(default)]
    pub sql_dump: Option<Utf8PathBuf>,
    pub admin_user: String,
    pub admin_pass: Secret,
    /// Script run once after first-time seeding; relative to the project root
    #[serde(default)]
    pub script: Option<Utf8PathBuf>,
    /// PHP snippet appended to `settings.local.php`
    #[serde(default)]
    pub settings: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebServerConfig {
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_sites_dir")]
    pub sites_dir: Utf8PathBuf,
    /// Command that enables a site by name; `null` disables the call
    #[serde(default = "default_enable_command")]
    pub enable_command: Option<String>,
    /// Service manager invoked as `<control_command> <service> <action>`
    #[serde(default = "default_control_command")]
    pub control_command: String,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            port: default_port(),
            sites_dir: default_sites_dir(),
            enable_command: default_enable_command(),
            control_command: default_control_command(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DrushConfig {
    /// Argv prefix used to invoke drush
    #[serde(default = "default_drush_command")]
    pub command: Vec<String>,
}

impl Default for DrushConfig {
    fn default() -> Self {
        Self {
            command: default_drush_command(),
        }
    }
}

fn default_scripts_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("/usr/local/bin")
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_service() -> String {
    "apache2".to_string()
}

fn default_port() -> u16 {
    80
}

fn default_sites_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("/etc/apache2/sites-available")
}

fn default_enable_command() -> Option<String> {
    Some("a2ensite".to_string())
}

fn default_control_command() -> String {
    "service".to_string()
}

fn default_drush_command() -> Vec<String> {
    // sendmail_path avoids the mail error drush raises during site-install
    ["php", "-d", "sendmail_path=/bin/true", "/usr/share/php/drush/drush.php"]
        .map(String::from)
        .to_vec()
}

impl Profile {
    pub fn project_root(&self) -> &Utf8Path {
        &self.project.root
    }

    pub fn drupal_root(&self) -> Utf8PathBuf {
        match &self.project.drupal_root {
            Some(dir) => self.project.root.join(dir),
            None => self.project.root.clone(),
        }
    }

    pub fn site_root(&self) -> Utf8PathBuf {
        let drupal_root = self.drupal_root();
        match &self.project.site_root {
            Some(dir) => drupal_root.join(dir),
            None => drupal_root,
        }
    }

    /// The entry file whose presence means the source is already deployed.
    pub fn index_file(&self) -> Utf8PathBuf {
        self.drupal_root().join("index.php")
    }

    pub fn settings_dir(&self) -> Utf8PathBuf {
        self.drupal_root().join("sites").join("default")
    }

    /// Resolves a path that may be relative to the project root.
    pub fn resolve_in_project(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_relative() {
            self.project.root.join(path)
        } else {
            path.to_owned()
        }
    }

    /// Resolves profile-relative paths against `base_dir` (the profile's directory).
    ///
    /// `install.sql_dump` and `install.script` stay relative: they are
    /// resolved against the project root when the run needs them.
    pub fn resolve_paths(&mut self, base_dir: &Utf8Path) {
        if !self.source.path.is_empty() && Utf8Path::new(&self.source.path).is_relative() {
            self.source.path = base_dir.join(&self.source.path).into_string();
        }
        if let Some(dir) = &mut self.templates_dir
            && dir.is_relative()
        {
            *dir = base_dir.join(&*dir);
        }
        if let Some(file) = &mut self.install.settings
            && file.is_relative()
        {
            *file = base_dir.join(&*file);
        }
    }

    /// Validates the profile.
    ///
    /// Configuring both source origins is allowed; each acquisition is
    /// guarded on its own, so only a warning is logged.
    pub fn validate(&self) -> Result<(), RsdrupalError> {
        if self.project.name.is_empty() {
            return Err(RsdrupalError::Validation("project name must not be empty".to_string()));
        }
        if !PROJECT_NAME.is_match(&self.project.name) {
            return Err(RsdrupalError::Validation(format!(
                "project name '{}' may only contain letters, digits, '.', '_' and '-'",
                self.project.name
            )));
        }
        if self.project.root.is_relative() {
            return Err(RsdrupalError::Validation(format!(
                "project root must be absolute: {}",
                self.project.root
            )));
        }

        self.validate_source()?;

        validate_sql_identifier(&self.database.name, "database name")?;
        validate_sql_identifier(&self.database.user, "database user")?;

        if self.install.admin_user.is_empty() || self.install.admin_pass.is_empty() {
            return Err(RsdrupalError::Validation(
                "install admin_user and admin_pass must not be empty".to_string(),
            ));
        }
        if self.drush.command.is_empty() {
            return Err(RsdrupalError::Validation("drush command must not be empty".to_string()));
        }
        if self.webserver.service.is_empty() || self.webserver.control_command.is_empty() {
            return Err(RsdrupalError::Validation(
                "webserver service and control_command must not be empty".to_string(),
            ));
        }

        debug!("profile '{}' is valid", self.project.name);
        Ok(())
    }

    fn validate_source(&self) -> Result<(), RsdrupalError> {
        let source = &self.source;

        if !source.git_repo.is_empty() && source.git_repo.contains("://") {
            let parsed = url::Url::parse(&source.git_repo).map_err(|e| {
                RsdrupalError::Validation(format!("invalid git_repo URL '{}': {}", source.git_repo, e))
            })?;
            if !GIT_URL_SCHEMES.contains(&parsed.scheme()) {
                return Err(RsdrupalError::Validation(format!(
                    "unsupported git_repo URL scheme '{}' (expected one of: {})",
                    parsed.scheme(),
                    GIT_URL_SCHEMES.join(", ")
                )));
            }
        }
        if source.git_repo.is_empty() && !source.git_branch.is_empty() {
            return Err(RsdrupalError::Validation(
                "git_branch is set but git_repo is empty".to_string(),
            ));
        }

        if let Some(path) = source.path() {
            let metadata = fs::metadata(path).map_err(|e| {
                RsdrupalError::io(format!("failed to read source path metadata: {}", path), e)
            })?;
            if !metadata.is_dir() {
                return Err(RsdrupalError::Validation(format!(
                    "source path is not a directory: {}",
                    path
                )));
            }
        }

        if !source.git_repo.is_empty() && !source.path.is_empty() {
            warn!(
                "both source.git_repo and source.path are configured; \
                each is applied only while {} is missing",
                self.index_file()
            );
        }

        Ok(())
    }
}

fn validate_sql_identifier(value: &str, label: &str) -> Result<(), RsdrupalError> {
    if !SQL_IDENTIFIER.is_match(value) {
        return Err(RsdrupalError::Validation(format!(
            "{} '{}' may only contain letters, digits and '_'",
            label, value
        )));
    }
    Ok(())
}

/// Loads a profile from a YAML file and resolves its relative paths.
pub fn load_profile(path: &Utf8Path) -> Result<Profile, RsdrupalError> {
    let content = fs::read_to_string(path)
        .map_err(|e| RsdrupalError::io(format!("failed to load file: {}", path), e))?;
    let mut profile: Profile = serde_yaml::from_str(&content)
        .map_err(|e| RsdrupalError::Config(format!("failed to parse yaml: {}: {}", path, e)))?;

    let base_dir = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir.to_owned(),
        _ => Utf8PathBuf::from("."),
    };
    profile.resolve_paths(&base_dir);

    Ok(profile)
}
