//! Drupal settings files.
//!
//! `settings.php` is derived once from `default.settings.php`: database
//! credential assignments are removed and an include of `settings.local.php`
//! is appended. The credentials themselves live in `settings.local.php`,
//! which is re-rendered on every run.

use std::fs;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::info;

use crate::context::RunContext;
use crate::error::RsdrupalError;
use crate::predicate::Predicates;
use crate::step::{ServiceAction, StepOutcome};
use crate::template::{self, Templates, Vars};

static CREDENTIAL_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$(databases|db_url|db_prefix)\s*=").expect("credential regex is valid")
});

pub const INCLUDE_LOCAL: &str = "\ninclude_once('settings.local.php');";

/// Generates `settings.php` content from `default.settings.php` content.
///
/// Every line starting with a `$databases`, `$db_url` or `$db_prefix`
/// assignment is dropped, then [`INCLUDE_LOCAL`] is appended. All other
/// bytes, including line endings, are kept as they are.
pub fn generate_settings(default_settings: &str) -> String {
    let mut out = String::with_capacity(default_settings.len() + INCLUDE_LOCAL.len());
    for line in default_settings.split_inclusive('\n') {
        if CREDENTIAL_ASSIGNMENT.is_match(line) {
            continue;
        }
        out.push_str(line);
    }
    out.push_str(INCLUDE_LOCAL);
    out
}

/// Escapes a value for a PHP single-quoted string.
fn php_quote_inner(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Writes `settings.local.php` and creates `settings.php` if missing.
///
/// Each file that changes asks for a web-server reload. `settings.php` is
/// left alone while no source is deployed.
pub fn write_settings(ctx: &RunContext<'_>) -> Result<StepOutcome> {
    let local = write_local_settings(ctx)?;
    let main = create_settings_if_missing(ctx)?;
    Ok(local.merge(main))
}

fn write_local_settings(ctx: &RunContext<'_>) -> Result<StepOutcome> {
    let profile = ctx.profile;
    let custom_settings = match &profile.install.settings {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| RsdrupalError::io(format!("failed to read custom settings: {}", path), e))?,
        None => String::new(),
    };

    let vars = Vars::from([
        ("db_name", profile.database.name.clone()),
        ("db_user", php_quote_inner(&profile.database.user)),
        ("db_pass", php_quote_inner(profile.database.password.expose())),
        ("db_host", php_quote_inner(&profile.database.host)),
        ("custom_settings", custom_settings),
    ]);
    let content = Templates::new(profile.templates_dir.as_deref())
        .render(template::SETTINGS_LOCAL, &vars)?;

    let path = profile.settings_dir().join("settings.local.php");
    if ctx.write_if_changed(&path, &content)? {
        Ok(StepOutcome::notifying(ServiceAction::Reload))
    } else {
        Ok(StepOutcome::skipped())
    }
}

fn create_settings_if_missing(ctx: &RunContext<'_>) -> Result<StepOutcome> {
    let dir = ctx.profile.settings_dir();
    let target = dir.join("settings.php");
    if target.exists() {
        info!("{} already exists, leaving it untouched", target);
        return Ok(StepOutcome::skipped());
    }

    let default = dir.join("default.settings.php");
    let template = match fs::read_to_string(&default) {
        Ok(text) => text,
        Err(e) if ctx.dry_run && e.kind() == std::io::ErrorKind::NotFound => {
            info!("dry run: {} not present yet, would generate {}", default, target);
            return Ok(StepOutcome::notifying(ServiceAction::Reload));
        }
        Err(e)
            if e.kind() == std::io::ErrorKind::NotFound
                && Predicates::new(*ctx).index_file_missing() =>
        {
            info!("no source deployed, skipping {}", target);
            return Ok(StepOutcome::skipped());
        }
        Err(e) => {
            return Err(RsdrupalError::io(format!("failed to read {}", default), e).into());
        }
    };

    ctx.write_if_changed(&target, &generate_settings(&template))?;
    Ok(StepOutcome::notifying(ServiceAction::Reload))
}
