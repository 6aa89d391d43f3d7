//! Helper script installation.
//!
//! Installs `drupal-perm` (ownership/permission fix used after seeding) and
//! `drupal-reset` (drops the database for a clean re-seed) into the
//! profile's `scripts_dir`.

use anyhow::Result;
use camino::Utf8PathBuf;

use crate::context::RunContext;
use crate::step::StepOutcome;
use crate::template::{self, Templates, Vars};

#[cfg(unix)]
const SCRIPT_MODE: u32 = 0o755;

pub const PERM_SCRIPT: &str = "drupal-perm";
pub const RESET_SCRIPT: &str = "drupal-reset";

/// Path of the installed permission-fix script.
pub fn perm_script_path(ctx: &RunContext<'_>) -> Utf8PathBuf {
    ctx.profile.scripts_dir.join(PERM_SCRIPT)
}

/// Renders and installs both helper scripts.
pub fn install_scripts(ctx: &RunContext<'_>) -> Result<StepOutcome> {
    let profile = ctx.profile;
    let templates = Templates::new(profile.templates_dir.as_deref());
    let drupal_root = profile.drupal_root().into_string();

    let perm_vars = Vars::from([
        ("drupal_root", drupal_root.clone()),
        ("project_root", profile.project_root().to_string()),
    ]);
    let reset_vars = Vars::from([
        ("db_user", profile.database.user.clone()),
        ("db_host", profile.database.host.clone()),
        ("db_name", profile.database.name.clone()),
        ("drupal_root", drupal_root),
    ]);

    let mut outcome = StepOutcome::skipped();
    for (name, template_name, vars) in [
        (PERM_SCRIPT, template::DRUPAL_PERM, &perm_vars),
        (RESET_SCRIPT, template::DRUPAL_RESET, &reset_vars),
    ] {
        let path = profile.scripts_dir.join(name);
        let content = templates.render(template_name, vars)?;
        if ctx.write_if_changed(&path, &content)? {
            #[cfg(unix)]
            ctx.set_file_mode(&path, SCRIPT_MODE)?;
            outcome = outcome.merge(StepOutcome::applied());
        }
    }
    Ok(outcome)
}
