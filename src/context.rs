//! Shared state of one provisioning run.

use std::fs;

use anyhow::Result;
use camino::Utf8Path;
use tracing::{debug, info};

use crate::config::Profile;
use crate::error::RsdrupalError;
use crate::executor::{self, CommandExecutor, CommandSpec, ExecutionResult};

/// Everything a component needs to inspect and change the target host.
///
/// Cheap to copy; every component borrows the same profile and executor.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub profile: &'a Profile,
    pub executor: &'a dyn CommandExecutor,
    pub dry_run: bool,
}

impl<'a> RunContext<'a> {
    pub fn new(profile: &'a Profile, executor: &'a dyn CommandExecutor, dry_run: bool) -> Self {
        Self {
            profile,
            executor,
            dry_run,
        }
    }

    /// Runs a command and fails on a non-zero exit.
    pub fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        debug!("running: {}", spec.display());
        executor::run_checked(self.executor, spec)
    }

    /// Writes `content` to `path` unless it already holds exactly that content.
    ///
    /// Returns whether the file changed. In dry-run mode nothing is written and
    /// the would-be change is reported.
    pub fn write_if_changed(&self, path: &Utf8Path, content: &str) -> Result<bool, RsdrupalError> {
        match fs::read_to_string(path) {
            Ok(current) if current == content => {
                debug!("{} is up to date", path);
                return Ok(false);
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(RsdrupalError::io(format!("failed to read {}", path), e)),
        }

        if self.dry_run {
            info!("dry run: would write {}", path);
            return Ok(true);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RsdrupalError::io(format!("failed to create directory: {}", parent), e)
            })?;
        }
        fs::write(path, content)
            .map_err(|e| RsdrupalError::io(format!("failed to write {}", path), e))?;
        info!("wrote {}", path);
        Ok(true)
    }

    /// Sets Unix file permissions on `path`; a no-op in dry-run mode.
    #[cfg(unix)]
    pub fn set_file_mode(&self, path: &Utf8Path, mode: u32) -> Result<(), RsdrupalError> {
        use std::os::unix::fs::PermissionsExt;

        if self.dry_run {
            return Ok(());
        }
        let mut perms = fs::metadata(path)
            .map_err(|e| RsdrupalError::io(format!("failed to read metadata for {}", path), e))?
            .permissions();
        perms.set_mode(mode);
        fs::set_permissions(path, perms)
            .map_err(|e| RsdrupalError::io(format!("failed to set permissions on {}", path), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RealCommandExecutor;
    use camino::Utf8PathBuf;

    fn profile() -> Profile {
        serde_yaml::from_str(
            r#"
project: { name: example, root: /var/www/example }
database: { root_password: root, user: drupal, password: drupal, name: drupal }
install: { admin_user: admin, admin_pass: admin }
"#,
        )
        .expect("profile should parse")
    }

    #[test]
    fn write_if_changed_is_idempotent() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nested/site.conf"))
            .expect("path should be valid UTF-8");
        let profile = profile();
        let executor = RealCommandExecutor { dry_run: false };
        let ctx = RunContext::new(&profile, &executor, false);

        assert!(ctx.write_if_changed(&path, "a\n").unwrap());
        assert!(!ctx.write_if_changed(&path, "a\n").unwrap());
        assert!(ctx.write_if_changed(&path, "b\n").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "b\n");
    }

    #[test]
    fn write_if_changed_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("site.conf"))
            .expect("path should be valid UTF-8");
        let profile = profile();
        let executor = RealCommandExecutor { dry_run: true };
        let ctx = RunContext::new(&profile, &executor, true);

        assert!(ctx.write_if_changed(&path, "a\n").unwrap());
        assert!(!path.exists());
    }
}
