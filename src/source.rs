//! Project source acquisition.
//!
//! Populates the project root from either a git repository or a local
//! directory. Each origin is guarded by two predicates: the origin must be
//! configured, and the Drupal index file must still be missing. Once the
//! index file exists, acquisition is a no-op whatever the origin.

use std::fs;

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::info;

use crate::context::RunContext;
use crate::error::RsdrupalError;
use crate::executor::CommandSpec;
use crate::predicate::{Predicates, SourceOrigin};
use crate::step::{ServiceAction, StepOutcome};

pub struct SourceAcquirer<'a> {
    ctx: RunContext<'a>,
}

impl<'a> SourceAcquirer<'a> {
    pub fn new(ctx: RunContext<'a>) -> Self {
        Self { ctx }
    }

    /// Creates the project root and runs every applicable acquisition.
    ///
    /// Any applied acquisition asks for a web-server restart.
    pub fn acquire(&self) -> Result<StepOutcome> {
        let root = self.ctx.profile.project_root();
        self.ensure_project_root(root)?;

        let predicates = Predicates::new(self.ctx);
        let source = &self.ctx.profile.source;

        let git = if self.should_acquire(&predicates, SourceOrigin::Git) {
            self.acquire_from_git(&source.git_repo, source.branch(), root)?;
            StepOutcome::notifying(ServiceAction::Restart)
        } else {
            StepOutcome::skipped()
        };

        // Re-evaluated: a successful clone normally provides the index file.
        let path = match source.path() {
            Some(src) if self.should_acquire(&predicates, SourceOrigin::Path) => {
                self.acquire_from_path(src, root)?;
                StepOutcome::notifying(ServiceAction::Restart)
            }
            _ => StepOutcome::skipped(),
        };

        Ok(git.merge(path))
    }

    fn should_acquire(&self, predicates: &Predicates<'_>, origin: SourceOrigin) -> bool {
        if !predicates.source_configured(origin) {
            info!("skipping {} source: not configured", origin);
            return false;
        }
        if !predicates.index_file_missing() {
            info!(
                "skipping {} source: {} already exists",
                origin,
                self.ctx.profile.index_file()
            );
            return false;
        }
        true
    }

    fn ensure_project_root(&self, root: &Utf8Path) -> Result<(), RsdrupalError> {
        if self.ctx.dry_run || root.is_dir() {
            return Ok(());
        }
        info!("creating project root {}", root);
        fs::create_dir_all(root)
            .map_err(|e| RsdrupalError::io(format!("failed to create project root: {}", root), e))
    }

    /// Clones `repo_url` into `dest` and checks out `branch` when given.
    pub fn acquire_from_git(&self, repo_url: &str, branch: Option<&str>, dest: &Utf8Path) -> Result<()> {
        info!("cloning {} into {}", repo_url, dest);
        let clone = CommandSpec::new("git", vec!["clone".to_string(), repo_url.to_string()])
            .with_args([dest.as_str()]);
        self.ctx
            .run(&clone)
            .with_context(|| format!("failed to clone {}", repo_url))?;

        if let Some(branch) = branch {
            info!("checking out branch {}", branch);
            let checkout = CommandSpec::new("git", vec!["checkout".to_string(), branch.to_string()])
                .with_cwd(dest.to_owned());
            self.ctx
                .run(&checkout)
                .with_context(|| format!("failed to check out branch {}", branch))?;
        }
        Ok(())
    }

    /// Recursively copies the contents of `source` into `dest`, overwriting.
    pub fn acquire_from_path(&self, source: &Utf8Path, dest: &Utf8Path) -> Result<()> {
        info!("copying {} into {}", source, dest);
        let copy = CommandSpec::new(
            "cp",
            vec![
                "-Rf".to_string(),
                format!("{}/.", source.as_str().trim_end_matches('/')),
                dest.to_string(),
            ],
        );
        self.ctx
            .run(&copy)
            .with_context(|| format!("failed to copy project source from {}", source))?;
        Ok(())
    }
}
