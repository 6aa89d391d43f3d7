//! Post-install actions.
//!
//! Runs only in reaction to seeding, at most once per run: fixes ownership
//! and permissions, clears the Drupal cache, then runs the user's
//! post-install script if one exists.

use anyhow::{Context, Result};
use tracing::info;

use crate::context::RunContext;
use crate::error::RsdrupalError;
use crate::executor::CommandSpec;
use crate::predicate::Predicates;
use crate::scripts;
use crate::step::StepResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostInstallState {
    /// Not triggered yet in this run.
    Idle,
    /// Already ran in this run; further triggers are no-ops.
    Done,
}

pub struct PostInstallRunner<'a> {
    ctx: RunContext<'a>,
    state: PostInstallState,
}

impl<'a> PostInstallRunner<'a> {
    pub fn new(ctx: RunContext<'a>) -> Self {
        Self {
            ctx,
            state: PostInstallState::Idle,
        }
    }

    pub fn state(&self) -> PostInstallState {
        self.state
    }

    /// Runs the post-install actions unless they already ran in this run.
    ///
    /// The runner counts as done once triggered, even if an action fails:
    /// the run is aborted in that case anyway.
    pub fn trigger(&mut self) -> Result<StepResult> {
        if self.state == PostInstallState::Done {
            info!("post-install already ran in this run");
            return Ok(StepResult::Skipped);
        }
        self.state = PostInstallState::Done;

        self.fix_permissions_and_clear_cache()?;
        self.run_post_script()?;
        Ok(StepResult::Applied)
    }

    /// Runs the `drupal-perm` helper and clears every Drupal cache.
    pub fn fix_permissions_and_clear_cache(&self) -> Result<()> {
        let profile = self.ctx.profile;
        let root = profile.project_root().to_owned();

        info!("fixing ownership and permissions");
        let perm = CommandSpec::new(
            "bash",
            vec![scripts::perm_script_path(&self.ctx).into_string()],
        )
        .with_cwd(root.clone());
        self.ctx
            .run(&perm)
            .context("failed to fix file permissions")?;

        info!("clearing drupal cache");
        let cache_clear = CommandSpec::from_argv(&profile.drush.command)
            .ok_or_else(|| RsdrupalError::Config("drush command must not be empty".to_string()))?
            .with_args([
                format!("--root={}", profile.drupal_root()),
                "cache-clear".to_string(),
                "all".to_string(),
            ])
            .with_cwd(root);
        self.ctx
            .run(&cache_clear)
            .context("failed to clear drupal cache")?;
        Ok(())
    }

    /// Runs the configured post-install script if it exists.
    ///
    /// A missing script is skipped, not an error.
    pub fn run_post_script(&self) -> Result<StepResult> {
        let profile = self.ctx.profile;
        let Some(script) = profile.install.script.as_deref() else {
            return Ok(StepResult::Skipped);
        };

        if !Predicates::new(self.ctx).file_exists(script) {
            info!("post-install script {} not found, skipping", script);
            return Ok(StepResult::Skipped);
        }

        let path = profile.resolve_in_project(script);
        info!("running post-install script {}", path);
        let spec = CommandSpec::new("bash", vec![path.to_string()])
            .with_cwd(profile.project_root().to_owned());
        self.ctx
            .run(&spec)
            .with_context(|| format!("post-install script {} failed", path))?;
        Ok(StepResult::Applied)
    }
}
