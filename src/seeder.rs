//! Database preparation and seeding.
//!
//! Preparation (privileges and `CREATE DATABASE IF NOT EXISTS`) runs on every
//! provisioning run. Seeding runs only while the database has no base
//! tables, and then from exactly one source: the configured dump file if it
//! is present, otherwise the Drupal installer.

use std::fs::File;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::context::RunContext;
use crate::database::MysqlClient;
use crate::dump;
use crate::error::RsdrupalError;
use crate::executor::{CommandSpec, StdinSource};
use crate::predicate::Predicates;

/// How (and whether) the database was seeded in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SeedOutcome {
    /// The database already had tables.
    NotNeeded,
    DumpLoaded,
    SiteInstalled,
}

impl SeedOutcome {
    /// True if seeding happened, which is what triggers post-install.
    pub fn seeded(self) -> bool {
        !matches!(self, Self::NotNeeded)
    }
}

pub struct DatabaseSeeder<'a> {
    ctx: RunContext<'a>,
    client: MysqlClient<'a>,
}

impl<'a> DatabaseSeeder<'a> {
    pub fn new(ctx: RunContext<'a>) -> Self {
        Self {
            ctx,
            client: MysqlClient::new(ctx),
        }
    }

    /// Grants privileges, then creates the database if needed.
    ///
    /// Two separate client invocations; a failure of the second leaves the
    /// grant in place.
    pub fn prepare(&self) -> Result<()> {
        let db = &self.ctx.profile.database;
        info!("granting privileges on {} to {}", db.name, self.client.account());
        self.client
            .grant_privileges()
            .with_context(|| format!("failed to grant privileges on {}", db.name))?;

        info!("creating database {} if it does not exist", db.name);
        self.client
            .create_database()
            .with_context(|| format!("failed to create database {}", db.name))?;
        Ok(())
    }

    /// Resolved dump path, if one is configured.
    pub fn dump_path(&self) -> Option<Utf8PathBuf> {
        let profile = self.ctx.profile;
        profile
            .install
            .sql_dump
            .as_deref()
            .map(|path| profile.resolve_in_project(path))
    }

    /// Seeds the database if it is empty.
    ///
    /// Emptiness is evaluated once and the answer governs both candidates.
    pub fn seed(&self) -> Result<SeedOutcome> {
        let predicates = Predicates::new(self.ctx);
        if !predicates.database_empty()? {
            info!(
                "database {} already has tables, skipping seeding",
                self.ctx.profile.database.name
            );
            return Ok(SeedOutcome::NotNeeded);
        }

        match self.dump_path() {
            Some(path) if path.exists() => {
                self.load_dump(&path)?;
                Ok(SeedOutcome::DumpLoaded)
            }
            other => {
                if let Some(path) = other {
                    info!("dump file {} not found, falling back to site-install", path);
                }
                self.run_installer()?;
                Ok(SeedOutcome::SiteInstalled)
            }
        }
    }

    /// Decompresses (if needed) and pipes `path` into the database.
    pub fn load_dump(&self, path: &Utf8Path) -> Result<()> {
        info!("loading dump {} into {}", path, self.ctx.profile.database.name);

        // Readability is checked up front so an unreadable dump is a seeding
        // error rather than a generic I/O failure deep in the executor.
        File::open(path)
            .map_err(|e| RsdrupalError::Seeding(format!("dump file is not readable: {}: {}", path, e)))?;
        let compression = dump::detect_compression(path)
            .map_err(|e| RsdrupalError::Seeding(format!("dump file is not readable: {}", e)))?;
        debug!("dump compression: {}", compression);

        self.client
            .load_dump(StdinSource {
                path: path.to_owned(),
                compression,
            })
            .map_err(|e| RsdrupalError::Seeding(format!("failed to load dump {}: {:#}", path, e)))?;
        Ok(())
    }

    /// Runs `drush site-install` with the configured admin account.
    pub fn run_installer(&self) -> Result<()> {
        let profile = self.ctx.profile;
        info!("installing site {} with drush site-install", profile.project.name);

        let spec = CommandSpec::from_argv(&profile.drush.command)
            .ok_or_else(|| RsdrupalError::Config("drush command must not be empty".to_string()))?
            .with_args([
                "site-install".to_string(),
                "--debug".to_string(),
                "-y".to_string(),
                format!("--account-name={}", profile.install.admin_user),
                format!("--account-pass={}", profile.install.admin_pass.expose()),
                format!("--site-name={}", profile.project.name),
            ])
            .with_cwd(profile.drupal_root())
            .with_secret(profile.install.admin_pass.expose());

        self.ctx.run(&spec).map_err(|e| {
            RsdrupalError::Seeding(format!("site-install failed for {}: {:#}", profile.project.name, e))
        })?;
        Ok(())
    }
}
