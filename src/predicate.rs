//! Target-state predicates.
//!
//! Each predicate answers one yes/no question about the host by looking at
//! it right now. Nothing is cached: calling a predicate twice queries twice.

use camino::{Utf8Path, Utf8PathBuf};
use rustix::fs::{Access, access};
use tracing::{debug, info};

use crate::context::RunContext;
use crate::database::MysqlClient;
use crate::error::RsdrupalError;

/// The two mutually exclusive places project source can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SourceOrigin {
    Git,
    Path,
}

/// Returns true if `path` exists and is readable by this process.
///
/// Relative paths are resolved against `working_dir`.
pub fn file_exists(path: &Utf8Path, working_dir: &Utf8Path) -> bool {
    let resolved: Utf8PathBuf = if path.is_relative() {
        working_dir.join(path)
    } else {
        path.to_owned()
    };
    access(resolved.as_std_path(), Access::READ_OK).is_ok()
}

/// Predicates over one profile and the live host.
pub struct Predicates<'a> {
    ctx: RunContext<'a>,
}

impl<'a> Predicates<'a> {
    pub fn new(ctx: RunContext<'a>) -> Self {
        Self { ctx }
    }

    /// True if the origin's required field is non-empty.
    pub fn source_configured(&self, origin: SourceOrigin) -> bool {
        let source = &self.ctx.profile.source;
        match origin {
            SourceOrigin::Git => !source.git_repo.is_empty(),
            SourceOrigin::Path => !source.path.is_empty(),
        }
    }

    /// True if the Drupal entry file is absent.
    pub fn index_file_missing(&self) -> bool {
        let index = self.ctx.profile.index_file();
        let missing = !index.exists();
        debug!("index file {} missing: {}", index, missing);
        missing
    }

    /// True if the target database has no base tables.
    ///
    /// Runs a live query on every call. Unreachable databases are an error,
    /// never "not empty". In dry-run mode the query does not run and the
    /// database is assumed empty so the plan shows the seeding path.
    pub fn database_empty(&self) -> Result<bool, RsdrupalError> {
        match MysqlClient::new(self.ctx).count_base_tables()? {
            Some(count) => {
                debug!("database '{}' has {} base table(s)", self.ctx.profile.database.name, count);
                Ok(count == 0)
            }
            None => {
                info!("dry run: assuming database is empty");
                Ok(true)
            }
        }
    }

    /// True if `path` (relative to the project root) exists and is readable.
    pub fn file_exists(&self, path: &Utf8Path) -> bool {
        file_exists(path, self.ctx.profile.project_root())
    }
}
