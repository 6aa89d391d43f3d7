//! MySQL client wrapper.
//!
//! All database access goes through the `mysql` command-line client as the
//! MySQL `root` account. The root password travels in `MYSQL_PWD` so it never
//! shows up in argv or in logged command lines.

use anyhow::Result;

use crate::config::DatabaseConfig;
use crate::context::RunContext;
use crate::error::RsdrupalError;
use crate::executor::{CommandSpec, StdinSource};

const MYSQL: &str = "mysql";

/// Quotes a string as a MySQL single-quoted literal.
pub(crate) fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\'' => quoted.push_str("\\'"),
            '\\' => quoted.push_str("\\\\"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

/// Thin wrapper around the `mysql` client for one configured database.
pub struct MysqlClient<'a> {
    ctx: RunContext<'a>,
    config: &'a DatabaseConfig,
}

impl<'a> MysqlClient<'a> {
    pub fn new(ctx: RunContext<'a>) -> Self {
        Self {
            ctx,
            config: &ctx.profile.database,
        }
    }

    /// The application account as it appears in GRANT statements.
    pub fn account(&self) -> String {
        format!("{}@'localhost'", quote_literal(&self.config.user))
    }

    fn base_spec(&self) -> CommandSpec {
        CommandSpec::new(
            MYSQL,
            vec!["--user=root".to_string(), format!("--host={}", self.config.host)],
        )
        .with_env("MYSQL_PWD", self.config.root_password.expose())
    }

    /// Runs one or more SQL statements, failing on a non-zero exit.
    pub fn execute_sql(&self, sql: &str) -> Result<()> {
        let spec = self.base_spec().with_args(["--execute", sql]);
        self.ctx.run(&spec)?;
        Ok(())
    }

    /// Grants full privileges on the database to the application user.
    ///
    /// `CREATE USER IF NOT EXISTS` keeps this working on servers that no
    /// longer accept `GRANT ... IDENTIFIED BY`.
    pub fn grant_privileges(&self) -> Result<()> {
        let account = self.account();
        let sql = format!(
            "CREATE USER IF NOT EXISTS {account} IDENTIFIED BY {password}; \
             GRANT ALL ON `{db}`.* TO {account}; FLUSH PRIVILEGES;",
            password = quote_literal(self.config.password.expose()),
            db = self.config.name,
        );
        let spec = self
            .base_spec()
            .with_args(["--execute", sql.as_str()])
            .with_secret(self.config.password.expose());
        self.ctx.run(&spec)?;
        Ok(())
    }

    pub fn create_database(&self) -> Result<()> {
        self.execute_sql(&format!("CREATE DATABASE IF NOT EXISTS `{}`;", self.config.name))
    }

    /// Counts the base tables of the database.
    ///
    /// Returns `None` when the command did not run (dry run). A client that
    /// cannot connect, or output that is not a number, is a `Connectivity` error.
    pub fn count_base_tables(&self) -> Result<Option<u64>, RsdrupalError> {
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE' AND table_schema = {};",
            quote_literal(&self.config.name)
        );
        let spec = self
            .base_spec()
            .with_args(["--batch", "--skip-column-names", "--execute", sql.as_str()])
            .capturing_stdout();

        let result = self
            .ctx
            .executor
            .execute(&spec)
            .map_err(|e| RsdrupalError::Connectivity(format!("{:#}", e)))?;

        if let Some(status) = result.status
            && !status.success()
        {
            return Err(RsdrupalError::Connectivity(format!(
                "table count query against '{}' on {} failed: {}",
                self.config.name, self.config.host, status
            )));
        }

        let Some(stdout) = result.stdout else {
            return Ok(None);
        };
        let count = stdout.trim().parse::<u64>().map_err(|_| {
            RsdrupalError::Connectivity(format!(
                "unexpected table count output from {}: {:?}",
                MYSQL,
                stdout.trim()
            ))
        })?;
        Ok(Some(count))
    }

    /// Pipes a dump into the database.
    pub fn load_dump(&self, dump: StdinSource) -> Result<()> {
        let spec = self
            .base_spec()
            .with_args([self.config.name.as_str()])
            .with_stdin(dump);
        self.ctx.run(&spec)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_literal_escapes_quotes_and_backslashes() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("it's"), "'it\\'s'");
        assert_eq!(quote_literal("a\\b"), "'a\\\\b'");
        assert_eq!(quote_literal(""), "''");
    }
}
