//! Provisioning run orchestrator.
//!
//! Executes the fixed step sequence:
//!
//! 1. **acquire-source**: create the project root, fetch source if missing
//! 2. **configure-vhost**: render and enable the virtual host
//! 3. **install-scripts**: install the permission and reset helpers
//! 4. **prepare-database**: grant privileges, create the database
//! 5. **write-settings**: `settings.local.php`, and `settings.php` if missing
//! 6. **seed-database**: load the dump or run the installer if the database is empty
//! 7. **post-install**: only when step 6 seeded
//! 8. **notify-web-server**: issue the strongest pending restart/reload
//!
//! Steps never reorder. Web-server notifications are explicit step return
//! values collected here, and post-install is driven by the seeding result.

use std::fmt;

use anyhow::Result;
use tracing::{error, info};

use crate::context::RunContext;
use crate::postinstall::PostInstallRunner;
use crate::scripts;
use crate::seeder::{DatabaseSeeder, SeedOutcome};
use crate::settings;
use crate::source::SourceAcquirer;
use crate::step::{ServiceAction, Step, StepOutcome, StepResult};
use crate::webserver::WebServer;

/// Per-step results of a run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub steps: Vec<(Step, StepResult)>,
    pub seed: Option<SeedOutcome>,
}

impl RunReport {
    /// Result of `step`, or `None` if the run never reached it.
    pub fn result(&self, step: Step) -> Option<StepResult> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, result)| *result)
    }

    /// True if the database was seeded in this run.
    pub fn seeded(&self) -> bool {
        self.seed.is_some_and(SeedOutcome::seeded)
    }

    fn record(&mut self, step: Step, result: StepResult) {
        self.steps.push((step, result));
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .steps
            .iter()
            .map(|(step, result)| format!("{}={}", step, result))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

pub struct Provisioner<'a> {
    ctx: RunContext<'a>,
}

impl<'a> Provisioner<'a> {
    pub fn new(ctx: RunContext<'a>) -> Self {
        Self { ctx }
    }

    /// Runs every step in order.
    ///
    /// The first failing step stops the run. Its error is returned with the
    /// step name in context; steps already applied are not rolled back and no
    /// pending web-server action is issued.
    pub fn run(&self) -> Result<RunReport> {
        info!("provisioning {}", self.ctx.profile.project.name);
        let mut report = RunReport::default();

        match self.run_steps(&mut report) {
            Ok(()) => {
                info!("provisioning completed: {}", report);
                Ok(report)
            }
            Err((step, err)) => {
                report.record(step, StepResult::Failed);
                error!("provisioning failed at {}: {}", step, report);
                Err(err.context(format!("step '{}' failed", step)))
            }
        }
    }

    fn run_steps(&self, report: &mut RunReport) -> Result<(), (Step, anyhow::Error)> {
        let ctx = self.ctx;
        let mut pending: Option<ServiceAction> = None;

        info!("step {}", Step::AcquireSource);
        let outcome = SourceAcquirer::new(ctx).acquire();
        record(report, &mut pending, Step::AcquireSource, outcome)?;

        info!("step {}", Step::ConfigureVhost);
        let outcome = WebServer::new(ctx).configure_vhost();
        record(report, &mut pending, Step::ConfigureVhost, outcome)?;

        info!("step {}", Step::InstallScripts);
        let outcome = scripts::install_scripts(&ctx);
        record(report, &mut pending, Step::InstallScripts, outcome)?;

        let seeder = DatabaseSeeder::new(ctx);

        info!("step {}", Step::PrepareDatabase);
        let outcome = seeder.prepare().map(|()| StepOutcome::applied());
        record(report, &mut pending, Step::PrepareDatabase, outcome)?;

        info!("step {}", Step::WriteSettings);
        let outcome = settings::write_settings(&ctx);
        record(report, &mut pending, Step::WriteSettings, outcome)?;

        info!("step {}", Step::SeedDatabase);
        let seed = seeder.seed().map_err(|e| (Step::SeedDatabase, e))?;
        report.seed = Some(seed);
        let outcome = if seed.seeded() {
            StepOutcome::applied()
        } else {
            StepOutcome::skipped()
        };
        record(report, &mut pending, Step::SeedDatabase, Ok(outcome))?;

        info!("step {}", Step::PostInstall);
        let post_install = if seed.seeded() {
            PostInstallRunner::new(ctx).trigger()
        } else {
            info!("database was not seeded, skipping post-install");
            Ok(StepResult::Skipped)
        };
        let outcome = post_install.map(|result| StepOutcome {
            result,
            notify: None,
        });
        record(report, &mut pending, Step::PostInstall, outcome)?;

        info!("step {}", Step::NotifyWebServer);
        let outcome = match pending.take() {
            Some(action) => WebServer::new(ctx)
                .apply(action)
                .map(|()| StepOutcome::applied()),
            None => {
                info!("no web server action pending");
                Ok(StepOutcome::skipped())
            }
        };
        record(report, &mut pending, Step::NotifyWebServer, outcome)
    }
}

/// Records a step outcome and folds its notification into `pending`.
fn record(
    report: &mut RunReport,
    pending: &mut Option<ServiceAction>,
    step: Step,
    outcome: Result<StepOutcome>,
) -> Result<(), (Step, anyhow::Error)> {
    let outcome = outcome.map_err(|e| (step, e))?;
    *pending = (*pending).max(outcome.notify);
    report.record(step, outcome.result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lookup_and_display() {
        let mut report = RunReport::default();
        report.record(Step::AcquireSource, StepResult::Skipped);
        report.record(Step::ConfigureVhost, StepResult::Applied);

        assert_eq!(report.result(Step::ConfigureVhost), Some(StepResult::Applied));
        assert_eq!(report.result(Step::SeedDatabase), None);
        assert!(!report.seeded());
        assert_eq!(report.to_string(), "acquire-source=skipped, configure-vhost=applied");
    }

    #[test]
    fn seeded_follows_seed_outcome() {
        let report = RunReport {
            steps: Vec::new(),
            seed: Some(SeedOutcome::DumpLoaded),
        };
        assert!(report.seeded());
    }
}
