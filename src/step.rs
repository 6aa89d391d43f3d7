//! Step identities and results.

use strum::{Display, EnumIter};

/// The fixed, ordered steps of a provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Step {
    AcquireSource,
    ConfigureVhost,
    InstallScripts,
    PrepareDatabase,
    WriteSettings,
    SeedDatabase,
    PostInstall,
    NotifyWebServer,
}

/// What happened to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum StepResult {
    /// A predicate said the step was not needed.
    Skipped,
    /// The step's action ran.
    Applied,
    /// The step's action raised an error.
    Failed,
}

impl StepResult {
    pub fn applied(self) -> bool {
        self == Self::Applied
    }

    /// Combines two sub-results: applied if either applied.
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::Failed, _) | (_, Self::Failed) => Self::Failed,
            (Self::Applied, _) | (_, Self::Applied) => Self::Applied,
            _ => Self::Skipped,
        }
    }
}

/// Lifecycle command for the web server.
///
/// Ordered so that the strongest pending action wins: a restart covers a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ServiceAction {
    Reload,
    Restart,
}

/// Result of a step plus the web-server action it asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub result: StepResult,
    pub notify: Option<ServiceAction>,
}

impl StepOutcome {
    pub fn skipped() -> Self {
        Self {
            result: StepResult::Skipped,
            notify: None,
        }
    }

    pub fn applied() -> Self {
        Self {
            result: StepResult::Applied,
            notify: None,
        }
    }

    /// Applied, asking for `action` afterwards.
    pub fn notifying(action: ServiceAction) -> Self {
        Self {
            result: StepResult::Applied,
            notify: Some(action),
        }
    }

    /// Merges two outcomes of the same step, keeping the strongest action.
    pub fn merge(self, other: Self) -> Self {
        Self {
            result: self.result.or(other.result),
            notify: self.notify.max(other.notify),
        }
    }
}
