use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;
use rsdrupal::cli::{ApplyArgs, CommonArgs, LogLevel, ValidateArgs};
use rsdrupal::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use rsdrupal::step::{Step, StepResult};

/// Records commands and answers like a dry-run executor.
#[derive(Default)]
struct RecordingExecutor {
    commands: Mutex<Vec<String>>,
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, spec: &CommandSpec) -> anyhow::Result<ExecutionResult> {
        self.commands.lock().unwrap().push(spec.display());
        Ok(ExecutionResult::default())
    }
}

fn demo_profile() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/drupal_site.yml")
}

fn common(file: Utf8PathBuf) -> CommonArgs {
    CommonArgs {
        file,
        log_level: LogLevel::Info,
    }
}

#[test]
fn dry_run_plans_the_whole_run() {
    let executor = Arc::new(RecordingExecutor::default());
    let args = ApplyArgs {
        common: common(demo_profile()),
        dry_run: true,
    };

    let report = rsdrupal::run_apply(&args, executor.clone()).unwrap();

    // nothing exists under /var/www/example, so every step plans an action
    assert_eq!(report.result(Step::AcquireSource), Some(StepResult::Applied));
    assert!(report.seeded());
    assert_eq!(report.result(Step::PostInstall), Some(StepResult::Applied));
    assert_eq!(report.result(Step::NotifyWebServer), Some(StepResult::Applied));

    let commands = executor.commands.lock().unwrap();
    assert!(commands.iter().any(|c| c.starts_with("git \"clone\"")));
    assert!(commands.iter().any(|c| c.contains("site-install")));
    assert_eq!(commands.last().unwrap(), "service \"apache2\" \"restart\"");
    assert!(!commands.iter().any(|c| c.contains("\"root\"")), "root password leaked");
}

#[test]
fn apply_with_missing_profile_fails() {
    let executor = Arc::new(RecordingExecutor::default());
    let args = ApplyArgs {
        common: common(Utf8PathBuf::from("/nonexistent/profile.yml")),
        dry_run: true,
    };

    let err = rsdrupal::run_apply(&args, executor.clone()).unwrap_err();
    assert!(format!("{:#}", err).contains("failed to load profile"));
    assert!(executor.commands.lock().unwrap().is_empty());
}

#[test]
fn validate_accepts_demo_profile() {
    let args = ValidateArgs {
        common: common(demo_profile()),
    };
    rsdrupal::run_validate(&args).unwrap();
}
