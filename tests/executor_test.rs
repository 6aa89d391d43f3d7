use std::fs;
use std::io::Write;

use camino::Utf8PathBuf;
use flate2::Compression as GzLevel;
use flate2::write::GzEncoder;
use rsdrupal::RsdrupalError;
use rsdrupal::dump::Compression;
use rsdrupal::executor::{CommandExecutor, CommandSpec, RealCommandExecutor, StdinSource, run_checked};

fn temp_path(dir: &tempfile::TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("path should be valid UTF-8")
}

#[test]
fn dry_run_returns_no_status() {
    let executor = RealCommandExecutor { dry_run: true };
    let spec = CommandSpec::new("definitely-not-a-real-command-xyz", vec!["arg".to_string()]);

    let result = executor.execute(&spec).unwrap();
    assert!(result.status.is_none());
    assert!(result.stdout.is_none());
    assert!(result.success());
}

#[test]
fn missing_command_is_command_not_found() {
    let executor = RealCommandExecutor { dry_run: false };
    let spec = CommandSpec::new("definitely-not-a-real-command-xyz", Vec::new());

    let err = executor.execute(&spec).unwrap_err();
    match err.downcast_ref::<RsdrupalError>() {
        Some(RsdrupalError::CommandNotFound { command }) => {
            assert_eq!(command, "definitely-not-a-real-command-xyz");
        }
        other => panic!("expected CommandNotFound, got {:?}", other),
    }
}

#[test]
fn captures_stdout_when_asked() {
    let executor = RealCommandExecutor { dry_run: false };
    let spec = CommandSpec::new("sh", vec!["-c".to_string(), "echo 3".to_string()]).capturing_stdout();

    let result = executor.execute(&spec).unwrap();
    assert!(result.success());
    assert_eq!(result.stdout.as_deref(), Some("3\n"));
}

#[test]
fn stdout_is_not_captured_by_default() {
    let executor = RealCommandExecutor { dry_run: false };
    let spec = CommandSpec::new("sh", vec!["-c".to_string(), "echo 3".to_string()]);

    let result = executor.execute(&spec).unwrap();
    assert!(result.stdout.is_none());
}

#[test]
fn env_and_cwd_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let cwd = temp_path(&dir, "");
    let executor = RealCommandExecutor { dry_run: false };
    let spec = CommandSpec::new("sh", vec!["-c".to_string(), "printf '%s:%s' \"$GREETING\" \"$(pwd)\"".to_string()])
        .with_env("GREETING", "hello")
        .with_cwd(cwd.clone())
        .capturing_stdout();

    let result = executor.execute(&spec).unwrap();
    let stdout = result.stdout.unwrap();
    let (greeting, pwd) = stdout.split_once(':').unwrap();
    assert_eq!(greeting, "hello");
    assert_eq!(
        fs::canonicalize(pwd).unwrap(),
        fs::canonicalize(cwd.as_std_path()).unwrap()
    );
}

#[test]
fn plain_file_is_streamed_into_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "dump.sql");
    fs::write(&path, "CREATE TABLE node (nid INT);\n").unwrap();

    let executor = RealCommandExecutor { dry_run: false };
    let spec = CommandSpec::new("cat", Vec::new())
        .with_stdin(StdinSource {
            path,
            compression: Compression::None,
        })
        .capturing_stdout();

    let result = executor.execute(&spec).unwrap();
    assert_eq!(result.stdout.as_deref(), Some("CREATE TABLE node (nid INT);\n"));
}

#[test]
fn gzip_file_is_decompressed_into_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "dump.sql.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&path).unwrap(), GzLevel::default());
    encoder.write_all(b"INSERT INTO node VALUES (1);\n").unwrap();
    encoder.finish().unwrap();

    let executor = RealCommandExecutor { dry_run: false };
    let spec = CommandSpec::new("cat", Vec::new())
        .with_stdin(StdinSource {
            path,
            compression: Compression::Gzip,
        })
        .capturing_stdout();

    let result = executor.execute(&spec).unwrap();
    assert_eq!(result.stdout.as_deref(), Some("INSERT INTO node VALUES (1);\n"));
}

#[test]
fn unreadable_stdin_does_not_start_command() {
    let dir = tempfile::tempdir().unwrap();
    let marker = temp_path(&dir, "ran");
    let executor = RealCommandExecutor { dry_run: false };
    let spec = CommandSpec::new("sh", vec!["-c".to_string(), format!("touch {}", marker)]).with_stdin(
        StdinSource {
            path: temp_path(&dir, "absent.sql"),
            compression: Compression::None,
        },
    );

    assert!(executor.execute(&spec).is_err());
    assert!(!marker.exists());
}

#[test]
fn run_checked_reports_nonzero_exit() {
    let executor = RealCommandExecutor { dry_run: false };
    let spec = CommandSpec::new("sh", vec!["-c".to_string(), "exit 3".to_string()]);

    let err = run_checked(&executor, &spec).unwrap_err();
    match err.downcast_ref::<RsdrupalError>() {
        Some(RsdrupalError::Execution { command, status }) => {
            assert!(command.starts_with("sh \"-c\""));
            assert!(status.contains('3'), "got: {}", status);
        }
        other => panic!("expected Execution, got {:?}", other),
    }
}

#[test]
fn run_checked_passes_dry_run() {
    let executor = RealCommandExecutor { dry_run: true };
    let spec = CommandSpec::new("sh", vec!["-c".to_string(), "exit 3".to_string()]);
    assert!(run_checked(&executor, &spec).is_ok());
}
