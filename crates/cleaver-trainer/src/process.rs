//! Running external trainer executables.
//!
//! A trainer is invoked as `<executable> [args...] <training-file> <model-file>`
//! and blocks the caller until it exits. Its stdout and stderr are drained
//! concurrently so neither pipe can fill up and stall the child.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use cleaver_core::{CleaverError, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Flag that replaces the default executable. Must come first.
pub const EXECUTABLE_FLAG: &str = "--executable";

/// An external trainer command line, minus its file arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainerCommand {
    executable: PathBuf,
    args: Vec<String>,
}

impl TrainerCommand {
    pub fn new(executable: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            executable: executable.into(),
            args,
        }
    }

    /// Builds a command from user arguments.
    ///
    /// A leading `--executable <path>` pair replaces `default_executable` and
    /// is consumed; everything else is forwarded verbatim.
    ///
    /// # Errors
    ///
    /// [`CleaverError::Configuration`] if `--executable` has no value.
    pub fn from_args(default_executable: &str, args: &[String]) -> Result<Self> {
        match args {
            [flag, executable, rest @ ..] if flag == EXECUTABLE_FLAG => {
                Ok(Self::new(executable, rest.to_vec()))
            }
            [flag] if flag == EXECUTABLE_FLAG => Err(CleaverError::Configuration(format!(
                "{EXECUTABLE_FLAG} requires a path"
            ))),
            _ => Ok(Self::new(default_executable, args.to_vec())),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The full command line as it will be launched.
    pub fn command_line(&self, training_file: &Path, model_file: &Path) -> String {
        let mut parts = vec![self.executable.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.push(training_file.display().to_string());
        parts.push(model_file.display().to_string());
        parts.join(" ")
    }

    /// Runs the trainer to completion.
    ///
    /// A non-zero exit status is logged and returned, not raised.
    ///
    /// # Errors
    ///
    /// [`CleaverError::Process`] if the executable cannot be launched.
    pub fn run(&self, training_file: &Path, model_file: &Path) -> Result<TrainerRun> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run_async(training_file, model_file))
    }

    async fn run_async(&self, training_file: &Path, model_file: &Path) -> Result<TrainerRun> {
        let command_line = self.command_line(training_file, model_file);
        info!(command = %command_line, "launching trainer");

        let mut child = Command::new(&self.executable)
            .args(&self.args)
            .arg(training_file)
            .arg(model_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CleaverError::Process {
                command: command_line.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;
        let (stdout, stderr, status) =
            tokio::try_join!(drain(stdout, "stdout"), drain(stderr, "stderr"), child.wait())?;

        if !status.success() {
            warn!(command = %command_line, %status, stderr = %stderr.trim(), "trainer exited unsuccessfully");
        }
        Ok(TrainerRun {
            command_line,
            status,
            stdout,
            stderr,
        })
    }
}

fn missing_pipe(name: &str) -> io::Error {
    io::Error::other(format!("trainer {name} was not captured"))
}

/// Captures a stream line by line. Invalid UTF-8 is replaced, never fatal.
async fn drain<R: AsyncRead + Unpin>(stream: R, name: &'static str) -> io::Result<String> {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    let mut captured = String::new();
    while reader.read_until(b'\n', &mut line).await? > 0 {
        let text = String::from_utf8_lossy(&line);
        debug!(stream = name, "{}", text.trim_end_matches(['\r', '\n']));
        captured.push_str(&text);
        line.clear();
    }
    Ok(captured)
}

/// Outcome of one trainer invocation.
#[derive(Debug, Clone)]
pub struct TrainerRun {
    pub command_line: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl TrainerRun {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_default_executable() {
        let command = TrainerCommand::from_args("svm_learn", &strings(&["-c", "10"])).unwrap();
        assert_eq!(command.executable(), Path::new("svm_learn"));
        assert_eq!(command.args(), &["-c", "10"]);
    }

    #[test]
    fn test_executable_override_is_consumed() {
        let args = strings(&["--executable", "/opt/svm/svm_learn", "-t", "1"]);
        let command = TrainerCommand::from_args("svm_learn", &args).unwrap();
        assert_eq!(command.executable(), Path::new("/opt/svm/svm_learn"));
        assert_eq!(command.args(), &["-t", "1"]);
        assert_eq!(
            command.command_line(Path::new("data.svmlight"), Path::new("data.svmlight.model")),
            "/opt/svm/svm_learn -t 1 data.svmlight data.svmlight.model"
        );
    }

    #[test]
    fn test_override_only_when_leading() {
        let args = strings(&["-c", "1", "--executable", "x"]);
        let command = TrainerCommand::from_args("svm_learn", &args).unwrap();
        assert_eq!(command.executable(), Path::new("svm_learn"));
        assert_eq!(command.args().len(), 4);

        assert!(TrainerCommand::from_args("svm_learn", &strings(&["--executable"])).is_err());
    }

    #[test]
    fn test_launch_failure_names_command_line() {
        let command = TrainerCommand::new("/nonexistent/cleaver-trainer-binary", strings(&["-v"]));
        let err = command
            .run(Path::new("train.svmlight"), Path::new("train.svmlight.model"))
            .unwrap_err();
        match err {
            CleaverError::Process { command, .. } => {
                assert_eq!(
                    command,
                    "/nonexistent/cleaver-trainer-binary -v train.svmlight train.svmlight.model"
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_invalid_utf8_output_is_captured_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("train.svmlight.model");
        let command = TrainerCommand::new(
            "sh",
            strings(&[
                "-c",
                "printf 'caf\\351\\n'; printf 'bad \\377' 1>&2; echo done > \"$2\"",
                "trainer",
            ]),
        );
        let run = command.run(Path::new("train.svmlight"), &model).unwrap();
        assert!(run.success());
        assert_eq!(run.stdout, "caf\u{FFFD}\n");
        assert_eq!(run.stderr, "bad \u{FFFD}");
        assert_eq!(std::fs::read_to_string(&model).unwrap(), "done\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_both_streams() {
        let command = TrainerCommand::new(
            "sh",
            strings(&["-c", "echo out; echo err 1>&2; exit 3", "trainer"]),
        );
        let run = command.run(Path::new("a"), Path::new("b")).unwrap();
        assert!(!run.success());
        assert_eq!(run.stdout, "out\n");
        assert_eq!(run.stderr, "err\n");
    }
}
