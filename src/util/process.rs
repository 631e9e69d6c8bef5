//! Subprocess execution utilities.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use anyhow::{Context, Result};

/// Where the stdout and stderr of a command end up.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    Truncate(PathBuf),
    Append(PathBuf),
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    env_remove: Vec<String>,
    cwd: Option<PathBuf>,
    stdin: Option<Vec<u8>>,
    log: Option<LogTarget>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            env_remove: Vec::new(),
            cwd: None,
            stdin: None,
            log: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Add arguments from a whitespace separated option string,
    /// such as a `configure_options` value.
    pub fn split_args(self, options: &str) -> Self {
        self.args(options.split_whitespace())
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Remove an environment variable.
    pub fn env_remove(mut self, key: impl AsRef<str>) -> Self {
        self.env_remove.push(key.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Set stdin data.
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Redirect stdout and stderr into a fresh log file.
    pub fn log_to(mut self, path: impl AsRef<Path>) -> Self {
        self.log = Some(LogTarget::Truncate(path.as_ref().to_path_buf()));
        self
    }

    /// Redirect stdout and stderr, appending to an existing log file.
    pub fn append_to_log(mut self, path: impl AsRef<Path>) -> Self {
        self.log = Some(LogTarget::Append(path.as_ref().to_path_buf()));
        self
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        for key in &self.env_remove {
            cmd.env_remove(key);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    fn attach_log(&self, cmd: &mut Command) -> Result<()> {
        let Some(ref target) = self.log else {
            return Ok(());
        };

        let (path, append) = match target {
            LogTarget::Truncate(path) => (path, false),
            LogTarget::Append(path) => (path, true),
        };

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .with_context(|| format!("failed to open log file: {}", path.display()))?;
        let stderr = file
            .try_clone()
            .with_context(|| format!("failed to open log file: {}", path.display()))?;

        cmd.stdout(file);
        cmd.stderr(stderr);
        Ok(())
    }

    /// Execute the command, capturing its output.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();

        if self.stdin.is_some() {
            cmd.stdin(Stdio::piped());
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        if let Some(ref stdin_data) = self.stdin {
            use std::io::Write;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(stdin_data)?;
            }
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;

        Ok(output)
    }

    /// Execute and return status only. Output goes to the log file when
    /// one is set, otherwise it is inherited.
    pub fn status(&self) -> Result<ExitStatus> {
        let mut cmd = self.build_command();
        self.attach_log(&mut cmd)?;

        let status = if let Some(ref stdin_data) = self.stdin {
            use std::io::Write;
            cmd.stdin(Stdio::piped());
            let mut child = cmd
                .spawn()
                .with_context(|| format!("failed to execute `{}`", self.program.display()))?;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(stdin_data)?;
            }
            child.wait()?
        } else {
            cmd.status()
                .with_context(|| format!("failed to execute `{}`", self.program.display()))?
        };
        Ok(status)
    }

    /// Run the command and report whether it succeeded.
    ///
    /// A command that cannot be started or exits non-zero is logged with
    /// its full command line and yields `false`.
    pub fn run(&self) -> bool {
        tracing::debug!("Running: {}", self.display_command());

        match self.status() {
            Ok(status) if status.success() => true,
            Ok(_) => {
                tracing::error!("Running: \"{}\" failed.", self.display_command());
                false
            }
            Err(e) => {
                tracing::error!("Running: \"{}\" failed: {:#}", self.display_command(), e);
                false
            }
        }
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find the python interpreter used to drive setup.py and build frontends.
pub fn find_python() -> PathBuf {
    for name in ["python3", "python"] {
        if let Some(path) = find_executable(name) {
            return path;
        }
    }
    PathBuf::from("python3")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_process_builder() {
        let output = ProcessBuilder::new("echo").arg("hello").exec().unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("dpkg-buildpackage").args(["-uc", "-us", "-rfakeroot"]);

        assert_eq!(pb.display_command(), "dpkg-buildpackage -uc -us -rfakeroot");
    }

    #[test]
    fn test_split_args() {
        let pb = ProcessBuilder::new("./configure").split_args("--prefix=/usr  --enable-python");

        assert_eq!(pb.get_args(), ["--prefix=/usr", "--enable-python"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_logs_output() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("build.log");

        assert!(ProcessBuilder::new("echo").arg("first").log_to(&log).run());
        assert!(ProcessBuilder::new("echo")
            .arg("second")
            .append_to_log(&log)
            .run());

        let content = std::fs::read_to_string(&log).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_failure() {
        assert!(!ProcessBuilder::new("false").run());
        assert!(!ProcessBuilder::new("l2tdevtools-missing-program").run());
    }
}
